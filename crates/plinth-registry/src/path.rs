//! Path patterns for unit and interceptor mappings.
//!
//! Five pattern shapes are understood, in decreasing match priority:
//!
//! | Pattern | Kind | Matches |
//! |---|---|---|
//! | `/users/list` | exact | that path only |
//! | `""` | root | the context root `/` only |
//! | `/users/*` | prefix | `/users` and everything below it, longest prefix wins |
//! | `*.json` | extension | any path whose last segment ends in `.json` |
//! | `/` | default | every path not matched otherwise |

use std::cmp::Ordering;
use std::fmt;

use plinth_core::{PlinthError, PlinthResult};

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSpec {
    /// Matches one path exactly.
    Exact(String),
    /// Matches a path and everything below it. Holds the prefix without `/*`.
    Prefix(String),
    /// Matches by file extension. Holds the extension without `*.`.
    Extension(String),
    /// Matches only the context root. Written as `""`.
    Root,
    /// Matches everything. Written as `/`.
    Default,
}

impl PathSpec {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for patterns of no known shape, such as
    /// `users` or `/a/*/b`.
    ///
    /// # Example
    ///
    /// ```
    /// use plinth_registry::PathSpec;
    ///
    /// let spec = PathSpec::parse("/api/*").unwrap();
    /// assert!(spec.matches("/api/users"));
    /// assert!(spec.matches("/api"));
    /// assert!(!spec.matches("/apis"));
    /// ```
    pub fn parse(pattern: &str) -> PlinthResult<Self> {
        if pattern.is_empty() {
            return Ok(Self::Root);
        }
        if pattern == "/" {
            return Ok(Self::Default);
        }
        if let Some(extension) = pattern.strip_prefix("*.") {
            if extension.is_empty() || extension.contains(['/', '*']) {
                return Err(invalid(pattern));
            }
            return Ok(Self::Extension(extension.to_string()));
        }
        if !pattern.starts_with('/') {
            return Err(invalid(pattern));
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(invalid(pattern));
            }
            return Ok(Self::Prefix(prefix.to_string()));
        }
        if pattern.contains('*') {
            return Err(invalid(pattern));
        }
        Ok(Self::Exact(pattern.to_string()))
    }

    /// Returns `true` if `path` falls under this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == path,
            Self::Root => path == "/" || path.is_empty(),
            Self::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            Self::Extension(extension) => {
                let last = path.rsplit('/').next().unwrap_or(path);
                last.rsplit_once('.')
                    .is_some_and(|(_, ext)| ext == extension.as_str())
            }
            Self::Default => true,
        }
    }

    /// Returns the pattern as it was written.
    #[must_use]
    pub fn pattern(&self) -> String {
        self.to_string()
    }

    /// Ranks this pattern against another for the same path.
    ///
    /// `Ordering::Greater` means `self` takes precedence.
    #[must_use]
    pub fn precedence(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Prefix(a), Self::Prefix(b)) => a.len().cmp(&b.len()),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Exact(_) | Self::Root => 3,
            Self::Prefix(_) => 2,
            Self::Extension(_) => 1,
            Self::Default => 0,
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(path) => f.write_str(path),
            Self::Prefix(prefix) => write!(f, "{prefix}/*"),
            Self::Extension(extension) => write!(f, "*.{extension}"),
            Self::Root => Ok(()),
            Self::Default => f.write_str("/"),
        }
    }
}

fn invalid(pattern: &str) -> PlinthError {
    PlinthError::configuration(format!("invalid path pattern '{pattern}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shapes() {
        assert_eq!(PathSpec::parse("").unwrap(), PathSpec::Root);
        assert_eq!(PathSpec::parse("/").unwrap(), PathSpec::Default);
        assert_eq!(
            PathSpec::parse("/a/b").unwrap(),
            PathSpec::Exact("/a/b".into())
        );
        assert_eq!(PathSpec::parse("/a/*").unwrap(), PathSpec::Prefix("/a".into()));
        assert_eq!(PathSpec::parse("/*").unwrap(), PathSpec::Prefix(String::new()));
        assert_eq!(
            PathSpec::parse("*.json").unwrap(),
            PathSpec::Extension("json".into())
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for pattern in ["users", "/a/*/b", "*.", "*.a/b", "/a*"] {
            let err = PathSpec::parse(pattern).unwrap_err();
            assert_eq!(err.code(), "CONFIGURATION", "pattern {pattern}");
        }
    }

    #[test]
    fn test_display_round_trips_pattern() {
        for pattern in ["", "/", "/a/b", "/a/*", "*.json"] {
            assert_eq!(PathSpec::parse(pattern).unwrap().pattern(), pattern);
        }
    }

    #[test]
    fn test_prefix_respects_segment_boundary() {
        let spec = PathSpec::parse("/api/*").unwrap();
        assert!(spec.matches("/api"));
        assert!(spec.matches("/api/"));
        assert!(spec.matches("/api/v1/users"));
        assert!(!spec.matches("/apiv1"));
    }

    #[test]
    fn test_wildcard_prefix_matches_everything() {
        let spec = PathSpec::parse("/*").unwrap();
        assert!(spec.matches("/"));
        assert!(spec.matches("/anything/at/all"));
    }

    #[test]
    fn test_extension_looks_at_last_segment() {
        let spec = PathSpec::parse("*.jsp").unwrap();
        assert!(spec.matches("/pages/index.jsp"));
        assert!(!spec.matches("/pages.jsp/index"));
        assert!(!spec.matches("/pages/index.jspx"));
    }

    #[test]
    fn test_root_matches_context_root_only() {
        let spec = PathSpec::Root;
        assert!(spec.matches("/"));
        assert!(!spec.matches("/a"));
    }

    #[test]
    fn test_precedence() {
        let exact = PathSpec::parse("/a/b").unwrap();
        let short = PathSpec::parse("/a/*").unwrap();
        let long = PathSpec::parse("/a/b/*").unwrap();
        let ext = PathSpec::parse("*.b").unwrap();
        let default = PathSpec::Default;

        assert_eq!(exact.precedence(&long), Ordering::Greater);
        assert_eq!(long.precedence(&short), Ordering::Greater);
        assert_eq!(short.precedence(&ext), Ordering::Greater);
        assert_eq!(ext.precedence(&default), Ordering::Greater);
        assert_eq!(default.precedence(&ext), Ordering::Less);
    }

    #[test]
    fn test_each_documented_shape_parses() {
        let shapes = [
            PathSpec::parse("/users/list").unwrap(),
            PathSpec::parse("").unwrap(),
            PathSpec::parse("/users/*").unwrap(),
            PathSpec::parse("*.json").unwrap(),
            PathSpec::parse("/").unwrap(),
        ];
        assert!(matches!(shapes[0], PathSpec::Exact(_)));
        assert_eq!(shapes[1], PathSpec::Root);
        assert!(matches!(shapes[2], PathSpec::Prefix(_)));
        assert!(matches!(shapes[3], PathSpec::Extension(_)));
        assert_eq!(shapes[4], PathSpec::Default);
    }
}
