//! Access-control stage.
//!
//! Runs after the session stage and before dispatch:
//!
//! ```text
//! Request → Session → [Security] → Dispatch → Unit
//! ```
//!
//! The decision itself is delegated to a mode:
//!
//! - allow-all (the default)
//! - deny-all
//! - require-session, which challenges requests under protected paths that
//!   arrive without an established session
//! - a custom [`AccessPolicy`]
//!
//! Denied requests receive `403` and challenged ones `401`, both with a JSON
//! error body.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use plinth_core::{BoxFuture, Handler, PlinthResult, Request, Response, ResponseExt};
use plinth_registry::PathSpec;

use crate::session::Session;
use crate::stage::{NextLink, WrapperStage};

/// The outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Let the request through.
    Allow,
    /// Refuse the request outright.
    Deny {
        /// Why the request was refused.
        reason: String,
    },
    /// Refuse the request until the caller authenticates.
    Challenge {
        /// Why the request was challenged.
        reason: String,
    },
}

/// A pluggable access-control decision.
pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// Decides whether `request` may proceed.
    fn check(&self, request: &Request) -> AccessDecision;
}

#[derive(Debug, Clone)]
enum AccessMode {
    AllowAll,
    DenyAll,
    RequireSession(Arc<Vec<PathSpec>>),
    Custom(Arc<dyn AccessPolicy>),
}

/// Stage enforcing access control before dispatch.
///
/// # Example
///
/// ```
/// use plinth_stages::SecurityStage;
///
/// let stage = SecurityStage::require_session(["/account/*"]).unwrap();
/// assert_eq!(stage.mode_name(), "require_session");
/// ```
pub struct SecurityStage {
    mode: AccessMode,
    next: NextLink,
}

impl Default for SecurityStage {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl SecurityStage {
    /// Creates a stage that lets every request through.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::with_mode(AccessMode::AllowAll)
    }

    /// Creates a stage that refuses every request.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::with_mode(AccessMode::DenyAll)
    }

    /// Creates a stage that challenges session-less requests under `patterns`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is malformed.
    pub fn require_session<I, S>(patterns: I) -> PlinthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = patterns
            .into_iter()
            .map(|pattern| PathSpec::parse(pattern.as_ref()))
            .collect::<PlinthResult<Vec<_>>>()?;
        Ok(Self::with_mode(AccessMode::RequireSession(Arc::new(specs))))
    }

    /// Creates a stage using a custom policy.
    #[must_use]
    pub fn custom<P: AccessPolicy + 'static>(policy: P) -> Self {
        Self::with_mode(AccessMode::Custom(Arc::new(policy)))
    }

    fn with_mode(mode: AccessMode) -> Self {
        Self {
            mode,
            next: NextLink::new(),
        }
    }

    /// Returns the name of the active mode.
    #[must_use]
    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            AccessMode::AllowAll => "allow_all",
            AccessMode::DenyAll => "deny_all",
            AccessMode::RequireSession(_) => "require_session",
            AccessMode::Custom(_) => "custom",
        }
    }

    fn evaluate(&self, request: &Request) -> AccessDecision {
        match &self.mode {
            AccessMode::AllowAll => AccessDecision::Allow,
            AccessMode::DenyAll => AccessDecision::Deny {
                reason: "Access denied (deny-all mode)".to_string(),
            },
            AccessMode::RequireSession(protected) => {
                let path = request.uri().path();
                if !protected.iter().any(|spec| spec.matches(path)) {
                    return AccessDecision::Allow;
                }
                match request.extensions().get::<Session>() {
                    Some(session) if !session.is_new() => AccessDecision::Allow,
                    _ => AccessDecision::Challenge {
                        reason: format!("A session is required for '{path}'"),
                    },
                }
            }
            AccessMode::Custom(policy) => policy.check(request),
        }
    }
}

impl Handler for SecurityStage {
    fn name(&self) -> &'static str {
        "security"
    }

    fn handle<'a>(&'a self, request: Request) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            match self.evaluate(&request) {
                AccessDecision::Allow => self.next.run(self.name(), request).await,
                AccessDecision::Deny { reason } => {
                    tracing::debug!(path = %request.uri().path(), %reason, "Access denied");
                    Response::json_error(StatusCode::FORBIDDEN, "ACCESS_DENIED", &reason)
                }
                AccessDecision::Challenge { reason } => {
                    tracing::debug!(path = %request.uri().path(), %reason, "Access challenged");
                    Response::json_error(StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED", &reason)
                }
            }
        })
    }

    fn next_handler(&self) -> Option<Arc<dyn Handler>> {
        self.next.get()
    }
}

impl WrapperStage for SecurityStage {
    fn set_next(&self, next: Arc<dyn Handler>) {
        self.next.set(next);
    }

    fn clear_next(&self) {
        self.next.clear();
    }

    fn into_handler(self: Arc<Self>) -> Arc<dyn Handler> {
        self
    }
}

impl fmt::Debug for SecurityStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityStage")
            .field("mode", &self.mode_name())
            .field("next", &self.next)
            .finish()
    }
}
