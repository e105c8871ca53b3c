//! Dispatch phases.
//!
//! A request reaches a unit through one of five flows. Interceptors declare
//! which of them they take part in with a [`DispatchTypes`] set.

use std::fmt;
use std::ops::BitOr;

/// The kind of request flow a unit or interceptor participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DispatchType {
    /// A request arriving from the transport.
    #[default]
    Request = 1,
    /// An internal forward to another unit.
    Forward = 2,
    /// An internal include of another unit's output.
    Include = 4,
    /// Error handling dispatch.
    Error = 8,
    /// Resumption of an asynchronous request.
    Async = 16,
}

impl DispatchType {
    /// Returns the lowercase name of this phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Forward => "forward",
            Self::Include => "include",
            Self::Error => "error",
            Self::Async => "async",
        }
    }

    /// Returns every phase in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Request,
            Self::Forward,
            Self::Include,
            Self::Error,
            Self::Async,
        ]
    }

    const fn bit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for DispatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of dispatch phases.
///
/// # Example
///
/// ```
/// use plinth_core::{DispatchType, DispatchTypes};
///
/// let types = DispatchType::Request | DispatchType::Forward;
/// assert!(types.contains(DispatchType::Forward));
/// assert!(!types.contains(DispatchType::Include));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DispatchTypes(u8);

impl DispatchTypes {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Every dispatch phase.
    pub const ALL: Self = Self(0b1_1111);

    /// Only direct requests.
    pub const REQUEST: Self = Self(DispatchType::Request.bit());

    /// Creates a set holding a single phase.
    #[must_use]
    pub const fn only(dispatch: DispatchType) -> Self {
        Self(dispatch.bit())
    }

    /// Returns `true` if the set contains the phase.
    #[must_use]
    pub const fn contains(self, dispatch: DispatchType) -> bool {
        self.0 & dispatch.bit() != 0
    }

    /// Adds a phase.
    pub fn insert(&mut self, dispatch: DispatchType) {
        self.0 |= dispatch.bit();
    }

    /// Returns `true` if no phase is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the set, substituting `request` for an empty set.
    ///
    /// A mapping declared without phases applies to direct requests only.
    #[must_use]
    pub const fn or_default(self) -> Self {
        if self.is_empty() {
            Self::REQUEST
        } else {
            self
        }
    }

    /// Iterates the phases in the set in declaration order.
    pub fn iter(self) -> impl Iterator<Item = DispatchType> {
        DispatchType::all()
            .into_iter()
            .filter(move |d| self.contains(*d))
    }
}

impl fmt::Debug for DispatchTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<DispatchType> for DispatchTypes {
    fn from(dispatch: DispatchType) -> Self {
        Self::only(dispatch)
    }
}

impl FromIterator<DispatchType> for DispatchTypes {
    fn from_iter<I: IntoIterator<Item = DispatchType>>(iter: I) -> Self {
        let mut set = Self::NONE;
        for dispatch in iter {
            set.insert(dispatch);
        }
        set
    }
}

impl BitOr for DispatchType {
    type Output = DispatchTypes;

    fn bitor(self, rhs: Self) -> DispatchTypes {
        DispatchTypes(self.bit() | rhs.bit())
    }
}

impl BitOr<DispatchType> for DispatchTypes {
    type Output = Self;

    fn bitor(self, rhs: DispatchType) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl BitOr for DispatchTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_defaults_to_request() {
        let types = DispatchTypes::NONE.or_default();
        assert_eq!(types, DispatchTypes::REQUEST);
        assert!(types.contains(DispatchType::Request));
        assert!(!types.contains(DispatchType::Error));
    }

    #[test]
    fn test_iter_order() {
        let types: DispatchTypes = [DispatchType::Async, DispatchType::Request]
            .into_iter()
            .collect();
        let order: Vec<_> = types.iter().collect();
        assert_eq!(order, vec![DispatchType::Request, DispatchType::Async]);
    }

    #[test]
    fn test_all_contains_everything() {
        for dispatch in DispatchType::all() {
            assert!(DispatchTypes::ALL.contains(dispatch));
        }
    }

    #[test]
    fn test_bitor_chain() {
        let types = DispatchType::Forward | DispatchType::Include | DispatchType::Error;
        assert_eq!(types.iter().count(), 3);
        assert_eq!(format!("{types:?}"), "{Forward, Include, Error}");
    }
}
