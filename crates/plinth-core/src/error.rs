//! Error types for Plinth.
//!
//! This module provides the [`PlinthError`] type, the single error type
//! surfaced by every registration, stage and lifecycle operation.
//!
//! | Variant | Code | Meaning |
//! |---|---|---|
//! | `IllegalLifecycleState` | `ILLEGAL_LIFECYCLE_STATE` | call made outside its permitted states |
//! | `DuplicateName` | `DUPLICATE_NAME` | a unit or interceptor name is already taken |
//! | `ClassResolution` | `CLASS_RESOLUTION` | a class name could not be turned into an instance |
//! | `Configuration` | `CONFIGURATION` | a stage factory or mapping could not be set up |
//!
//! None of these errors are retried internally.

use std::fmt;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Result type alias using [`PlinthError`].
pub type PlinthResult<T> = Result<T, PlinthError>;

/// The kind of record a registration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    /// A request-handling unit.
    Unit,
    /// An interceptor wrapped around units or paths.
    Interceptor,
}

impl RegistrationKind {
    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Interceptor => "interceptor",
        }
    }
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for Plinth.
///
/// # Example
///
/// ```
/// use plinth_core::{LifecycleState, PlinthError};
///
/// let err = PlinthError::illegal_state("register_unit", LifecycleState::Started);
/// assert_eq!(err.code(), "ILLEGAL_LIFECYCLE_STATE");
/// assert!(err.to_string().contains("started"));
/// ```
#[derive(Error, Debug)]
pub enum PlinthError {
    /// A mutating call was made while the lifecycle state forbids it.
    #[error("{operation} is not permitted while the context is {state}")]
    IllegalLifecycleState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the context was in.
        state: LifecycleState,
    },

    /// A unit or interceptor with the same name already exists.
    #[error("{kind} '{name}' is already registered")]
    DuplicateName {
        /// Whether the collision was on a unit or an interceptor.
        kind: RegistrationKind,
        /// The colliding name.
        name: String,
    },

    /// The class-loading collaborator could not produce an instance.
    #[error("failed to resolve class '{class_name}': {reason}")]
    ClassResolution {
        /// The class name that was looked up.
        class_name: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A stage factory, mapping or unit initialisation failed.
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PlinthError {
    /// Creates an illegal lifecycle state error.
    #[must_use]
    pub const fn illegal_state(operation: &'static str, state: LifecycleState) -> Self {
        Self::IllegalLifecycleState { operation, state }
    }

    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate(kind: RegistrationKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Creates a class resolution error.
    #[must_use]
    pub fn class_resolution(class_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClassResolution {
            class_name: class_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps another error as a configuration error.
    pub fn configuration_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IllegalLifecycleState { .. } => "ILLEGAL_LIFECYCLE_STATE",
            Self::DuplicateName { .. } => "DUPLICATE_NAME",
            Self::ClassResolution { .. } => "CLASS_RESOLUTION",
            Self::Configuration { .. } => "CONFIGURATION",
        }
    }

    /// Returns `true` if this error aborts a start attempt.
    ///
    /// Precondition and naming errors are the caller's to fix; resolution
    /// and configuration failures leave the context in `failed`.
    #[must_use]
    pub const fn aborts_start(&self) -> bool {
        matches!(
            self,
            Self::ClassResolution { .. } | Self::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_state_message() {
        let err = PlinthError::illegal_state("add_unit_mapping", LifecycleState::Started);
        assert_eq!(
            err.to_string(),
            "add_unit_mapping is not permitted while the context is started"
        );
        assert!(!err.aborts_start());
    }

    #[test]
    fn test_duplicate_name() {
        let err = PlinthError::duplicate(RegistrationKind::Interceptor, "auth");
        assert_eq!(err.code(), "DUPLICATE_NAME");
        assert_eq!(err.to_string(), "interceptor 'auth' is already registered");
    }

    #[test]
    fn test_class_resolution_aborts_start() {
        let err = PlinthError::class_resolution("com.example.Missing", "not registered");
        assert_eq!(err.code(), "CLASS_RESOLUTION");
        assert!(err.aborts_start());
        assert!(err.to_string().contains("com.example.Missing"));
    }

    #[test]
    fn test_configuration_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "factory exploded");
        let err = PlinthError::configuration_with_source("session stage", io);
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("factory exploded"));
        assert!(err.aborts_start());
    }
}
