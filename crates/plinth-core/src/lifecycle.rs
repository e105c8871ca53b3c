//! Lifecycle states shared by the context and its stages.
//!
//! ```text
//! uninitialized ──► starting ──► started ──► stopping ──► stopped
//!                      │            │           │            │
//!                      └────────────┴───────────┴──► failed  └──► starting
//! ```
//!
//! `failed` is terminal. A stopped context may be started again and reuses
//! its registrations.

use std::fmt;

/// The lifecycle state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Constructed, never started.
    #[default]
    Uninitialized,
    /// The pipeline is being assembled and started.
    Starting,
    /// The pipeline is frozen and serving requests.
    Started,
    /// Teardown has begun.
    Stopping,
    /// Teardown finished; a restart is possible.
    Stopped,
    /// An unrecovered error occurred. Terminal.
    Failed,
}

impl LifecycleState {
    /// Returns the lowercase state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `started` and every state after it.
    ///
    /// Stage factories refuse to construct anything in these states.
    #[must_use]
    pub const fn is_started_or_later(self) -> bool {
        matches!(
            self,
            Self::Started | Self::Stopping | Self::Stopped | Self::Failed
        )
    }

    /// Returns `true` while the pipeline is installed and frozen.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Started | Self::Stopping)
    }

    /// Returns `true` if the state can never be left.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns `true` if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Uninitialized | Self::Stopped, Self::Starting)
            | (Self::Starting, Self::Started)
            | (Self::Started, Self::Stopping)
            | (Self::Stopping, Self::Stopped) => true,
            (Self::Starting | Self::Started | Self::Stopping, Self::Failed) => true,
            _ => false,
        }
    }

    /// Returns every state in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Uninitialized,
            Self::Starting,
            Self::Started,
            Self::Stopping,
            Self::Stopped,
            Self::Failed,
        ]
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        use LifecycleState::*;
        assert!(Uninitialized.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Started));
        assert!(Started.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
        assert!(Stopped.can_transition_to(Starting));
    }

    #[test]
    fn test_no_rollback_from_starting() {
        assert!(!LifecycleState::Starting.can_transition_to(LifecycleState::Uninitialized));
        assert!(!LifecycleState::Started.can_transition_to(LifecycleState::Starting));
    }

    #[test]
    fn test_failed_is_terminal() {
        for next in LifecycleState::all() {
            assert!(!LifecycleState::Failed.can_transition_to(next));
        }
        assert!(LifecycleState::Failed.is_terminal());
    }

    #[test]
    fn test_failed_reachable_from_active_states() {
        assert!(LifecycleState::Starting.can_transition_to(LifecycleState::Failed));
        assert!(LifecycleState::Started.can_transition_to(LifecycleState::Failed));
        assert!(LifecycleState::Stopping.can_transition_to(LifecycleState::Failed));
        assert!(!LifecycleState::Uninitialized.can_transition_to(LifecycleState::Failed));
    }

    #[test]
    fn test_started_or_later() {
        assert!(!LifecycleState::Uninitialized.is_started_or_later());
        assert!(!LifecycleState::Starting.is_started_or_later());
        assert!(LifecycleState::Started.is_started_or_later());
        assert!(LifecycleState::Stopped.is_started_or_later());
        assert!(LifecycleState::Failed.is_started_or_later());
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecycleState::Stopping.to_string(), "stopping");
        assert_eq!(LifecycleState::default(), LifecycleState::Uninitialized);
    }
}
