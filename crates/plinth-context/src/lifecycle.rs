//! The lifecycle state machine of a context.
//!
//! Transitions are driven by the owner through `begin_start`,
//! `finish_start`, `begin_stop` and `finish_stop`:
//!
//! ```text
//! uninitialized ──► starting ──► started ──► stopping ──► stopped
//!                      │            │           │            │
//!                      └────────────┴─► failed ◄┘            │
//!                      ▲                                     │
//!                      └─────────────────────────────────────┘
//! ```
//!
//! `failed` is terminal.

use plinth_core::{LifecycleState, PlinthError, PlinthResult};

/// Tracks the lifecycle state of one context.
#[derive(Debug, Clone)]
pub struct LifecycleMachine {
    context: String,
    state: LifecycleState,
}

impl LifecycleMachine {
    /// Creates a machine in the uninitialized state.
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            state: LifecycleState::Uninitialized,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns the context name used in logs.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    pub(crate) fn rename(&mut self, context: impl Into<String>) {
        self.context = context.into();
    }

    /// Moves to `starting`.
    ///
    /// # Errors
    ///
    /// Fails unless the state is `uninitialized` or `stopped`.
    pub fn begin_start(&mut self) -> PlinthResult<()> {
        self.transition("begin_start", LifecycleState::Starting)
    }

    /// Moves to `started`.
    ///
    /// # Errors
    ///
    /// Fails unless the state is `starting`.
    pub fn finish_start(&mut self) -> PlinthResult<()> {
        self.transition("finish_start", LifecycleState::Started)
    }

    /// Moves to `stopping`.
    ///
    /// # Errors
    ///
    /// Fails unless the state is `started`.
    pub fn begin_stop(&mut self) -> PlinthResult<()> {
        self.transition("begin_stop", LifecycleState::Stopping)
    }

    /// Moves to `stopped`.
    ///
    /// # Errors
    ///
    /// Fails unless the state is `stopping`.
    pub fn finish_stop(&mut self) -> PlinthResult<()> {
        self.transition("finish_stop", LifecycleState::Stopped)
    }

    /// Moves to `failed` after an unrecovered error.
    ///
    /// Has no effect in states `failed` cannot be reached from.
    pub fn fail(&mut self, cause: &PlinthError) {
        if !self.state.can_transition_to(LifecycleState::Failed) {
            return;
        }
        tracing::error!(
            context = %self.context,
            from = %self.state,
            error = %cause,
            code = cause.code(),
            "Context failed"
        );
        self.record(LifecycleState::Failed);
        self.state = LifecycleState::Failed;
    }

    /// Checks that the current state is one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns [`PlinthError::IllegalLifecycleState`] naming `operation`.
    pub fn require(&self, operation: &'static str, allowed: &[LifecycleState]) -> PlinthResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            tracing::warn!(
                context = %self.context,
                operation,
                state = %self.state,
                "Rejected call"
            );
            Err(PlinthError::illegal_state(operation, self.state))
        }
    }

    fn transition(&mut self, operation: &'static str, to: LifecycleState) -> PlinthResult<()> {
        if !self.state.can_transition_to(to) {
            tracing::warn!(
                context = %self.context,
                operation,
                from = %self.state,
                to = %to,
                "Rejected lifecycle transition"
            );
            return Err(PlinthError::illegal_state(operation, self.state));
        }
        tracing::info!(context = %self.context, from = %self.state, to = %to, "Lifecycle transition");
        self.record(to);
        self.state = to;
        Ok(())
    }

    fn record(&self, to: LifecycleState) {
        metrics::counter!(
            "plinth_lifecycle_transitions_total",
            "context" => self.context.clone(),
            "to" => to.as_str()
        )
        .increment(1);
    }
}
