//! Stage factories and slots.
//!
//! Each stage kind has one [`StageSlot`]. Whether a slot hands out its
//! instance, stays empty or constructs a new stage is decided by a single
//! pure function, [`slot_policy`], so the enablement and lifecycle checks
//! live in one place.
//!
//! | Instance set | Enabled | State | Decision |
//! |---|---|---|---|
//! | yes | any | any | return existing |
//! | no | no | any | absent |
//! | no | yes | started or later | absent |
//! | no | yes | uninitialized / starting | create |

use std::fmt;
use std::sync::Arc;

use plinth_core::{LifecycleState, PlinthError, PlinthResult};

use crate::dispatch::DispatchStage;
use crate::security::SecurityStage;
use crate::session::SessionStage;
use crate::stage::{DispatchHandler, StageKind, WrapperStage};

/// Produces stock stage instances.
///
/// Install a custom factory on the context to change the type of stage
/// created by default.
pub trait StageFactory: Send + Sync {
    /// Creates the session stage.
    fn new_session_stage(&self) -> PlinthResult<Arc<dyn WrapperStage>>;

    /// Creates the access-control stage.
    fn new_security_stage(&self) -> PlinthResult<Arc<dyn WrapperStage>>;

    /// Creates the dispatch stage.
    fn new_dispatch_stage(&self) -> PlinthResult<Arc<dyn DispatchHandler>>;
}

/// The factory constructing [`SessionStage`], [`SecurityStage`] (allow-all)
/// and [`DispatchStage`] with no arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStageFactory;

impl StageFactory for DefaultStageFactory {
    fn new_session_stage(&self) -> PlinthResult<Arc<dyn WrapperStage>> {
        Ok(Arc::new(SessionStage::new()))
    }

    fn new_security_stage(&self) -> PlinthResult<Arc<dyn WrapperStage>> {
        Ok(Arc::new(SecurityStage::allow_all()))
    }

    fn new_dispatch_stage(&self) -> PlinthResult<Arc<dyn DispatchHandler>> {
        Ok(Arc::new(DispatchStage::new()))
    }
}

/// What [`StageSlot::get_or_create`] should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    /// Hand out the instance already in the slot.
    ReturnExisting,
    /// Return nothing without constructing.
    Absent,
    /// Construct through the factory and cache the result.
    Create,
}

/// Decides how a slot is resolved.
#[must_use]
pub const fn slot_policy(has_instance: bool, enabled: bool, state: LifecycleState) -> SlotDecision {
    if has_instance {
        SlotDecision::ReturnExisting
    } else if !enabled || state.is_started_or_later() {
        SlotDecision::Absent
    } else {
        SlotDecision::Create
    }
}

/// Optional storage for one stage instance.
pub struct StageSlot<T: ?Sized> {
    kind: StageKind,
    instance: Option<Arc<T>>,
}

impl<T: ?Sized> StageSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new(kind: StageKind) -> Self {
        Self {
            kind,
            instance: None,
        }
    }

    /// Returns the stage kind held by this slot.
    #[must_use]
    pub const fn kind(&self) -> StageKind {
        self.kind
    }

    /// Returns the instance, if one is held.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.instance.clone()
    }

    /// Returns `true` if an instance is held.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.instance.is_some()
    }

    /// Replaces the held instance.
    pub fn set(&mut self, instance: Option<Arc<T>>) {
        self.instance = instance;
    }

    /// Returns the held instance or constructs one with `create`.
    ///
    /// Repeated calls return the same instance once created. Factory
    /// failures other than lifecycle, naming and resolution errors are
    /// wrapped as configuration errors.
    pub fn get_or_create<F>(
        &mut self,
        enabled: bool,
        state: LifecycleState,
        create: F,
    ) -> PlinthResult<Option<Arc<T>>>
    where
        F: FnOnce() -> PlinthResult<Arc<T>>,
    {
        match slot_policy(self.instance.is_some(), enabled, state) {
            SlotDecision::ReturnExisting => Ok(self.instance.clone()),
            SlotDecision::Absent => Ok(None),
            SlotDecision::Create => {
                let instance = create().map_err(|err| wrap_factory_error(self.kind, err))?;
                tracing::debug!(stage = %self.kind, %state, "Created stage");
                self.instance = Some(Arc::clone(&instance));
                Ok(Some(instance))
            }
        }
    }
}

fn wrap_factory_error(kind: StageKind, err: PlinthError) -> PlinthError {
    match err {
        PlinthError::Configuration { .. } => {
            PlinthError::configuration_with_source(format!("failed to create {kind} stage"), err)
        }
        other => other,
    }
}

impl<T: ?Sized> fmt::Debug for StageSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageSlot")
            .field("kind", &self.kind)
            .field("set", &self.is_set())
            .finish()
    }
}
