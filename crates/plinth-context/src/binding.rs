//! The registration facade handed to application code.
//!
//! Every call is checked against the lifecycle state before it reaches the
//! registration table:
//!
//! | Call | Allowed states |
//! |---|---|
//! | `add_interceptor_mapping_for_unit_names` | uninitialized, starting |
//! | `add_unit_mapping` | uninitialized, starting |
//! | `register_interceptor` | uninitialized, starting |
//! | `register_unit` | starting |
//! | `find_interceptor` / `find_unit` | any |
//! | `create_interceptor` / `create_unit` | any (not supported, always `None`) |

use std::fmt;
use std::sync::Arc;

use plinth_core::{
    DispatchTypes, Interceptor, LifecycleState, PlinthError, PlinthResult, Unit,
};
use plinth_registry::{
    Binding, InterceptorHandle, InterceptorRegistration, RegistrationTable, UnitHandle,
    UnitRegistration,
};
use plinth_stages::{DispatchHandler, NamedDispatcher};

use crate::lifecycle::LifecycleMachine;
use crate::registrations::Registrations;

/// The facade calls subject to a lifecycle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingCall {
    /// Map an interceptor onto units by name.
    AddInterceptorMappingForUnitNames,
    /// Map a unit onto path patterns.
    AddUnitMapping,
    /// Register an interceptor.
    RegisterInterceptor,
    /// Register a unit.
    RegisterUnit,
    /// Look up an interceptor.
    FindInterceptor,
    /// Look up a unit.
    FindUnit,
    /// Instantiate an interceptor through the context.
    CreateInterceptor,
    /// Instantiate a unit through the context.
    CreateUnit,
}

impl BindingCall {
    /// Returns the operation name used in errors and logs.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::AddInterceptorMappingForUnitNames => "add_interceptor_mapping_for_unit_names",
            Self::AddUnitMapping => "add_unit_mapping",
            Self::RegisterInterceptor => "register_interceptor",
            Self::RegisterUnit => "register_unit",
            Self::FindInterceptor => "find_interceptor",
            Self::FindUnit => "find_unit",
            Self::CreateInterceptor => "create_interceptor",
            Self::CreateUnit => "create_unit",
        }
    }

    /// Returns `true` if the call is allowed in `state`.
    #[must_use]
    pub const fn permits(self, state: LifecycleState) -> bool {
        match self {
            Self::AddInterceptorMappingForUnitNames
            | Self::AddUnitMapping
            | Self::RegisterInterceptor => {
                matches!(state, LifecycleState::Uninitialized | LifecycleState::Starting)
            }
            Self::RegisterUnit => matches!(state, LifecycleState::Starting),
            Self::FindInterceptor | Self::FindUnit | Self::CreateInterceptor | Self::CreateUnit => {
                true
            }
        }
    }

    /// Returns every call in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 8] {
        [
            Self::AddInterceptorMappingForUnitNames,
            Self::AddUnitMapping,
            Self::RegisterInterceptor,
            Self::RegisterUnit,
            Self::FindInterceptor,
            Self::FindUnit,
            Self::CreateInterceptor,
            Self::CreateUnit,
        ]
    }
}

impl fmt::Display for BindingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// Lifecycle-checked access to a context's registrations.
///
/// Obtained from [`ContextHandler::binding`](crate::ContextHandler::binding).
pub struct ContextBinding<'a> {
    registrations: &'a mut Registrations,
    lifecycle: &'a LifecycleMachine,
    dispatch: Option<Arc<dyn DispatchHandler>>,
}

impl<'a> ContextBinding<'a> {
    pub(crate) fn new(
        registrations: &'a mut Registrations,
        lifecycle: &'a LifecycleMachine,
        dispatch: Option<Arc<dyn DispatchHandler>>,
    ) -> Self {
        Self {
            registrations,
            lifecycle,
            dispatch,
        }
    }

    /// Returns the lifecycle state seen by this binding.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    fn table(&mut self, call: BindingCall) -> PlinthResult<&mut RegistrationTable> {
        let state = self.lifecycle.state();
        if !call.permits(state) {
            tracing::warn!(
                context = %self.lifecycle.context(),
                operation = call.operation(),
                state = %state,
                "Rejected registration call"
            );
            return Err(PlinthError::illegal_state(call.operation(), state));
        }
        self.registrations.open_mut(call.operation(), state)
    }

    /// Maps the interceptor `name` onto units by name.
    ///
    /// With `match_after` the mapping runs after the existing ones, otherwise
    /// before all of them.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` outside `uninitialized` and `starting`.
    pub fn add_interceptor_mapping_for_unit_names<I, S>(
        &mut self,
        name: &str,
        dispatch_types: DispatchTypes,
        match_after: bool,
        unit_names: I,
    ) -> PlinthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table(BindingCall::AddInterceptorMappingForUnitNames)?
            .add_interceptor_mapping_for_unit_names(name, dispatch_types, match_after, unit_names);
        Ok(())
    }

    /// Maps path patterns onto the unit `name`.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` outside `uninitialized` and
    /// `starting`, or with a configuration error for a malformed pattern.
    pub fn add_unit_mapping<I, S>(&mut self, name: &str, patterns: I) -> PlinthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table(BindingCall::AddUnitMapping)?
            .add_unit_mapping(name, patterns)
    }

    /// Registers an interceptor and returns its registration handle.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` outside `uninitialized` and
    /// `starting`, or with `DuplicateName`.
    pub fn register_interceptor(
        &mut self,
        name: impl Into<String>,
        binding: Binding<dyn Interceptor>,
        dispatch_types: DispatchTypes,
    ) -> PlinthResult<InterceptorRegistration<'_>> {
        self.table(BindingCall::RegisterInterceptor)?
            .register_interceptor(name, binding, dispatch_types)
    }

    /// Registers a unit and returns its registration handle.
    ///
    /// # Errors
    ///
    /// Fails with `IllegalLifecycleState` outside `starting`, or with
    /// `DuplicateName`.
    pub fn register_unit(
        &mut self,
        name: impl Into<String>,
        binding: Binding<dyn Unit>,
    ) -> PlinthResult<UnitRegistration<'_>> {
        self.table(BindingCall::RegisterUnit)?
            .register_unit(name, binding)
    }

    /// Looks up a unit registration in any state.
    #[must_use]
    pub fn find_unit(&self, name: &str) -> Option<UnitHandle<'_>> {
        self.registrations.find_unit(name)
    }

    /// Looks up an interceptor registration in any state.
    #[must_use]
    pub fn find_interceptor(&self, name: &str) -> Option<InterceptorHandle<'_>> {
        self.registrations.find_interceptor(name)
    }

    /// Returns a dispatcher bound to the unit `name`.
    ///
    /// `None` if the unit is not registered or the context has no dispatch
    /// stage yet. An unknown name is not an error.
    #[must_use]
    pub fn resolve_path_dispatch(&self, name: &str) -> Option<NamedDispatcher> {
        let dispatch = self.dispatch.as_ref()?;
        if !self.registrations.contains_unit(name) {
            tracing::debug!(unit = %name, "No such dispatch target");
            return None;
        }
        Some(NamedDispatcher::new(Arc::clone(dispatch), name))
    }

    /// Instantiating units through the context is not supported.
    ///
    /// Always returns `None`; bind an instance or class instead.
    #[must_use]
    pub fn create_unit(&self, class_name: &str) -> Option<Arc<dyn Unit>> {
        tracing::debug!(
            operation = BindingCall::CreateUnit.operation(),
            class = %class_name,
            "Not supported"
        );
        None
    }

    /// Instantiating interceptors through the context is not supported.
    ///
    /// Always returns `None`; bind an instance or class instead.
    #[must_use]
    pub fn create_interceptor(&self, class_name: &str) -> Option<Arc<dyn Interceptor>> {
        tracing::debug!(
            operation = BindingCall::CreateInterceptor.operation(),
            class = %class_name,
            "Not supported"
        );
        None
    }
}

impl fmt::Debug for ContextBinding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBinding")
            .field("context", &self.lifecycle.context())
            .field("state", &self.lifecycle.state())
            .field("dispatch", &self.dispatch.is_some())
            .finish_non_exhaustive()
    }
}
