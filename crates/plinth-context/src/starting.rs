//! The `starting` phase capability.
//!
//! Startup hooks receive a [`Starting`] token. Holding one proves the
//! context is between `begin_start` and `finish_start`, so the unit
//! registration that is only legal in that phase needs no state check.

use plinth_core::{DispatchTypes, Interceptor, PlinthResult, Unit};
use plinth_registry::{
    Binding, InterceptorHandle, InterceptorRegistration, RegistrationTable, UnitHandle,
    UnitRegistration,
};

/// Registration access granted while a context is starting.
///
/// Only the context can create one.
pub struct Starting<'a> {
    context: &'a str,
    table: &'a mut RegistrationTable,
}

impl<'a> Starting<'a> {
    pub(crate) fn new(context: &'a str, table: &'a mut RegistrationTable) -> Self {
        Self { context, table }
    }

    /// Returns the name of the starting context.
    #[must_use]
    pub fn context_name(&self) -> &str {
        self.context
    }

    /// Registers a unit.
    ///
    /// # Errors
    ///
    /// Returns a duplicate name error if `name` is taken.
    pub fn register_unit(
        &mut self,
        name: impl Into<String>,
        binding: Binding<dyn Unit>,
    ) -> PlinthResult<UnitRegistration<'_>> {
        self.table.register_unit(name, binding)
    }

    /// Registers an interceptor.
    ///
    /// # Errors
    ///
    /// Returns a duplicate name error if `name` is taken.
    pub fn register_interceptor(
        &mut self,
        name: impl Into<String>,
        binding: Binding<dyn Interceptor>,
        dispatch_types: DispatchTypes,
    ) -> PlinthResult<InterceptorRegistration<'_>> {
        self.table.register_interceptor(name, binding, dispatch_types)
    }

    /// Maps path patterns onto the unit `name`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is malformed.
    pub fn add_unit_mapping<I, S>(&mut self, name: &str, patterns: I) -> PlinthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table.add_unit_mapping(name, patterns)
    }

    /// Looks up a unit registration.
    #[must_use]
    pub fn find_unit(&self, name: &str) -> Option<UnitHandle<'_>> {
        self.table.find_unit(name)
    }

    /// Looks up an interceptor registration.
    #[must_use]
    pub fn find_interceptor(&self, name: &str) -> Option<InterceptorHandle<'_>> {
        self.table.find_interceptor(name)
    }
}

impl std::fmt::Debug for Starting<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Starting")
            .field("context", &self.context)
            .field("units", &self.table.unit_count())
            .field("interceptors", &self.table.interceptor_count())
            .finish()
    }
}

/// A hook run during `begin_start`, in registration order.
pub type StartupHook = Box<dyn Fn(&mut Starting<'_>) -> PlinthResult<()> + Send + Sync>;

/// A hook run during `begin_stop`, in reverse registration order.
pub type ShutdownHook = Box<dyn Fn() + Send + Sync>;
