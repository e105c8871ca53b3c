//! Open or frozen registrations held by a context.

use std::sync::Arc;

use plinth_core::{LifecycleState, PlinthError, PlinthResult};
use plinth_registry::{ClassLoader, FrozenTable, InterceptorHandle, RegistrationTable, UnitHandle};

/// The registration table in one of its two phases.
#[derive(Debug)]
pub(crate) enum Registrations {
    Open(RegistrationTable),
    Frozen(Arc<FrozenTable>),
}

impl Default for Registrations {
    fn default() -> Self {
        Self::Open(RegistrationTable::new())
    }
}

impl Registrations {
    pub(crate) fn find_unit(&self, name: &str) -> Option<UnitHandle<'_>> {
        match self {
            Self::Open(table) => table.find_unit(name),
            Self::Frozen(table) => table.find_unit(name),
        }
    }

    pub(crate) fn find_interceptor(&self, name: &str) -> Option<InterceptorHandle<'_>> {
        match self {
            Self::Open(table) => table.find_interceptor(name),
            Self::Frozen(table) => table.find_interceptor(name),
        }
    }

    pub(crate) fn contains_unit(&self, name: &str) -> bool {
        self.find_unit(name).is_some()
    }

    pub(crate) fn counts(&self) -> (usize, usize) {
        match self {
            Self::Open(table) => (table.unit_count(), table.interceptor_count()),
            Self::Frozen(table) => (table.units().count(), table.interceptors().count()),
        }
    }

    /// Returns the open table, or fails if the registrations are frozen.
    pub(crate) fn open_mut(
        &mut self,
        operation: &'static str,
        state: LifecycleState,
    ) -> PlinthResult<&mut RegistrationTable> {
        match self {
            Self::Open(table) => Ok(table),
            Self::Frozen(_) => Err(PlinthError::illegal_state(operation, state)),
        }
    }

    /// Freezes the table. On failure the open table is kept.
    pub(crate) fn freeze(&mut self, loader: &dyn ClassLoader) -> PlinthResult<Arc<FrozenTable>> {
        match self {
            Self::Open(table) => {
                let frozen = Arc::new(table.clone().freeze(loader)?);
                *self = Self::Frozen(Arc::clone(&frozen));
                Ok(frozen)
            }
            Self::Frozen(frozen) => Ok(Arc::clone(frozen)),
        }
    }

    pub(crate) fn thaw(&mut self) {
        if let Self::Frozen(frozen) = self {
            *self = Self::Open(frozen.thaw());
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub(crate) const fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_core::fixtures::EchoUnit;
    use plinth_registry::{Binding, NoClassLoader};

    fn with_unit(name: &str) -> Registrations {
        let mut registrations = Registrations::default();
        registrations
            .open_mut("test", LifecycleState::Uninitialized)
            .unwrap()
            .register_unit(name, Binding::unit(EchoUnit::new(name)))
            .unwrap();
        registrations
    }

    #[test]
    fn test_lookup_survives_freeze_and_thaw() {
        let mut registrations = with_unit("a");
        assert!(registrations.contains_unit("a"));

        registrations.freeze(&NoClassLoader).unwrap();
        assert!(registrations.is_frozen());
        assert!(registrations.contains_unit("a"));
        assert!(registrations
            .open_mut("register_unit", LifecycleState::Started)
            .is_err());

        registrations.thaw();
        assert!(!registrations.is_frozen());
        assert!(registrations.contains_unit("a"));
    }

    #[test]
    fn test_failed_freeze_keeps_open_table() {
        let mut registrations = Registrations::default();
        registrations
            .open_mut("test", LifecycleState::Uninitialized)
            .unwrap()
            .register_unit("lazy", Binding::class_name("app.Lazy"))
            .unwrap();

        let err = registrations.freeze(&NoClassLoader).unwrap_err();
        assert_eq!(err.code(), "CLASS_RESOLUTION");
        assert!(!registrations.is_frozen());
        assert!(registrations.contains_unit("lazy"));
    }

    #[test]
    fn test_clear() {
        let mut registrations = with_unit("a");
        registrations.clear();
        assert_eq!(registrations.counts(), (0, 0));
    }
}
