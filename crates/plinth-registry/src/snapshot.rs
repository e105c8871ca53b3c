//! The frozen registration snapshot.
//!
//! Freezing consumes a [`RegistrationTable`] and produces a [`FrozenTable`]:
//! every mapping target is checked and every binding is resolved to an
//! instance. A frozen table has no mutating methods; the only way back to an
//! open table is [`FrozenTable::thaw`], which hands out a copy of the
//! declarations for a restart.

use std::sync::Arc;

use indexmap::IndexMap;
use plinth_core::{Interceptor, PlinthError, PlinthResult, Unit};

use crate::loader::ClassLoader;
use crate::table::{
    InterceptorHandle, InterceptorMapping, RegistrationTable, UnitHandle, UnitMapping, ALL_UNITS,
};

/// An immutable registration table with resolved instances.
pub struct FrozenTable {
    declared: RegistrationTable,
    units: IndexMap<String, Arc<dyn Unit>>,
    interceptors: IndexMap<String, Arc<dyn Interceptor>>,
}

impl RegistrationTable {
    /// Freezes the table, resolving every binding through `loader`.
    ///
    /// # Errors
    ///
    /// - [`PlinthError::Configuration`] if a mapping names an unknown unit or
    ///   interceptor.
    /// - [`PlinthError::ClassResolution`] if a class-name binding cannot be
    ///   loaded.
    ///
    /// # Example
    ///
    /// ```
    /// use plinth_core::fixtures::EchoUnit;
    /// use plinth_registry::{Binding, NoClassLoader, RegistrationTable};
    ///
    /// let mut table = RegistrationTable::new();
    /// table.register_unit("a", Binding::unit(EchoUnit::new("a"))).unwrap();
    ///
    /// let frozen = table.freeze(&NoClassLoader).unwrap();
    /// assert!(frozen.unit("a").is_some());
    /// ```
    pub fn freeze(self, loader: &dyn ClassLoader) -> PlinthResult<FrozenTable> {
        self.validate_targets()?;

        let mut units = IndexMap::with_capacity(self.unit_count());
        for record in self.units() {
            let instance = record.binding().resolve(loader)?;
            units.insert(record.name().to_string(), instance);
        }

        let mut interceptors = IndexMap::with_capacity(self.interceptor_count());
        for record in self.interceptors() {
            let instance = record.binding().resolve(loader)?;
            interceptors.insert(record.name().to_string(), instance);
        }

        tracing::debug!(
            units = units.len(),
            interceptors = interceptors.len(),
            "Froze registration table"
        );

        Ok(FrozenTable {
            declared: self,
            units,
            interceptors,
        })
    }

    fn validate_targets(&self) -> PlinthResult<()> {
        if let Some(mapping) = self
            .unit_mappings()
            .iter()
            .find(|mapping| !self.contains_unit(&mapping.unit))
        {
            return Err(PlinthError::configuration(format!(
                "pattern '{}' is mapped to unknown unit '{}'",
                mapping.spec, mapping.unit
            )));
        }

        for mapping in self.interceptor_mappings() {
            if !self.contains_interceptor(&mapping.interceptor) {
                return Err(PlinthError::configuration(format!(
                    "mapping refers to unknown interceptor '{}'",
                    mapping.interceptor
                )));
            }
            if let Some(unit) = mapping
                .unit_names
                .iter()
                .find(|unit| unit.as_str() != ALL_UNITS && !self.contains_unit(unit))
            {
                return Err(PlinthError::configuration(format!(
                    "interceptor '{}' is mapped to unknown unit '{unit}'",
                    mapping.interceptor
                )));
            }
        }
        Ok(())
    }
}

impl FrozenTable {
    /// Looks up a unit's registration by name.
    #[must_use]
    pub fn find_unit(&self, name: &str) -> Option<UnitHandle<'_>> {
        self.declared.find_unit(name)
    }

    /// Looks up an interceptor's registration by name.
    #[must_use]
    pub fn find_interceptor(&self, name: &str) -> Option<InterceptorHandle<'_>> {
        self.declared.find_interceptor(name)
    }

    /// Returns the resolved unit instance for `name`.
    #[must_use]
    pub fn unit(&self, name: &str) -> Option<&Arc<dyn Unit>> {
        self.units.get(name)
    }

    /// Returns the resolved interceptor instance for `name`.
    #[must_use]
    pub fn interceptor(&self, name: &str) -> Option<&Arc<dyn Interceptor>> {
        self.interceptors.get(name)
    }

    /// Iterates over resolved units in registration order.
    pub fn units(&self) -> impl DoubleEndedIterator<Item = (&str, &Arc<dyn Unit>)> {
        self.units.iter().map(|(name, unit)| (name.as_str(), unit))
    }

    /// Iterates over resolved interceptors in registration order.
    pub fn interceptors(&self) -> impl DoubleEndedIterator<Item = (&str, &Arc<dyn Interceptor>)> {
        self.interceptors
            .iter()
            .map(|(name, interceptor)| (name.as_str(), interceptor))
    }

    /// Returns unit mappings in the order they were added.
    #[must_use]
    pub fn unit_mappings(&self) -> &[UnitMapping] {
        self.declared.unit_mappings()
    }

    /// Returns interceptor mappings in chain order.
    #[must_use]
    pub fn interceptor_mappings(&self) -> &[InterceptorMapping] {
        self.declared.interceptor_mappings()
    }

    /// Returns an open copy of the declarations this snapshot was built from.
    #[must_use]
    pub fn thaw(&self) -> RegistrationTable {
        self.declared.clone()
    }
}

impl std::fmt::Debug for FrozenTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrozenTable")
            .field("units", &self.units.keys().collect::<Vec<_>>())
            .field("interceptors", &self.interceptors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
