//! The open registration table.
//!
//! [`RegistrationTable`] is the builder half of the registry: it accepts unit
//! and interceptor registrations and their mappings until it is frozen into a
//! [`FrozenTable`](crate::FrozenTable). Names are unique per kind and
//! registration order is preserved, since it decides initialisation order and
//! (for interceptor mappings) chain position.
//!
//! # Example
//!
//! ```
//! use plinth_core::fixtures::EchoUnit;
//! use plinth_registry::{Binding, RegistrationTable};
//!
//! let mut table = RegistrationTable::new();
//! table
//!     .register_unit("users", Binding::unit(EchoUnit::new("users")))
//!     .unwrap()
//!     .add_mapping("/users/*")
//!     .unwrap();
//!
//! let handle = table.find_unit("users").unwrap();
//! assert_eq!(handle.mappings(), vec!["/users/*".to_string()]);
//! ```

use indexmap::IndexMap;
use plinth_core::{
    DispatchTypes, Interceptor, PlinthError, PlinthResult, RegistrationKind, Unit,
};

use crate::binding::Binding;
use crate::path::PathSpec;

/// Unit name that maps an interceptor onto every unit.
pub const ALL_UNITS: &str = "*";

/// A registered unit.
#[derive(Debug, Clone)]
pub struct UnitRecord {
    name: String,
    binding: Binding<dyn Unit>,
}

impl UnitRecord {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the binding.
    #[must_use]
    pub fn binding(&self) -> &Binding<dyn Unit> {
        &self.binding
    }
}

/// A registered interceptor.
#[derive(Debug, Clone)]
pub struct InterceptorRecord {
    name: String,
    binding: Binding<dyn Interceptor>,
    dispatch_types: DispatchTypes,
}

impl InterceptorRecord {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the binding.
    #[must_use]
    pub fn binding(&self) -> &Binding<dyn Interceptor> {
        &self.binding
    }

    /// Returns the dispatch phases used by mappings added without explicit phases.
    #[must_use]
    pub const fn dispatch_types(&self) -> DispatchTypes {
        self.dispatch_types
    }
}

/// A path pattern mapped to a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMapping {
    /// The target unit name.
    pub unit: String,
    /// The pattern.
    pub spec: PathSpec,
}

/// An interceptor applied to paths and/or units for some dispatch phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorMapping {
    /// The interceptor name.
    pub interceptor: String,
    /// The dispatch phases this mapping takes part in.
    pub dispatch_types: DispatchTypes,
    /// Path patterns the mapping applies to.
    pub paths: Vec<PathSpec>,
    /// Unit names the mapping applies to (`*` for all).
    pub unit_names: Vec<String>,
}

impl InterceptorMapping {
    /// Returns `true` if this mapping applies to a request for `unit` at `path`.
    #[must_use]
    pub fn applies_to(&self, path: &str, unit: Option<&str>) -> bool {
        if self.paths.iter().any(|spec| spec.matches(path)) {
            return true;
        }
        unit.is_some_and(|unit| {
            self.unit_names
                .iter()
                .any(|name| name == ALL_UNITS || name == unit)
        })
    }
}

/// The mutable registration table.
#[derive(Debug, Clone, Default)]
pub struct RegistrationTable {
    units: IndexMap<String, UnitRecord>,
    interceptors: IndexMap<String, InterceptorRecord>,
    unit_mappings: Vec<UnitMapping>,
    interceptor_mappings: Vec<InterceptorMapping>,
}

impl RegistrationTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PlinthError::DuplicateName`] if a unit of that name exists.
    /// The table is left unchanged.
    pub fn register_unit(
        &mut self,
        name: impl Into<String>,
        binding: Binding<dyn Unit>,
    ) -> PlinthResult<UnitRegistration<'_>> {
        let name = name.into();
        if self.units.contains_key(&name) {
            return Err(PlinthError::duplicate(RegistrationKind::Unit, name));
        }
        tracing::debug!(unit = %name, binding = binding.kind(), "Registered unit");
        self.units.insert(
            name.clone(),
            UnitRecord {
                name: name.clone(),
                binding,
            },
        );
        Ok(UnitRegistration { table: self, name })
    }

    /// Registers an interceptor under `name`.
    ///
    /// `dispatch_types` are the phases used by mappings later added through
    /// the returned handle without explicit phases. Empty means request only.
    ///
    /// # Errors
    ///
    /// Returns [`PlinthError::DuplicateName`] if an interceptor of that name
    /// exists. The table is left unchanged.
    pub fn register_interceptor(
        &mut self,
        name: impl Into<String>,
        binding: Binding<dyn Interceptor>,
        dispatch_types: DispatchTypes,
    ) -> PlinthResult<InterceptorRegistration<'_>> {
        let name = name.into();
        if self.interceptors.contains_key(&name) {
            return Err(PlinthError::duplicate(RegistrationKind::Interceptor, name));
        }
        tracing::debug!(
            interceptor = %name,
            binding = binding.kind(),
            dispatch_types = ?dispatch_types,
            "Registered interceptor"
        );
        self.interceptors.insert(
            name.clone(),
            InterceptorRecord {
                name: name.clone(),
                binding,
                dispatch_types: dispatch_types.or_default(),
            },
        );
        Ok(InterceptorRegistration { table: self, name })
    }

    /// Looks up a unit by name.
    #[must_use]
    pub fn find_unit(&self, name: &str) -> Option<UnitHandle<'_>> {
        self.units.get(name).map(|record| UnitHandle { record, table: self })
    }

    /// Looks up an interceptor by name.
    #[must_use]
    pub fn find_interceptor(&self, name: &str) -> Option<InterceptorHandle<'_>> {
        self.interceptors
            .get(name)
            .map(|record| InterceptorHandle { record, table: self })
    }

    /// Returns a mutable handle to a registered unit.
    pub fn unit_mut(&mut self, name: &str) -> Option<UnitRegistration<'_>> {
        if self.units.contains_key(name) {
            Some(UnitRegistration {
                table: self,
                name: name.to_string(),
            })
        } else {
            None
        }
    }

    /// Returns a mutable handle to a registered interceptor.
    pub fn interceptor_mut(&mut self, name: &str) -> Option<InterceptorRegistration<'_>> {
        if self.interceptors.contains_key(name) {
            Some(InterceptorRegistration {
                table: self,
                name: name.to_string(),
            })
        } else {
            None
        }
    }

    /// Returns `true` if a unit of this name is registered.
    #[must_use]
    pub fn contains_unit(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Returns `true` if an interceptor of this name is registered.
    #[must_use]
    pub fn contains_interceptor(&self, name: &str) -> bool {
        self.interceptors.contains_key(name)
    }

    /// Maps path patterns to the unit `name`.
    ///
    /// The unit does not need to be registered yet; unknown targets are
    /// reported when the table is frozen.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is malformed. No mapping is
    /// added in that case.
    pub fn add_unit_mapping<I, S>(&mut self, name: &str, patterns: I) -> PlinthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = parse_all(patterns)?;
        for spec in specs {
            tracing::debug!(unit = %name, pattern = %spec, "Mapped unit");
            self.unit_mappings.push(UnitMapping {
                unit: name.to_string(),
                spec,
            });
        }
        Ok(())
    }

    /// Adds an interceptor mapping.
    ///
    /// With `match_after` the mapping runs after every existing mapping;
    /// otherwise it is placed before all of them.
    pub fn add_interceptor_mapping(&mut self, mut mapping: InterceptorMapping, match_after: bool) {
        mapping.dispatch_types = mapping.dispatch_types.or_default();
        tracing::debug!(
            interceptor = %mapping.interceptor,
            paths = mapping.paths.len(),
            units = ?mapping.unit_names,
            match_after,
            "Mapped interceptor"
        );
        if match_after {
            self.interceptor_mappings.push(mapping);
        } else {
            self.interceptor_mappings.insert(0, mapping);
        }
    }

    /// Maps the interceptor `name` onto units by name.
    pub fn add_interceptor_mapping_for_unit_names<I, S>(
        &mut self,
        name: &str,
        dispatch_types: DispatchTypes,
        match_after: bool,
        unit_names: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_interceptor_mapping(
            InterceptorMapping {
                interceptor: name.to_string(),
                dispatch_types,
                paths: Vec::new(),
                unit_names: unit_names.into_iter().map(Into::into).collect(),
            },
            match_after,
        );
    }

    /// Maps the interceptor `name` onto path patterns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a pattern is malformed.
    pub fn add_interceptor_mapping_for_paths<I, S>(
        &mut self,
        name: &str,
        dispatch_types: DispatchTypes,
        match_after: bool,
        patterns: I,
    ) -> PlinthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = parse_all(patterns)?;
        self.add_interceptor_mapping(
            InterceptorMapping {
                interceptor: name.to_string(),
                dispatch_types,
                paths,
                unit_names: Vec::new(),
            },
            match_after,
        );
        Ok(())
    }

    /// Iterates over units in registration order.
    pub fn units(&self) -> impl Iterator<Item = &UnitRecord> {
        self.units.values()
    }

    /// Iterates over interceptors in registration order.
    pub fn interceptors(&self) -> impl Iterator<Item = &InterceptorRecord> {
        self.interceptors.values()
    }

    /// Returns unit mappings in the order they were added.
    #[must_use]
    pub fn unit_mappings(&self) -> &[UnitMapping] {
        &self.unit_mappings
    }

    /// Returns interceptor mappings in chain order.
    #[must_use]
    pub fn interceptor_mappings(&self) -> &[InterceptorMapping] {
        &self.interceptor_mappings
    }

    /// Returns the number of registered units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Returns the number of registered interceptors.
    #[must_use]
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if nothing has been registered or mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
            && self.interceptors.is_empty()
            && self.unit_mappings.is_empty()
            && self.interceptor_mappings.is_empty()
    }

    /// Removes every registration and mapping.
    pub fn clear(&mut self) {
        self.units.clear();
        self.interceptors.clear();
        self.unit_mappings.clear();
        self.interceptor_mappings.clear();
    }

    fn patterns_for(&self, unit: &str) -> Vec<String> {
        self.unit_mappings
            .iter()
            .filter(|mapping| mapping.unit == unit)
            .map(|mapping| mapping.spec.pattern())
            .collect()
    }
}

fn parse_all<I, S>(patterns: I) -> PlinthResult<Vec<PathSpec>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| PathSpec::parse(pattern.as_ref()))
        .collect()
}

/// A read-only view of a registered unit.
#[derive(Debug, Clone, Copy)]
pub struct UnitHandle<'a> {
    record: &'a UnitRecord,
    table: &'a RegistrationTable,
}

impl<'a> UnitHandle<'a> {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.record.name
    }

    /// Returns the binding.
    #[must_use]
    pub fn binding(&self) -> &'a Binding<dyn Unit> {
        &self.record.binding
    }

    /// Returns every pattern mapped to this unit, in mapping order.
    #[must_use]
    pub fn mappings(&self) -> Vec<String> {
        self.table.patterns_for(&self.record.name)
    }
}

/// A read-only view of a registered interceptor.
#[derive(Debug, Clone, Copy)]
pub struct InterceptorHandle<'a> {
    record: &'a InterceptorRecord,
    table: &'a RegistrationTable,
}

impl<'a> InterceptorHandle<'a> {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.record.name
    }

    /// Returns the binding.
    #[must_use]
    pub fn binding(&self) -> &'a Binding<dyn Interceptor> {
        &self.record.binding
    }

    /// Returns the default dispatch phases.
    #[must_use]
    pub fn dispatch_types(&self) -> DispatchTypes {
        self.record.dispatch_types
    }

    /// Returns every mapping of this interceptor, in chain order.
    #[must_use]
    pub fn mappings(&self) -> Vec<&'a InterceptorMapping> {
        self.table
            .interceptor_mappings
            .iter()
            .filter(|mapping| mapping.interceptor == self.record.name)
            .collect()
    }
}

/// A mutable handle returned when a unit is registered.
#[derive(Debug)]
pub struct UnitRegistration<'a> {
    table: &'a mut RegistrationTable,
    name: String,
}

impl UnitRegistration<'_> {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maps a path pattern to this unit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern is malformed.
    pub fn add_mapping(&mut self, pattern: &str) -> PlinthResult<&mut Self> {
        self.table.add_unit_mapping(&self.name, [pattern])?;
        Ok(self)
    }

    /// Maps several path patterns to this unit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any pattern is malformed.
    pub fn add_mappings<I, S>(&mut self, patterns: I) -> PlinthResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table.add_unit_mapping(&self.name, patterns)?;
        Ok(self)
    }

    /// Returns every pattern mapped to this unit.
    #[must_use]
    pub fn mappings(&self) -> Vec<String> {
        self.table.patterns_for(&self.name)
    }
}

/// A mutable handle returned when an interceptor is registered.
#[derive(Debug)]
pub struct InterceptorRegistration<'a> {
    table: &'a mut RegistrationTable,
    name: String,
}

impl InterceptorRegistration<'_> {
    /// Returns the registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn default_dispatch_types(&self) -> DispatchTypes {
        self.table
            .interceptors
            .get(&self.name)
            .map_or(DispatchTypes::REQUEST, InterceptorRecord::dispatch_types)
    }

    /// Appends a path mapping using the registered dispatch phases.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern is malformed.
    pub fn add_path_mapping(&mut self, pattern: &str) -> PlinthResult<&mut Self> {
        let dispatch_types = self.default_dispatch_types();
        self.add_mapping_for_paths(dispatch_types, true, [pattern])
    }

    /// Appends a unit-name mapping using the registered dispatch phases.
    pub fn add_unit_name_mapping(&mut self, unit: &str) -> &mut Self {
        let dispatch_types = self.default_dispatch_types();
        self.add_mapping_for_unit_names(dispatch_types, true, [unit])
    }

    /// Maps this interceptor onto path patterns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any pattern is malformed.
    pub fn add_mapping_for_paths<I, S>(
        &mut self,
        dispatch_types: DispatchTypes,
        match_after: bool,
        patterns: I,
    ) -> PlinthResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table
            .add_interceptor_mapping_for_paths(&self.name, dispatch_types, match_after, patterns)?;
        Ok(self)
    }

    /// Maps this interceptor onto units by name.
    pub fn add_mapping_for_unit_names<I, S>(
        &mut self,
        dispatch_types: DispatchTypes,
        match_after: bool,
        unit_names: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table.add_interceptor_mapping_for_unit_names(
            &self.name,
            dispatch_types,
            match_after,
            unit_names,
        );
        self
    }
}
