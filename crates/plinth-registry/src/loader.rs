//! Class-loading collaborator.
//!
//! Registrations made by class name are resolved through a [`ClassLoader`]
//! when the registration table is frozen. [`ClassRegistry`] is the stock
//! implementation: a name-keyed table of constructors filled in at startup.
//!
//! # Example
//!
//! ```
//! use plinth_core::fixtures::EchoUnit;
//! use plinth_core::Unit;
//! use plinth_registry::{ClassLoader, ClassRegistry};
//! use std::sync::Arc;
//!
//! let mut classes = ClassRegistry::new();
//! classes.register_unit_fn("app.Echo", || -> Arc<dyn Unit> { Arc::new(EchoUnit::new("echo")) });
//!
//! assert!(classes.load_unit("app.Echo").is_ok());
//! assert!(classes.load_unit("app.Missing").is_err());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use plinth_core::{Interceptor, PlinthError, PlinthResult, Unit};

/// Produces unit and interceptor instances from class names.
pub trait ClassLoader: Send + Sync {
    /// Loads a unit by class name.
    fn load_unit(&self, class_name: &str) -> PlinthResult<Arc<dyn Unit>>;

    /// Loads an interceptor by class name.
    fn load_interceptor(&self, class_name: &str) -> PlinthResult<Arc<dyn Interceptor>>;
}

/// A class loader that knows no classes.
///
/// Used when the owner never configured one; every lookup fails with a
/// class resolution error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClassLoader;

impl ClassLoader for NoClassLoader {
    fn load_unit(&self, class_name: &str) -> PlinthResult<Arc<dyn Unit>> {
        Err(PlinthError::class_resolution(
            class_name,
            "no class loader configured",
        ))
    }

    fn load_interceptor(&self, class_name: &str) -> PlinthResult<Arc<dyn Interceptor>> {
        Err(PlinthError::class_resolution(
            class_name,
            "no class loader configured",
        ))
    }
}

/// A name-keyed table of unit and interceptor constructors.
#[derive(Default)]
pub struct ClassRegistry {
    units: HashMap<String, fn() -> Arc<dyn Unit>>,
    interceptors: HashMap<String, fn() -> Arc<dyn Interceptor>>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit class constructed through `Default`.
    pub fn register_unit<U: Unit + Default>(&mut self, class_name: impl Into<String>) {
        self.units.insert(class_name.into(), construct_unit::<U>);
    }

    /// Registers a unit class with an explicit constructor.
    pub fn register_unit_fn(&mut self, class_name: impl Into<String>, construct: fn() -> Arc<dyn Unit>) {
        self.units.insert(class_name.into(), construct);
    }

    /// Registers an interceptor class constructed through `Default`.
    pub fn register_interceptor<I: Interceptor + Default>(&mut self, class_name: impl Into<String>) {
        self.interceptors
            .insert(class_name.into(), construct_interceptor::<I>);
    }

    /// Registers an interceptor class with an explicit constructor.
    pub fn register_interceptor_fn(
        &mut self,
        class_name: impl Into<String>,
        construct: fn() -> Arc<dyn Interceptor>,
    ) {
        self.interceptors.insert(class_name.into(), construct);
    }

    /// Returns `true` if a unit or interceptor class of this name is known.
    #[must_use]
    pub fn contains(&self, class_name: &str) -> bool {
        self.units.contains_key(class_name) || self.interceptors.contains_key(class_name)
    }

    /// Returns the number of known classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len() + self.interceptors.len()
    }

    /// Returns `true` if no class is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn construct_unit<U: Unit + Default>() -> Arc<dyn Unit> {
    Arc::new(U::default())
}

fn construct_interceptor<I: Interceptor + Default>() -> Arc<dyn Interceptor> {
    Arc::new(I::default())
}

impl ClassLoader for ClassRegistry {
    fn load_unit(&self, class_name: &str) -> PlinthResult<Arc<dyn Unit>> {
        let construct = self.units.get(class_name).ok_or_else(|| {
            PlinthError::class_resolution(class_name, "no unit class registered under this name")
        })?;
        tracing::debug!(class = %class_name, "Loaded unit class");
        Ok(construct())
    }

    fn load_interceptor(&self, class_name: &str) -> PlinthResult<Arc<dyn Interceptor>> {
        let construct = self.interceptors.get(class_name).ok_or_else(|| {
            PlinthError::class_resolution(
                class_name,
                "no interceptor class registered under this name",
            )
        })?;
        tracing::debug!(class = %class_name, "Loaded interceptor class");
        Ok(construct())
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("units", &self.units.len())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
