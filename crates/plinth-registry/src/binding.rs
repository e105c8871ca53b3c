//! Registration bindings.
//!
//! A unit or interceptor is registered against exactly one of:
//!
//! - a concrete instance (`Binding::Instance`)
//! - a class reference, a named constructor known at compile time (`Binding::Class`)
//! - a class name string resolved through a [`ClassLoader`] (`Binding::ClassName`)
//!
//! Class references and class names are turned into instances when the
//! registration table is frozen.

use std::fmt;
use std::sync::Arc;

use plinth_core::{Interceptor, PlinthResult, Unit};

use crate::loader::ClassLoader;

/// A named constructor for `T`.
///
/// # Example
///
/// ```
/// use plinth_core::fixtures::EchoUnit;
/// use plinth_core::Unit;
/// use plinth_registry::ClassRef;
/// use std::sync::Arc;
///
/// fn build() -> Arc<dyn Unit> {
///     Arc::new(EchoUnit::new("health"))
/// }
///
/// let class = ClassRef::new("app::Health", build);
/// assert_eq!(class.class_name(), "app::Health");
/// ```
pub struct ClassRef<T: ?Sized> {
    class_name: &'static str,
    construct: fn() -> Arc<T>,
}

impl<T: ?Sized> ClassRef<T> {
    /// Creates a class reference from a name and a constructor.
    #[must_use]
    pub const fn new(class_name: &'static str, construct: fn() -> Arc<T>) -> Self {
        Self {
            class_name,
            construct,
        }
    }

    /// Returns the class name.
    #[must_use]
    pub const fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Constructs a fresh instance.
    #[must_use]
    pub fn instantiate(&self) -> Arc<T> {
        (self.construct)()
    }
}

impl ClassRef<dyn Unit> {
    /// A class reference constructing `U` through `Default`.
    #[must_use]
    pub fn unit<U: Unit + Default>() -> Self {
        Self::new(std::any::type_name::<U>(), default_unit::<U>)
    }
}

impl ClassRef<dyn Interceptor> {
    /// A class reference constructing `I` through `Default`.
    #[must_use]
    pub fn interceptor<I: Interceptor + Default>() -> Self {
        Self::new(std::any::type_name::<I>(), default_interceptor::<I>)
    }
}

fn default_unit<U: Unit + Default>() -> Arc<dyn Unit> {
    Arc::new(U::default())
}

fn default_interceptor<I: Interceptor + Default>() -> Arc<dyn Interceptor> {
    Arc::new(I::default())
}

impl<T: ?Sized> Clone for ClassRef<T> {
    fn clone(&self) -> Self {
        Self {
            class_name: self.class_name,
            construct: self.construct,
        }
    }
}

impl<T: ?Sized> fmt::Debug for ClassRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassRef").field(&self.class_name).finish()
    }
}

/// What a registration is bound to.
pub enum Binding<T: ?Sized> {
    /// A ready-made instance.
    Instance(Arc<T>),
    /// A constructor known at compile time.
    Class(ClassRef<T>),
    /// A class name resolved by the class loader.
    ClassName(String),
}

impl<T: ?Sized> Binding<T> {
    /// Binds to a class name.
    #[must_use]
    pub fn class_name(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    /// Returns the instance if this binding holds one.
    #[must_use]
    pub fn instance(&self) -> Option<&Arc<T>> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Returns the class name for class and class-name bindings.
    #[must_use]
    pub fn declared_class(&self) -> Option<&str> {
        match self {
            Self::Instance(_) => None,
            Self::Class(class) => Some(class.class_name()),
            Self::ClassName(name) => Some(name.as_str()),
        }
    }

    /// Returns a short description of the binding kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Instance(_) => "instance",
            Self::Class(_) => "class",
            Self::ClassName(_) => "class_name",
        }
    }
}

impl Binding<dyn Unit> {
    /// Binds to a unit instance.
    #[must_use]
    pub fn unit<U: Unit>(unit: U) -> Self {
        Self::Instance(Arc::new(unit))
    }
}

impl Binding<dyn Interceptor> {
    /// Binds to an interceptor instance.
    #[must_use]
    pub fn interceptor<I: Interceptor>(interceptor: I) -> Self {
        Self::Instance(Arc::new(interceptor))
    }
}

impl<T: ?Sized> Clone for Binding<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Instance(instance) => Self::Instance(Arc::clone(instance)),
            Self::Class(class) => Self::Class(class.clone()),
            Self::ClassName(name) => Self::ClassName(name.clone()),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Class(class) => f.debug_tuple("Class").field(class).finish(),
            Self::ClassName(name) => f.debug_tuple("ClassName").field(name).finish(),
        }
    }
}

/// Types that can be produced by a [`ClassLoader`].
pub trait Loadable {
    /// Loads an instance of `Self` by class name.
    fn load(loader: &dyn ClassLoader, class_name: &str) -> PlinthResult<Arc<Self>>;
}

impl Loadable for dyn Unit {
    fn load(loader: &dyn ClassLoader, class_name: &str) -> PlinthResult<Arc<Self>> {
        loader.load_unit(class_name)
    }
}

impl Loadable for dyn Interceptor {
    fn load(loader: &dyn ClassLoader, class_name: &str) -> PlinthResult<Arc<Self>> {
        loader.load_interceptor(class_name)
    }
}

impl<T: ?Sized + Loadable> Binding<T> {
    /// Produces the instance this binding stands for.
    ///
    /// Instances are shared, class references construct a new value, class
    /// names go through `loader`.
    pub fn resolve(&self, loader: &dyn ClassLoader) -> PlinthResult<Arc<T>> {
        match self {
            Self::Instance(instance) => Ok(Arc::clone(instance)),
            Self::Class(class) => Ok(class.instantiate()),
            Self::ClassName(name) => T::load(loader, name),
        }
    }
}
