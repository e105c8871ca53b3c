//! # Plinth Registry
//!
//! The registration table for units and interceptors.
//!
//! Registration is two-phase:
//!
//! - [`RegistrationTable`] accepts registrations, mappings and lookups.
//! - [`FrozenTable`] is produced by [`RegistrationTable::freeze`] exactly once
//!   per start and only answers lookups.
//!
//! Bindings made by class name are resolved through a [`ClassLoader`] at
//! freeze time.
//!
//! ## Example
//!
//! ```
//! use plinth_core::fixtures::EchoUnit;
//! use plinth_registry::{Binding, NoClassLoader, RegistrationTable};
//!
//! let mut table = RegistrationTable::new();
//! table
//!     .register_unit("orders", Binding::unit(EchoUnit::new("orders")))
//!     .unwrap()
//!     .add_mapping("/orders/*")
//!     .unwrap();
//!
//! let frozen = table.freeze(&NoClassLoader).unwrap();
//! assert_eq!(frozen.find_unit("orders").unwrap().mappings(), vec!["/orders/*"]);
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-registry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binding;
mod loader;
mod path;
mod snapshot;
mod table;

pub use binding::{Binding, ClassRef, Loadable};
pub use loader::{ClassLoader, ClassRegistry, NoClassLoader};
pub use path::PathSpec;
pub use snapshot::FrozenTable;
pub use table::{
    InterceptorHandle, InterceptorMapping, InterceptorRecord, InterceptorRegistration,
    RegistrationTable, UnitHandle, UnitMapping, UnitRecord, UnitRegistration, ALL_UNITS,
};
