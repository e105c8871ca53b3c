//! # Plinth Config
//!
//! Layered configuration for Plinth contexts.
//!
//! Sources are applied in order, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML or JSON file (or string)
//! 3. Environment variables with a prefix
//!
//! ```
//! use plinth_config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_env_prefix("PLINTH")
//!     .load()
//!     .unwrap();
//! assert!(config.context.context_path.is_empty() || config.context.context_path.starts_with('/'));
//! ```
//!
//! ## Environment variables
//!
//! Variables use `PREFIX__SECTION__KEY`:
//!
//! - `PLINTH__CONTEXT__NAME=shop`
//! - `PLINTH__CONTEXT__CONTEXT_PATH=/shop`
//! - `PLINTH__CONTEXT__SESSIONS=true`
//! - `PLINTH__LOGGING__FORMAT=pretty`
//!
//! Unknown fields in files are rejected.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::PlinthConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{ContextConfig, LogFormat, LoggingConfig};
