//! Logging and metrics setup for Plinth.
//!
//! - **Logging**: a `tracing-subscriber` registry with JSON or pretty output
//! - **Metrics**: names and descriptions of the counters Plinth emits through
//!   the `metrics` facade
//!
//! # Example
//!
//! ```rust,ignore
//! use plinth_config::ConfigLoader;
//! use plinth_telemetry::{init_logging, LogConfig};
//!
//! let config = ConfigLoader::new().with_env_prefix("PLINTH").load()?;
//! init_logging(&LogConfig::from(&config.logging))?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};
pub use crate::metrics::describe_metrics;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
