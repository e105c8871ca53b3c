//! Root configuration type.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ContextConfig, LogFormat, LoggingConfig};

/// Complete Plinth configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use plinth_config::PlinthConfig;
///
/// let config = PlinthConfig::default();
/// assert_eq!(config.context.name, "default");
/// assert!(!config.context.sessions);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PlinthConfig {
    /// Context configuration.
    #[serde(default)]
    pub context: ContextConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlinthConfig {
    /// Development preset: pretty debug logs, both optional stages enabled.
    #[must_use]
    pub fn development() -> Self {
        Self {
            context: ContextConfig {
                sessions: true,
                security: true,
                ..ContextConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                ansi_enabled: true,
            },
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The context name is empty
    /// - The context path is neither empty nor `/`-prefixed, or ends with `/`
    /// - The log level is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("context.name", "must not be empty"));
        }

        let path = &self.context.context_path;
        if !path.is_empty() {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "context.context_path",
                    format!("must start with '/': {path}"),
                ));
            }
            if path.ends_with('/') {
                return Err(ConfigError::invalid_value(
                    "context.context_path",
                    format!("must not end with '/': {path}"),
                ));
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }

        Ok(())
    }
}
