//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Settings for one context.
///
/// `sessions` and `security` select which optional pipeline stages are
/// enabled when the context is constructed; both are off by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Context name used in logs.
    #[serde(default = "default_context_name")]
    pub name: String,

    /// Path prefix the context is mounted under. Empty means the root.
    #[serde(default)]
    pub context_path: String,

    /// Enable the session stage.
    #[serde(default)]
    pub sessions: bool,

    /// Enable the access-control stage.
    #[serde(default)]
    pub security: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: default_context_name(),
            context_path: String::new(),
            sessions: false,
            security: false,
        }
    }
}

fn default_context_name() -> String {
    "default".to_string()
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level or filter directive (`info`, `plinth_context=debug`, ...).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include ANSI color codes in output.
    #[serde(default)]
    pub ansi_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_config_default() {
        let config = ContextConfig::default();
        assert_eq!(config.name, "default");
        assert!(config.context_path.is_empty());
        assert!(!config.sessions);
        assert!(!config.security);
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_deserialize() {
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }

    #[test]
    fn test_context_config_rejects_unknown_fields() {
        let result: Result<ContextConfig, _> =
            serde_json::from_str(r#"{"name": "shop", "sesions": true}"#);
        assert!(result.is_err());
    }
}
