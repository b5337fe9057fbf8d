//! Configuration types.
//!
//! Every section is optional in a file; missing fields keep their defaults.
//! Unknown fields are rejected.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use translucent_pipeline::stages::{CacheConfig, TelemetryOptions, TimeoutConfig};
use translucent_telemetry::LogConfig;

/// Root configuration.
///
/// # Example
///
/// ```
/// use translucent_config::TranslucentConfig;
///
/// let config: TranslucentConfig = toml::from_str(r#"
///     [cache]
///     ttl_secs = 5
/// "#).unwrap();
///
/// assert_eq!(config.cache.ttl_secs, 5);
/// assert_eq!(config.cache.max_entries, 1024);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslucentConfig {
    /// Log output.
    pub logging: LoggingConfig,
    /// Response cache stage.
    pub cache: CacheSettings,
    /// Timeout stage.
    pub timeout: TimeoutSettings,
    /// Telemetry stage.
    pub telemetry: TelemetrySettings,
}

impl TranslucentConfig {
    /// Debug logging in human-readable form.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
            ..Self::default()
        }
    }

    /// Info logging as JSON.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        translucent_telemetry::logging::create_env_filter(&self.logging.level)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::invalid_value(
                "cache.ttl_secs",
                "must be greater than zero",
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::invalid_value(
                "cache.max_entries",
                "must be greater than zero",
            ));
        }
        if self.timeout.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "timeout.request_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directives, e.g. `"info"` or `"translucent_pipeline=debug,warn"`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts to the subscriber settings.
    pub fn to_log_config(&self) -> LogConfig {
        let preset = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            level: self.level.clone(),
            ..preset
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Whether the cache stage is registered.
    pub enabled: bool,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Maximum number of cached responses.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 60,
            max_entries: 1024,
        }
    }
}

impl CacheSettings {
    /// Converts to the cache limits.
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            max_entries: self.max_entries,
        }
    }
}

/// `[timeout]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Whether the timeout stage is registered.
    pub enabled: bool,
    /// Deadline for the rest of the chain, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_ms: 30_000,
        }
    }
}

impl TimeoutSettings {
    /// Converts to the stage's deadline.
    pub fn to_timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::new(Duration::from_millis(self.request_timeout_ms))
    }
}

/// `[telemetry]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySettings {
    /// Whether the telemetry stage is registered.
    pub enabled: bool,
    /// Service name attached to request spans.
    pub service_name: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "translucent".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Converts to the stage's options.
    pub fn to_options(&self) -> TelemetryOptions {
        TelemetryOptions::new(self.service_name.clone())
    }
}
