//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, LogFormat, TranslucentConfig};

/// Configuration loader.
///
/// Layers are applied in call order, later ones overriding earlier ones
/// field by field:
/// 1. Defaults (or a preset)
/// 2. Configuration files or strings (TOML or JSON)
/// 3. Environment variables `PREFIX__SECTION__KEY`, applied by [`load`](Self::load)
///
/// # Example
///
/// ```no_run
/// use translucent_config::ConfigLoader;
///
/// # fn main() -> Result<(), translucent_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("translucent.toml")?
///     .with_dotenv()?
///     .with_env_prefix("TRANSLUCENT")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: TranslucentConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    ///
    /// ```
    /// use translucent_config::{ConfigLoader, LogFormat};
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = TranslucentConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = TranslucentConfig::production();
        self
    }

    /// Applies a TOML or JSON file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has
    /// another extension, or does not parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.merge(&content, &extension)?;
        Ok(self)
    }

    /// Applies a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be applied.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Applies configuration text in the given format (`"toml"` or `"json"`).
    ///
    /// ```
    /// use translucent_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[timeout]\nrequest_timeout_ms = 500", "toml")
    ///     .unwrap()
    ///     .with_string(r#"{"cache": {"max_entries": 8}}"#, "json")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.timeout.request_timeout_ms, 500);
    /// assert_eq!(config.cache.max_entries, 8);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unsupported formats and parse failures.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.merge(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Loads `.env` from the working directory or its parents, if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if a `.env` file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads environment variables from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref())?;
        Ok(self)
    }

    /// Sets the environment variable prefix applied by [`load`](Self::load).
    ///
    /// With prefix `TRANSLUCENT`:
    /// - `TRANSLUCENT__LOGGING__LEVEL=debug`
    /// - `TRANSLUCENT__TIMEOUT__REQUEST_TIMEOUT_MS=500`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies `SECTION__KEY` overrides from the given pairs.
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `EnvParseError` for values of the wrong type.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            self.apply_var(key.as_ref(), key.as_ref(), value.as_ref())?;
        }
        Ok(self)
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation fails.
    pub fn load(mut self) -> Result<TranslucentConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> TranslucentConfig {
        self.config
    }

    fn merge(&mut self, content: &str, format: &str) -> Result<(), ConfigError> {
        let overlay = match format {
            "toml" => {
                toml::from_str::<TranslucentConfig>(content)?;
                serde_json::to_value(toml::from_str::<toml::Table>(content)?)?
            }
            "json" => {
                serde_json::from_str::<TranslucentConfig>(content)?;
                serde_json::from_str::<Value>(content)?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, overlay);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(&marker) {
                self.apply_var(&key, stripped, &value)?;
            }
        }
        Ok(())
    }

    fn apply_var(&mut self, var: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let key = key.to_uppercase();
        let parts: Vec<&str> = key.split("__").collect();

        match parts.as_slice() {
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_parse_error(var, "expected 'json' or 'pretty'")),
                };
            }

            ["CACHE", "ENABLED"] => self.config.cache.enabled = parse_bool(var, value)?,
            ["CACHE", "TTL_SECS"] => self.config.cache.ttl_secs = parse_number(var, value)?,
            ["CACHE", "MAX_ENTRIES"] => self.config.cache.max_entries = parse_number(var, value)?,

            ["TIMEOUT", "ENABLED"] => self.config.timeout.enabled = parse_bool(var, value)?,
            ["TIMEOUT", "REQUEST_TIMEOUT_MS"] => {
                self.config.timeout.request_timeout_ms = parse_number(var, value)?;
            }

            ["TELEMETRY", "ENABLED"] => self.config.telemetry.enabled = parse_bool(var, value)?,
            ["TELEMETRY", "SERVICE_NAME"] => self.config.telemetry.service_name = value.to_string(),

            _ => {}
        }

        Ok(())
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse_error(var, "expected boolean")),
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(var, "expected integer"))
}
