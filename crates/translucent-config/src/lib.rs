//! # Translucent Config
//!
//! Typed configuration for Translucent pipelines, loaded in layers:
//! defaults, then TOML/JSON files, then environment variables.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"        # or "pretty"
//!
//! [cache]
//! enabled = true
//! ttl_secs = 60
//! max_entries = 1024
//!
//! [timeout]
//! enabled = true
//! request_timeout_ms = 30000
//!
//! [telemetry]
//! enabled = true
//! service_name = "translucent"
//! ```
//!
//! Runtime settings are always handed to the stages explicitly; nothing here
//! is stored in a global.

#![doc(html_root_url = "https://docs.rs/translucent-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{
    CacheSettings, LogFormat, LoggingConfig, TelemetrySettings, TimeoutSettings, TranslucentConfig,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;
