//! Observability for Translucent pipelines.
//!
//! - **Logging**: `tracing-subscriber` setup with JSON or pretty output
//! - **Metrics**: request counters, latency and in-flight gauge through the
//!   `metrics` facade
//!
//! # Example
//!
//! ```rust,no_run
//! use translucent_telemetry::{init, LogConfig};
//!
//! init(&LogConfig::production())?;
//! # Ok::<(), translucent_telemetry::TelemetryError>(())
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::InFlightGuard;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging and registers metric descriptions.
///
/// # Errors
///
/// Returns `TelemetryError` if logging cannot be installed.
pub fn init(config: &LogConfig) -> TelemetryResult<()> {
    init_logging(config)?;
    metrics::describe_metrics();
    Ok(())
}
