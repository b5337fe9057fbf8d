//! Bundled middleware stages.
//!
//! Each stage is an ordinary [`Middleware`](crate::Middleware) +
//! [`Activate`](crate::Activate) implementation. A typical resource pipeline
//! registers them in this order:
//!
//! 1. [`telemetry`] - Span, logs and metrics per request
//! 2. [`timeout`] - Deadline for everything downstream
//! 3. [`cache`] - Serve repeated `GET`s from memory
//! 4. [`resource`] - Dispatch to the matching resource controller

pub mod cache;
pub mod resource;
pub mod telemetry;
pub mod timeout;

pub use cache::{CacheConfig, CacheMiddleware, CacheStatus, ResourceCache};
pub use resource::ResourceMiddleware;
pub use telemetry::{CorrelationId, TelemetryMiddleware, TelemetryOptions};
pub use timeout::{TimeoutConfig, TimeoutMiddleware};
