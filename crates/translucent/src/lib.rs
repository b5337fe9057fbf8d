//! # Translucent
//!
//! Middleware pipelines for resource access.
//!
//! Translucent composes independently written middleware into one async
//! delegate. Middleware declare what they need as typed dependencies, which
//! are supplied explicitly at registration or resolved from a layered
//! [`Container`](prelude::Container).
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use translucent::prelude::*;
//!
//! struct Greeting;
//!
//! impl ResourceController for Greeting {
//!     fn name(&self) -> &str {
//!         "greeting"
//!     }
//!
//!     fn can_handle(&self, request: &Request) -> bool {
//!         request.scheme() == Some("greeting")
//!     }
//!
//!     fn handle<'a>(&'a self, _: &'a Request) -> BoxFuture<'a, anyhow::Result<Response>> {
//!         Box::pin(async { Ok(Response::ok("hello")) })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! let pipeline = translucent::standard_pipeline(
//!     &config,
//!     Arc::new(Container::new()),
//!     ResourceCollection::new().add(Greeting),
//! )
//! .build::<ResourceContext>()?;
//!
//! let mut ctx = ResourceContext::new(Request::get("greeting:world"));
//! pipeline.invoke(&mut ctx).await?;
//! assert_eq!(ctx.response().and_then(Response::body_str), Some("hello"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Standard Pipeline
//!
//! ```text
//! Request → Telemetry → Timeout → Cache → Resource → terminal
//! ```
//!
//! Telemetry, timeout and cache are each registered only when enabled in
//! [`TranslucentConfig`](translucent_config::TranslucentConfig).

#![doc(html_root_url = "https://docs.rs/translucent/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

pub use translucent_config as config;
pub use translucent_pipeline::stages;
pub use translucent_telemetry as telemetry;

use translucent_config::TranslucentConfig;
use translucent_core::Container;
use translucent_pipeline::stages::{
    CacheMiddleware, CorrelationId, ResourceCache, ResourceMiddleware, TelemetryMiddleware,
    TimeoutMiddleware,
};
use translucent_pipeline::{arguments, PipelineBuilder, ResourceCollection, ResourceContext};
use translucent_telemetry::TelemetryResult;

/// Prelude module for convenient imports.
///
/// ```
/// use translucent::prelude::*;
/// ```
pub mod prelude {
    pub use translucent_core::{
        Container, Inject, InjectionError, PipelineError, PipelineResult, RequestId,
    };

    pub use translucent_pipeline::{
        arguments, Activate, Arguments, BoxFuture, Middleware, MiddlewareDescriptor, Pipeline,
        PipelineBuilder, Request, RequestDelegate, ResourceCollection, ResourceContext,
        ResourceController, Response,
    };

    pub use translucent_config::{ConfigLoader, TranslucentConfig};
}

/// Registers the bundled stages described by `config`, in order, followed by
/// resource dispatch.
///
/// The configured timeout is bound explicitly; telemetry options, the
/// response cache and the resource collection go into the build scope. A
/// per-call [`CorrelationId`] factory is added unless `services` already
/// provides one. Further middleware may be registered on the returned
/// builder; they run after resource dispatch.
pub fn standard_pipeline(
    config: &TranslucentConfig,
    services: Arc<Container>,
    resources: ResourceCollection,
) -> PipelineBuilder {
    let provides_correlation = services.contains::<CorrelationId>();
    let mut builder = PipelineBuilder::new(services).with_resources(resources);

    if config.telemetry.enabled {
        builder = builder.with_service(Arc::new(config.telemetry.to_options()));
        if !provides_correlation {
            builder = builder.with_factory(|_| CorrelationId::new());
        }
        builder = builder.use_middleware::<TelemetryMiddleware>();
    }

    if config.timeout.enabled {
        builder = builder.use_middleware_with::<TimeoutMiddleware<ResourceContext>>(arguments![
            config.timeout.to_timeout_config()
        ]);
    }

    if config.cache.enabled {
        builder = builder
            .with_service(Arc::new(ResourceCache::new(config.cache.to_cache_config())))
            .use_middleware::<CacheMiddleware>();
    }

    builder.use_middleware::<ResourceMiddleware>()
}

/// Installs logging as configured and registers metric descriptions.
///
/// # Errors
///
/// Returns `TelemetryError` if a global subscriber is already installed or
/// the level does not parse.
pub fn init_telemetry(config: &TranslucentConfig) -> TelemetryResult<()> {
    translucent_telemetry::init(&config.logging.to_log_config())
}
