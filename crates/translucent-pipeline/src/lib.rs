//! # Translucent Pipeline
//!
//! Composable middleware pipelines with layered dependency resolution.
//!
//! Middleware are registered on a [`PipelineBuilder`] in execution order.
//! Building activates them from the last registered to the first, so each
//! one is constructed around the delegate of the stage after it, and yields
//! a single [`Pipeline`] that can be invoked for any number of contexts,
//! concurrently.
//!
//! ```text
//! Request → Telemetry → Timeout → Cache → Resource → terminal
//!              │           │        │         │
//!              └───────────┴────────┴─────────┴──── Container (build scope → application)
//! ```
//!
//! ## Dependencies
//!
//! A middleware declares two parameter lists, both tuples of
//! [`Inject<T>`](translucent_core::Inject):
//!
//! | List | Declared by | Resolved |
//! |------|-------------|----------|
//! | Constructor | [`Activate::Dependencies`] | Once, at build, from explicit [`Arguments`] or the container |
//! | Invoke | [`Middleware::Services`] | On every call, from the container |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use translucent_pipeline::stages::{ResourceMiddleware, TimeoutConfig, TimeoutMiddleware};
//! use translucent_pipeline::{
//!     arguments, BoxFuture, PipelineBuilder, Request, ResourceCollection, ResourceContext,
//!     ResourceController, Response,
//! };
//! use std::time::Duration;
//!
//! struct Hello;
//!
//! impl ResourceController for Hello {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     fn can_handle(&self, request: &Request) -> bool {
//!         request.scheme() == Some("hello")
//!     }
//!
//!     fn handle<'a>(&'a self, _: &'a Request) -> BoxFuture<'a, anyhow::Result<Response>> {
//!         Box::pin(async { Ok(Response::ok("world")) })
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), translucent_pipeline::PipelineError> {
//! let pipeline = PipelineBuilder::default()
//!     .with_resources(ResourceCollection::new().add(Hello))
//!     .use_middleware_with::<TimeoutMiddleware<ResourceContext>>(arguments![
//!         TimeoutConfig::new(Duration::from_secs(5))
//!     ])
//!     .use_middleware::<ResourceMiddleware>()
//!     .build::<ResourceContext>()?;
//!
//! let mut ctx = ResourceContext::new(Request::get("hello:"));
//! pipeline.invoke(&mut ctx).await?;
//! assert_eq!(ctx.response().and_then(Response::body_str), Some("world"));
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/translucent-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod adapter;
pub mod context;
pub mod dependencies;
pub mod descriptor;
pub mod middleware;
pub mod pipeline;
pub mod resource;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use context::ResourceContext;
pub use dependencies::{Argument, Arguments, Dependencies, Dependency, Parameter};
pub use descriptor::MiddlewareDescriptor;
pub use middleware::{Activate, BoxFuture, Middleware, RequestDelegate};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use resource::{ResourceCollection, ResourceController};
pub use types::{Request, Response};

pub use translucent_core::{Container, Inject, InjectionError, PipelineError, PipelineResult, RequestId};
