//! Core middleware traits and the request delegate.
//!
//! A middleware is a type that is constructed once, with the delegate for
//! the rest of the chain, and then invoked for every request. Construction
//! and invocation are split across two traits:
//!
//! - [`Activate`] declares the constructor: the `next` delegate followed by
//!   [`Activate::Dependencies`], supplied explicitly at registration or
//!   resolved from the build-scope container once, at build time.
//! - [`Middleware`] declares the single entry point: the context followed by
//!   [`Middleware::Services`], resolved from the container on every call.
//!
//! # Example
//!
//! ```
//! use translucent_pipeline::{
//!     Activate, BoxFuture, Middleware, PipelineResult, RequestDelegate, ResourceContext,
//! };
//!
//! struct Logging {
//!     next: RequestDelegate<ResourceContext>,
//! }
//!
//! impl Middleware for Logging {
//!     type Context = ResourceContext;
//!     type Services = ();
//!
//!     fn invoke<'a>(
//!         &'a self,
//!         ctx: &'a mut ResourceContext,
//!         _services: (),
//!     ) -> BoxFuture<'a, PipelineResult<()>> {
//!         Box::pin(async move {
//!             tracing::info!(uri = %ctx.request().uri, "before");
//!             let result = self.next.invoke(ctx).await;
//!             tracing::info!("after");
//!             result
//!         })
//!     }
//! }
//!
//! impl Activate for Logging {
//!     type Dependencies = ();
//!
//!     fn activate(next: RequestDelegate<ResourceContext>, _: ()) -> Self {
//!         Self { next }
//!     }
//! }
//! ```
//!
//! A middleware has exactly one entry point. A type without one does not
//! compile:
//!
//! ```compile_fail
//! use translucent_pipeline::{Middleware, ResourceContext};
//!
//! struct NoEntryPoint;
//!
//! impl Middleware for NoEntryPoint {
//!     type Context = ResourceContext;
//!     type Services = ();
//! }
//! ```
//!
//! and neither does a type that tries to declare a second one:
//!
//! ```compile_fail
//! use translucent_pipeline::{BoxFuture, Middleware, PipelineResult, ResourceContext};
//!
//! struct TwoEntryPoints;
//!
//! impl Middleware for TwoEntryPoints {
//!     type Context = ResourceContext;
//!     type Services = ();
//!     fn invoke<'a>(&'a self, _: &'a mut ResourceContext, _: ()) -> BoxFuture<'a, PipelineResult<()>> {
//!         Box::pin(async { Ok(()) })
//!     }
//! }
//!
//! impl Middleware for TwoEntryPoints {
//!     type Context = String;
//!     type Services = ();
//!     fn invoke<'a>(&'a self, _: &'a mut String, _: ()) -> BoxFuture<'a, PipelineResult<()>> {
//!         Box::pin(async { Ok(()) })
//!     }
//! }
//! ```

use crate::dependencies::Dependencies;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use translucent_core::{PipelineError, PipelineResult};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type DelegateFn<C> =
    dyn for<'a> Fn(&'a mut C) -> BoxFuture<'a, PipelineResult<()>> + Send + Sync;

/// A callable step of a pipeline: `context -> unit of work`.
///
/// Cloning is cheap; clones share the same underlying chain. The delegate
/// returned by a pipeline build can be invoked any number of times,
/// concurrently, with different contexts.
pub struct RequestDelegate<C> {
    inner: Arc<DelegateFn<C>>,
}

impl<C> Clone for RequestDelegate<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for RequestDelegate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDelegate")
            .field("context", &std::any::type_name::<C>())
            .finish()
    }
}

impl<C: Send + 'static> RequestDelegate<C> {
    /// Wraps a function as a delegate.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, PipelineResult<()>> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// The delegate at the end of every chain.
    ///
    /// Completes immediately and leaves the context untouched.
    pub fn terminal() -> Self {
        Self::new(|_ctx| Box::pin(async { Ok::<(), PipelineError>(()) }))
    }

    /// Runs the chain starting at this delegate.
    pub fn invoke<'a>(&self, ctx: &'a mut C) -> BoxFuture<'a, PipelineResult<()>> {
        (self.inner)(ctx)
    }
}

/// The invocation side of a middleware.
///
/// # Invariants
///
/// - The middleware instance is shared by every invocation of the pipeline,
///   possibly concurrently; interior state must be immutable or
///   synchronized.
/// - Not calling `next` short-circuits the rest of the chain.
/// - Errors from `next` should be propagated, not swallowed.
pub trait Middleware: Send + Sync + 'static {
    /// The context type the entry point accepts.
    type Context: Send + 'static;

    /// Parameters after the context, resolved fresh on every invocation.
    type Services: Dependencies;

    /// Name used in diagnostics and stage listings.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Handles one request.
    fn invoke<'a>(
        &'a self,
        ctx: &'a mut Self::Context,
        services: Self::Services,
    ) -> BoxFuture<'a, PipelineResult<()>>;
}

/// The construction side of a middleware.
pub trait Activate: Middleware + Sized {
    /// Constructor parameters after the `next` delegate.
    type Dependencies: Dependencies;

    /// Builds the middleware around the rest of the chain.
    fn activate(next: RequestDelegate<Self::Context>, dependencies: Self::Dependencies) -> Self;
}
