//! Pipeline construction.
//!
//! [`PipelineBuilder`] collects middleware registrations in execution order.
//! [`PipelineBuilder::build`] activates them from the innermost (last
//! registered) outward, handing each one the delegate of the middleware
//! registered after it, and returns the outermost delegate as a
//! [`Pipeline`].
//!
//! ```text
//! use(A) → use(B) → use(C)          registration
//! C(next = terminal)                 activation, innermost first
//! B(next = C)
//! A(next = B)
//! A → B → C → terminal               execution
//! ```

use crate::dependencies::Arguments;
use crate::descriptor::MiddlewareDescriptor;
use crate::middleware::{Activate, BoxFuture, RequestDelegate};
use crate::resource::ResourceCollection;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use translucent_core::{Container, PipelineError, PipelineResult};

/// A built pipeline.
///
/// Middleware instances are created once, by the build, and shared by every
/// invocation. Cloning a pipeline is cheap and yields a handle to the same
/// chain.
///
/// # Example
///
/// ```
/// use translucent_pipeline::{PipelineBuilder, Request, Response, ResourceContext};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), translucent_core::PipelineError> {
/// let pipeline = PipelineBuilder::default()
///     .use_fn("echo", |ctx: &mut ResourceContext, next| {
///         Box::pin(async move {
///             let body = ctx.request().body.clone();
///             ctx.set_response(Response::ok(body));
///             next.invoke(ctx).await
///         })
///     })
///     .build::<ResourceContext>()?;
///
/// let mut ctx = ResourceContext::new(Request::post("echo:").with_body("hello"));
/// pipeline.invoke(&mut ctx).await?;
/// assert_eq!(ctx.response().unwrap().body_str(), Some("hello"));
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<C> {
    delegate: RequestDelegate<C>,
    stages: Arc<[&'static str]>,
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            delegate: self.delegate.clone(),
            stages: Arc::clone(&self.stages),
        }
    }
}

impl<C> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("context", &type_name::<C>())
            .field("stages", &self.stages)
            .finish()
    }
}

impl<C: Send + 'static> Pipeline<C> {
    /// Runs the whole chain for one context.
    pub fn invoke<'a>(&self, ctx: &'a mut C) -> BoxFuture<'a, PipelineResult<()>> {
        self.delegate.invoke(ctx)
    }

    /// Returns the outermost delegate.
    pub fn delegate(&self) -> &RequestDelegate<C> {
        &self.delegate
    }

    /// Consumes the pipeline, returning the outermost delegate.
    pub fn into_delegate(self) -> RequestDelegate<C> {
        self.delegate
    }

    /// Returns the middleware names in execution order.
    pub fn stage_names(&self) -> &[&'static str] {
        &self.stages
    }

    /// Returns the number of middleware stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
///
/// The same middleware type may be registered any number of times. Services
/// added with [`with_service`](Self::with_service) and friends live in a
/// build-scope layer on top of the container passed to
/// [`new`](Self::new), which is never modified.
pub struct PipelineBuilder {
    middleware: Vec<MiddlewareDescriptor>,
    services: Arc<Container>,
    scope: Container,
}

impl PipelineBuilder {
    /// Creates a builder resolving dependencies from `services`.
    #[must_use]
    pub fn new(services: Arc<Container>) -> Self {
        Self {
            middleware: Vec::new(),
            services,
            scope: Container::new(),
        }
    }

    /// Registers middleware `M`, resolving its constructor dependencies.
    #[must_use]
    pub fn use_middleware<M: Activate>(self) -> Self {
        self.use_middleware_with::<M>(Arguments::new())
    }

    /// Registers middleware `M` with explicit constructor arguments.
    ///
    /// The arguments must match `M`'s constructor dependencies exactly, in
    /// order; this is checked by [`build`](Self::build).
    #[must_use]
    pub fn use_middleware_with<M: Activate>(self, arguments: Arguments) -> Self {
        self.add(MiddlewareDescriptor::of::<M>(arguments))
    }

    /// Registers an inline middleware.
    ///
    /// The function receives the context and the `next` delegate and may
    /// call it zero or one times.
    #[must_use]
    pub fn use_fn<C, F>(self, name: &'static str, f: F) -> Self
    where
        C: Send + 'static,
        F: for<'a> Fn(&'a mut C, RequestDelegate<C>) -> BoxFuture<'a, PipelineResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.add(MiddlewareDescriptor::from_fn(name, f))
    }

    /// Registers a prepared descriptor.
    #[must_use]
    pub fn add(mut self, descriptor: MiddlewareDescriptor) -> Self {
        self.middleware.push(descriptor);
        self
    }

    /// Makes `service` resolvable to middleware of this pipeline only.
    #[must_use]
    pub fn with_service<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.scope.register(service);
        self
    }

    /// Registers a per-resolution factory for this pipeline only.
    #[must_use]
    pub fn with_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.scope.register_factory(factory);
        self
    }

    /// Makes the resource collection resolvable to constructors.
    #[must_use]
    pub fn with_resources(self, resources: ResourceCollection) -> Self {
        self.with_service(Arc::new(resources))
    }

    /// Returns the registered descriptors in execution order.
    pub fn descriptors(&self) -> &[MiddlewareDescriptor] {
        &self.middleware
    }

    /// Returns the number of registered middleware.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Activates every registered middleware and composes them.
    ///
    /// # Errors
    ///
    /// - `EmptyPipeline` if no middleware was registered
    /// - any activation error of a registered middleware, see
    ///   [`MiddlewareDescriptor::activate`]
    pub fn build<C: Send + 'static>(self) -> PipelineResult<Pipeline<C>> {
        if self.middleware.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let services = Arc::new(self.scope.with_parent(self.services));

        let mut previous = RequestDelegate::<C>::terminal();
        for descriptor in self.middleware.iter().rev() {
            previous = descriptor.activate(previous, &services)?;
            debug!(middleware = descriptor.name(), "activated middleware");
        }

        let stages: Arc<[&'static str]> = self
            .middleware
            .iter()
            .map(MiddlewareDescriptor::name)
            .collect();

        debug!(
            context = type_name::<C>(),
            stage_count = stages.len(),
            "pipeline built"
        );

        Ok(Pipeline {
            delegate: previous,
            stages,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new(Arc::new(Container::new()))
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("middleware", &self.middleware)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
