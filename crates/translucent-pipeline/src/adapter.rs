//! Turns a constructed middleware into a [`RequestDelegate`].
//!
//! The adapter owns the middleware instance and the build-scope container.
//! Each call resolves the middleware's invoke-time services afresh, so a
//! factory-backed service yields a new value per request, and then runs the
//! middleware's entry point with the context and those services.

use crate::dependencies::{first_unresolvable, Dependencies};
use crate::middleware::{Middleware, RequestDelegate};
use std::sync::Arc;
use tracing::trace;
use translucent_core::{Container, InjectionError, PipelineResult};

/// Wraps `middleware` as a delegate whose invoke-time services come from
/// `services`.
pub fn adapt<M: Middleware>(middleware: M, services: Arc<Container>) -> RequestDelegate<M::Context> {
    let middleware = Arc::new(middleware);
    RequestDelegate::new(move |ctx| {
        let middleware = Arc::clone(&middleware);
        trace!(middleware = middleware.name(), "invoking middleware");
        let resolved = M::Services::resolve(&services);
        Box::pin(async move { middleware.invoke(ctx, resolved?).await })
    })
}

/// Fails with `DependencyNotFound` unless every required invoke-time service
/// of `M` is resolvable from `services`.
///
/// Values are not resolved here; only their registrations are checked.
pub fn ensure_invocable<M: Middleware>(services: &Container) -> PipelineResult<()> {
    match first_unresolvable::<M::Services>(services) {
        Some(parameter) => Err(InjectionError::missing(parameter.type_name).into()),
        None => Ok(()),
    }
}
