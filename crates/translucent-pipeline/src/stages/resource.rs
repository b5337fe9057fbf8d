//! Dispatch to resource controllers.

use crate::context::ResourceContext;
use crate::middleware::{Activate, BoxFuture, Middleware, RequestDelegate};
use crate::resource::ResourceCollection;
use crate::types::Response;
use tracing::debug;
use translucent_core::{Inject, PipelineError, PipelineResult};

/// Hands the request to the first controller that accepts it.
///
/// The controller's response is stored in the context; when no controller
/// accepts the request the response is `404 Not Found`. Either way `next`
/// runs afterwards, so middleware registered later can post-process.
pub struct ResourceMiddleware {
    next: RequestDelegate<ResourceContext>,
    resources: Inject<ResourceCollection>,
}

impl Middleware for ResourceMiddleware {
    type Context = ResourceContext;
    type Services = ();

    fn name(&self) -> &'static str {
        "resource"
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a mut ResourceContext,
        _: (),
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            let response = match self.resources.find(ctx.request()) {
                Some(controller) => {
                    debug!(controller = controller.name(), "dispatching resource request");
                    controller.handle(ctx.request()).await.map_err(|err| {
                        let context = format!("controller '{}' failed", controller.name());
                        PipelineError::invocation("resource", err.context(context))
                    })?
                }
                None => {
                    debug!(uri = %ctx.request().uri, "no controller accepts request");
                    Response::not_found()
                }
            };

            ctx.set_response(response);
            self.next.invoke(ctx).await
        })
    }
}

impl Activate for ResourceMiddleware {
    type Dependencies = (Inject<ResourceCollection>,);

    fn activate(next: RequestDelegate<ResourceContext>, (resources,): Self::Dependencies) -> Self {
        Self { next, resources }
    }
}
