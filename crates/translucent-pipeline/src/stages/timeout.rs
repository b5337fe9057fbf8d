//! Deadline for the downstream chain.

use crate::middleware::{Activate, BoxFuture, Middleware, RequestDelegate};
use std::time::Duration;
use tracing::warn;
use translucent_core::{Inject, PipelineError, PipelineResult};

/// How long the rest of the chain may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// The deadline.
    pub duration: Duration,
}

impl TimeoutConfig {
    /// Creates a config with the given deadline.
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Fails the request with `PipelineError::Timeout` if everything after this
/// stage takes longer than the configured deadline.
///
/// Works with any context type. The downstream future is dropped when the
/// deadline passes, so work still pending below this stage is cancelled.
pub struct TimeoutMiddleware<C> {
    next: RequestDelegate<C>,
    config: Inject<TimeoutConfig>,
}

impl<C: Send + 'static> Middleware for TimeoutMiddleware<C> {
    type Context = C;
    type Services = ();

    fn name(&self) -> &'static str {
        "timeout"
    }

    fn invoke<'a>(&'a self, ctx: &'a mut C, _: ()) -> BoxFuture<'a, PipelineResult<()>> {
        let limit = self.config.duration;
        Box::pin(async move {
            match tokio::time::timeout(limit, self.next.invoke(ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout = ?limit, "request timed out");
                    Err(PipelineError::Timeout { elapsed: limit })
                }
            }
        })
    }
}

impl<C: Send + 'static> Activate for TimeoutMiddleware<C> {
    type Dependencies = (Inject<TimeoutConfig>,);

    fn activate(next: RequestDelegate<C>, (config,): Self::Dependencies) -> Self {
        Self { next, config }
    }
}
