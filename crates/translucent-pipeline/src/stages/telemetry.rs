//! Per-request span, logs and metrics.
//!
//! # Metrics Emitted
//!
//! - `translucent_requests_total` by `scheme` and `status`
//! - `translucent_request_duration_seconds` by `scheme`
//! - `translucent_in_flight_requests`
//!
//! A failed chain is recorded with the status its error maps to and the
//! error is returned unchanged.

use crate::context::ResourceContext;
use crate::middleware::{Activate, BoxFuture, Middleware, RequestDelegate};
use http::StatusCode;
use std::fmt;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};
use translucent_core::{Inject, PipelineError, PipelineResult};
use translucent_telemetry::metrics::{record_request, InFlightGuard};
use uuid::Uuid;

/// Labels applied to every request's span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Service name reported in the span.
    pub service_name: String,
}

impl TelemetryOptions {
    /// Creates options for the named service.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self::new("translucent")
    }
}

/// Identifier correlating every log line of one invocation.
///
/// Usually registered as a container factory so each call receives a fresh
/// one; when none is registered the stage generates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generates a new time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Emits a span, logs and metrics for every request.
///
/// The correlation id is stored as a context extension before `next` runs.
pub struct TelemetryMiddleware {
    next: RequestDelegate<ResourceContext>,
    options: Inject<TelemetryOptions>,
}

impl Middleware for TelemetryMiddleware {
    type Context = ResourceContext;
    type Services = (Option<Inject<CorrelationId>>,);

    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a mut ResourceContext,
        (correlation,): Self::Services,
    ) -> BoxFuture<'a, PipelineResult<()>> {
        let correlation_id = correlation.map_or_else(CorrelationId::new, |id| *id);
        let scheme = ctx.request().scheme().unwrap_or("none").to_string();

        let span = info_span!(
            "resource_request",
            service.name = %self.options.service_name,
            request_id = %ctx.request_id(),
            correlation_id = %correlation_id,
            method = %ctx.request().method,
            uri = %ctx.request().uri,
        );

        Box::pin(
            async move {
                let _in_flight = InFlightGuard::new();
                let started = Instant::now();
                ctx.set_extension(correlation_id);
                info!("request started");

                let result = self.next.invoke(ctx).await;
                let elapsed = started.elapsed();
                let duration_ms = elapsed.as_secs_f64() * 1000.0;

                let status = match &result {
                    Ok(()) => ctx
                        .response()
                        .map_or(StatusCode::NOT_IMPLEMENTED, |response| response.status),
                    Err(err) => status_for(err),
                };
                record_request(&scheme, status.as_u16(), elapsed);

                match &result {
                    Ok(()) => info!(status = status.as_u16(), duration_ms, "request completed"),
                    Err(err) => error!(
                        status = status.as_u16(),
                        duration_ms,
                        error = %err,
                        "request failed"
                    ),
                }

                result
            }
            .instrument(span),
        )
    }
}

impl Activate for TelemetryMiddleware {
    type Dependencies = (Inject<TelemetryOptions>,);

    fn activate(next: RequestDelegate<ResourceContext>, (options,): Self::Dependencies) -> Self {
        Self { next, options }
    }
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineBuilder;
    use crate::types::{Request, Response};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::{span, Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;
    use translucent_core::Container;
    use translucent_telemetry::logging::fields;

    /// Collects the field names of every span and event.
    #[derive(Clone, Default)]
    struct FieldNames(Arc<Mutex<Vec<&'static str>>>);

    impl FieldNames {
        fn contains(&self, name: &str) -> bool {
            self.0.lock().unwrap().contains(&name)
        }
    }

    impl<S: Subscriber> Layer<S> for FieldNames {
        fn on_new_span(&self, attrs: &span::Attributes<'_>, _: &span::Id, _: Context<'_, S>) {
            let names = attrs.metadata().fields().iter().map(|field| field.name());
            self.0.lock().unwrap().extend(names);
        }

        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            let names = event.metadata().fields().iter().map(|field| field.name());
            self.0.lock().unwrap().extend(names);
        }
    }

    fn container() -> Arc<Container> {
        let mut container = Container::new();
        container.register(Arc::new(TelemetryOptions::new("test-service")));
        Arc::new(container)
    }

    #[tokio::test]
    async fn test_correlation_id_exposed_to_downstream() {
        let pipeline = PipelineBuilder::new(container())
            .use_middleware::<TelemetryMiddleware>()
            .use_fn("respond", |ctx: &mut ResourceContext, next| {
                Box::pin(async move {
                    assert!(ctx.has_extension::<CorrelationId>());
                    ctx.set_response(Response::ok("done"));
                    next.invoke(ctx).await
                })
            })
            .build::<ResourceContext>()
            .unwrap();

        let mut ctx = ResourceContext::new(Request::get("mem:a"));
        pipeline.invoke(&mut ctx).await.unwrap();
        assert!(ctx.get_extension::<CorrelationId>().is_some());
    }

    #[tokio::test]
    async fn test_factory_supplies_fresh_correlation_per_call() {
        let pipeline = PipelineBuilder::new(container())
            .with_factory(|_| CorrelationId::new())
            .use_middleware::<TelemetryMiddleware>()
            .build::<ResourceContext>()
            .unwrap();

        let mut first = ResourceContext::new(Request::get("mem:a"));
        let mut second = ResourceContext::new(Request::get("mem:a"));
        pipeline.invoke(&mut first).await.unwrap();
        pipeline.invoke(&mut second).await.unwrap();

        assert_ne!(
            first.get_extension::<CorrelationId>(),
            second.get_extension::<CorrelationId>()
        );
    }

    #[tokio::test]
    async fn test_errors_propagate_unchanged() {
        let pipeline = PipelineBuilder::new(container())
            .use_middleware::<TelemetryMiddleware>()
            .use_fn("slow", |_ctx: &mut ResourceContext, _next| {
                Box::pin(async {
                    Err::<(), _>(PipelineError::Timeout {
                        elapsed: Duration::from_millis(5),
                    })
                })
            })
            .build::<ResourceContext>()
            .unwrap();

        let err = pipeline
            .invoke(&mut ResourceContext::new(Request::get("mem:a")))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_logs_use_standard_field_names() {
        let names = FieldNames::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(names.clone()));

        let pipeline = PipelineBuilder::new(container())
            .use_middleware::<TelemetryMiddleware>()
            .use_fn("fail", |_ctx: &mut ResourceContext, _next| {
                Box::pin(async {
                    Err::<(), _>(PipelineError::invocation("fail", anyhow::anyhow!("boom")))
                })
            })
            .build::<ResourceContext>()
            .unwrap();
        let _ = pipeline.invoke(&mut ResourceContext::new(Request::get("mem:a"))).await;

        for field in [
            fields::SERVICE_NAME,
            fields::REQUEST_ID,
            fields::CORRELATION_ID,
            fields::METHOD,
            fields::URI,
            fields::STATUS,
            fields::DURATION_MS,
            fields::ERROR,
            fields::MIDDLEWARE,
        ] {
            assert!(names.contains(field), "missing field {field}");
        }
    }

    #[test]
    fn test_missing_options_fail_the_build() {
        let err = PipelineBuilder::default()
            .use_middleware::<TelemetryMiddleware>()
            .build::<ResourceContext>()
            .unwrap_err();
        assert!(matches!(err, PipelineError::DependencyNotFound(_)));
    }

    #[test]
    fn test_status_for_errors() {
        let timeout = PipelineError::Timeout {
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(status_for(&timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(&PipelineError::invocation("x", anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_correlation_id_display_matches_uuid() {
        let id = CorrelationId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
