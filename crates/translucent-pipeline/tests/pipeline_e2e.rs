//! End-to-end tests for building and invoking pipelines.

use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use translucent_pipeline::{
    arguments, Activate, BoxFuture, Container, Inject, Middleware, PipelineBuilder, PipelineError,
    PipelineResult, Request, RequestDelegate, ResourceContext, Response,
};

/// Context used by the ordering scenarios.
#[derive(Debug, Default)]
struct Trace {
    log: Vec<String>,
    response: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(&'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step(u16);

/// Logs `<label>-in` and `<label>-out` around `next`.
struct Around {
    next: RequestDelegate<Trace>,
    label: Inject<Label>,
}

impl Middleware for Around {
    type Context = Trace;
    type Services = ();

    fn invoke<'a>(&'a self, ctx: &'a mut Trace, _: ()) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            ctx.log.push(format!("{}-in", self.label.inner().0));
            self.next.invoke(ctx).await?;
            ctx.log.push(format!("{}-out", self.label.inner().0));
            Ok(())
        })
    }
}

impl Activate for Around {
    type Dependencies = (Inject<Label>,);

    fn activate(next: RequestDelegate<Trace>, (label,): Self::Dependencies) -> Self {
        Self { next, label }
    }
}

/// Sets the response and never calls `next`.
struct Respond {
    body: Inject<String>,
}

impl Middleware for Respond {
    type Context = Trace;
    type Services = ();

    fn invoke<'a>(&'a self, ctx: &'a mut Trace, _: ()) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            ctx.response = Some(self.body.to_string());
            Ok(())
        })
    }
}

impl Activate for Respond {
    type Dependencies = (Inject<String>,);

    fn activate(_next: RequestDelegate<Trace>, (body,): Self::Dependencies) -> Self {
        Self { body }
    }
}

/// Logs the step number it was built with.
struct Record {
    next: RequestDelegate<Trace>,
    step: Inject<Step>,
}

impl Middleware for Record {
    type Context = Trace;
    type Services = ();

    fn invoke<'a>(&'a self, ctx: &'a mut Trace, _: ()) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            ctx.log.push(self.step.inner().0.to_string());
            self.next.invoke(ctx).await
        })
    }
}

impl Activate for Record {
    type Dependencies = (Inject<Step>,);

    fn activate(next: RequestDelegate<Trace>, (step,): Self::Dependencies) -> Self {
        Self { next, step }
    }
}

/// Copies the request body into the response.
struct Echo {
    next: RequestDelegate<ResourceContext>,
}

impl Middleware for Echo {
    type Context = ResourceContext;
    type Services = ();

    fn invoke<'a>(
        &'a self,
        ctx: &'a mut ResourceContext,
        _: (),
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let body = ctx.request().body.clone();
            ctx.set_response(Response::ok(body));
            self.next.invoke(ctx).await
        })
    }
}

impl Activate for Echo {
    type Dependencies = ();

    fn activate(next: RequestDelegate<ResourceContext>, (): ()) -> Self {
        Self { next }
    }
}

/// Stamps a per-call ticket number into the log.
struct Ticketed {
    next: RequestDelegate<Trace>,
}

struct Ticket(u32);

impl Middleware for Ticketed {
    type Context = Trace;
    type Services = (Inject<Ticket>,);

    fn invoke<'a>(
        &'a self,
        ctx: &'a mut Trace,
        (ticket,): Self::Services,
    ) -> BoxFuture<'a, PipelineResult<()>> {
        Box::pin(async move {
            ctx.log.push(format!("ticket-{}", ticket.inner().0));
            self.next.invoke(ctx).await
        })
    }
}

impl Activate for Ticketed {
    type Dependencies = ();

    fn activate(next: RequestDelegate<Trace>, (): ()) -> Self {
        Self { next }
    }
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_registration_order_is_execution_order() {
    let pipeline = PipelineBuilder::default()
        .use_middleware_with::<Around>(arguments![Label("A")])
        .use_middleware_with::<Around>(arguments![Label("B")])
        .use_middleware_with::<Around>(arguments![Label("C")])
        .build::<Trace>()
        .unwrap();

    let mut trace = Trace::default();
    pipeline.invoke(&mut trace).await.unwrap();

    assert_eq!(trace.log, ["A-in", "B-in", "C-in", "C-out", "B-out", "A-out"]);
}

#[tokio::test]
async fn test_chain_reaches_terminal_delegate() {
    let pipeline = PipelineBuilder::default()
        .use_middleware_with::<Around>(arguments![Label("only")])
        .build::<Trace>()
        .unwrap();

    let mut trace = Trace::default();
    pipeline.invoke(&mut trace).await.unwrap();

    assert_eq!(trace.log, ["only-in", "only-out"]);
    assert!(trace.response.is_none());
}

#[tokio::test]
async fn test_short_circuit_returns_control_to_outer_middleware() {
    let pipeline = PipelineBuilder::default()
        .use_middleware_with::<Around>(arguments![Label("A")])
        .use_middleware_with::<Respond>(arguments!["ok".to_string()])
        .use_middleware_with::<Around>(arguments![Label("C")])
        .build::<Trace>()
        .unwrap();

    let mut trace = Trace::default();
    pipeline.invoke(&mut trace).await.unwrap();

    assert_eq!(trace.response.as_deref(), Some("ok"));
    assert_eq!(trace.log, ["A-in", "A-out"]);
}

proptest! {
    #[test]
    fn prop_any_registration_sequence_runs_in_order(steps in prop::collection::vec(any::<u16>(), 1..24)) {
        let builder = steps.iter().fold(PipelineBuilder::default(), |builder, step| {
            builder.use_middleware_with::<Record>(arguments![Step(*step)])
        });
        let pipeline = builder.build::<Trace>().unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let mut trace = Trace::default();
        runtime.block_on(pipeline.invoke(&mut trace)).unwrap();

        let expected: Vec<String> = steps.iter().map(ToString::to_string).collect();
        prop_assert_eq!(trace.log, expected);
        prop_assert_eq!(pipeline.stage_count(), steps.len());
    }
}

// ============================================================================
// Build errors
// ============================================================================

#[test]
fn test_empty_pipeline_never_builds() {
    let err = PipelineBuilder::default().build::<Trace>().unwrap_err();
    assert!(matches!(err, PipelineError::EmptyPipeline));
    assert!(err.is_configuration_error());
}

#[test]
fn test_constructor_mismatch_lists_attempted_types() {
    let err = PipelineBuilder::default()
        .use_middleware_with::<Around>(arguments![Label("A")])
        .use_middleware_with::<Around>(arguments![42_i64, "extra"])
        .build::<Trace>()
        .unwrap_err();

    let message = err.to_string();
    assert!(matches!(err, PipelineError::MiddlewareConstructorNotFound { .. }));
    assert!(message.contains("Around"), "{message}");
    assert!(message.contains("RequestDelegate"), "{message}");
    assert!(message.contains("i64"), "{message}");
    assert!(message.contains("&str"), "{message}");
}

#[test]
fn test_context_type_mismatch_names_expected_type() {
    let err = PipelineBuilder::default()
        .use_middleware::<Echo>()
        .build::<Trace>()
        .unwrap_err();

    match err {
        PipelineError::InvalidInvokeSignature {
            expected, found, ..
        } => {
            assert!(expected.ends_with("Trace"));
            assert!(found.ends_with("ResourceContext"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unresolvable_constructor_dependency_fails_build() {
    let err = PipelineBuilder::default()
        .use_middleware::<Around>()
        .build::<Trace>()
        .unwrap_err();

    match err {
        PipelineError::DependencyNotFound(inner) => assert!(inner.type_name.ends_with("Label")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unresolvable_invoke_service_fails_build() {
    let err = PipelineBuilder::default()
        .use_middleware::<Ticketed>()
        .build::<Trace>()
        .unwrap_err();
    assert!(matches!(err, PipelineError::DependencyNotFound(_)));
}

// ============================================================================
// Dependency resolution
// ============================================================================

#[tokio::test]
async fn test_build_scope_shadows_application_container() {
    let mut app = Container::new();
    app.register(Arc::new(Label("app")));
    let app = Arc::new(app);

    let shadowed = PipelineBuilder::new(Arc::clone(&app))
        .with_service(Arc::new(Label("scoped")))
        .use_middleware::<Around>()
        .build::<Trace>()
        .unwrap();
    let inherited = PipelineBuilder::new(Arc::clone(&app))
        .use_middleware::<Around>()
        .build::<Trace>()
        .unwrap();

    let mut a = Trace::default();
    let mut b = Trace::default();
    shadowed.invoke(&mut a).await.unwrap();
    inherited.invoke(&mut b).await.unwrap();

    assert_eq!(a.log[0], "scoped-in");
    assert_eq!(b.log[0], "app-in");
}

#[tokio::test]
async fn test_invoke_services_are_resolved_per_call() {
    let counter = Arc::new(AtomicU32::new(0));
    let pipeline = PipelineBuilder::default()
        .with_factory(move |_| Ticket(counter.fetch_add(1, Ordering::SeqCst)))
        .use_middleware::<Ticketed>()
        .build::<Trace>()
        .unwrap();

    let mut first = Trace::default();
    let mut second = Trace::default();
    pipeline.invoke(&mut first).await.unwrap();
    pipeline.invoke(&mut second).await.unwrap();

    assert_eq!(first.log, ["ticket-0"]);
    assert_eq!(second.log, ["ticket-1"]);
}

#[tokio::test]
async fn test_explicit_arguments_take_precedence_over_container() {
    let mut app = Container::new();
    app.register(Arc::new(Label("container")));

    let pipeline = PipelineBuilder::new(Arc::new(app))
        .use_middleware_with::<Around>(arguments![Label("explicit")])
        .build::<Trace>()
        .unwrap();

    let mut trace = Trace::default();
    pipeline.invoke(&mut trace).await.unwrap();
    assert_eq!(trace.log[0], "explicit-in");
}

// ============================================================================
// Resource context scenarios
// ============================================================================

#[tokio::test]
async fn test_echo_copies_request_body() {
    let pipeline = PipelineBuilder::default()
        .use_middleware::<Echo>()
        .build::<ResourceContext>()
        .unwrap();

    let mut ctx = ResourceContext::new(Request::post("echo:").with_body("hello"));
    pipeline.invoke(&mut ctx).await.unwrap();

    assert_eq!(ctx.response().and_then(Response::body_str), Some("hello"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_do_not_cross_talk() {
    let pipeline = PipelineBuilder::default()
        .use_middleware::<Echo>()
        .build::<ResourceContext>()
        .unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..1000 {
        let pipeline = pipeline.clone();
        tasks.spawn(async move {
            let body = format!("request-{i}");
            let mut ctx = ResourceContext::new(Request::post("echo:").with_body(body.clone()));
            pipeline.invoke(&mut ctx).await.unwrap();
            (body, ctx.take_response())
        });
    }

    let mut completed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (body, response) = joined.unwrap();
        assert_eq!(response.as_ref().and_then(Response::body_str), Some(body.as_str()));
        completed += 1;
    }
    assert_eq!(completed, 1000);
}
