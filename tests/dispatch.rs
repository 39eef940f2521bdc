//! End-to-end dispatch behaviour through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use oprouter::{
    BoxError, Call, Context, DispatchError, ErrorKind, Json, Operation, Operations, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Person {
    first_name: String,
    last_name: String,
}

async fn test_op(person: Person) -> Value {
    if person.first_name == person.last_name {
        return json!({ "error": "Why firstName=lastName?" });
    }
    json!(person)
}

async fn add(payload: (i64, i64)) -> i64 {
    payload.0 + payload.1
}

fn demo_router() -> Router {
    Router::from_operations(
        Operations::new()
            .operation("example", || async {})
            .operation("test", test_op)
            .operation("add", add),
    )
}

/// Counts invocations and optionally rejects with `error`.
fn stage(name: &'static str, hits: Arc<AtomicUsize>, error: Option<&'static str>) -> impl oprouter::Middleware {
    oprouter::FnMiddleware::named(
        name,
        move |mut ctx: Context, _: Arc<()>| {
            hits.fetch_add(1, Ordering::SeqCst);
            async move {
                if let Some(error) = error {
                    ctx.reject(error);
                }
                ctx.insert(name, true);
                ctx
            }
        },
        (),
    )
}

#[tokio::test]
async fn add_resolves_to_sum() {
    let router = demo_router();
    assert_eq!(router.call_with("add", json!([1, 3])).await.unwrap(), json!(4));
}

#[tokio::test]
async fn test_operation_echoes_distinct_names() {
    let router = demo_router();
    let out = router
        .call_with("test", json!({ "firstName": "123", "lastName": "532" }))
        .await
        .unwrap();

    assert_eq!(out, json!({ "firstName": "123", "lastName": "532" }));
}

#[tokio::test]
async fn handler_error_shape_is_a_normal_result() {
    let router = demo_router();
    let out = router
        .call_with("test", json!({ "firstName": "123", "lastName": "123" }))
        .await
        .unwrap();

    assert_eq!(out, json!({ "error": "Why firstName=lastName?" }));
}

#[tokio::test]
async fn test_operation_without_payload_is_rejected() {
    let router = demo_router();
    let err = router.call("test").await.unwrap_err();

    assert!(matches!(err, DispatchError::PayloadRequired { ref name } if name == "test"));
    assert_eq!(err.sentinel(), json!({ "error": "payload must be provided" }));
}

#[tokio::test]
async fn zero_arity_operation_needs_no_payload() {
    let router = demo_router();
    assert_eq!(router.call("example").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn registered_names_exist() {
    let router = demo_router();

    for name in ["example", "test", "add"] {
        assert!(router.operation_exists(name), "{name} should be registered");
    }
    assert_eq!(router.operation_names().count(), 3);
}

#[tokio::test]
async fn second_registration_replaces_first() {
    let router = Router::new()
        .on_operation("version", || async { 1 })
        .on_operation("version", || async { 2 });

    for _ in 0..3 {
        assert_eq!(router.call("version").await.unwrap(), json!(2));
    }
}

#[tokio::test]
async fn missing_operation_runs_no_middleware() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = demo_router().layer(stage("m1", Arc::clone(&hits), None));

    let err = router.call("missing-name").await.unwrap_err();

    assert_eq!(err.sentinel(), json!({ "error": "Operation not found" }));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn first_rejection_stops_pipeline_and_handler() {
    let m1 = Arc::new(AtomicUsize::new(0));
    let m2 = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));
    let handled_in = Arc::clone(&handled);

    let router = Router::new()
        .layer(stage("m1", Arc::clone(&m1), Some("M1 says no")))
        .layer(stage("m2", Arc::clone(&m2), None))
        .on_operation("op", move || {
            handled_in.fetch_add(1, Ordering::SeqCst);
            async {}
        });

    let err = router.call("op").await.unwrap_err();

    assert!(matches!(err, DispatchError::MiddlewareRejected { stage: "m1", .. }));
    assert_eq!(err.sentinel(), json!({ "error": "M1 says no" }));
    assert_eq!(m1.load(Ordering::SeqCst), 1);
    assert_eq!(m2.load(Ordering::SeqCst), 0);
    assert_eq!(handled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn middleware_false_skips_every_stage() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .layer(stage("m1", Arc::clone(&hits), None))
        .layer(stage("m2", Arc::clone(&hits), Some("would reject")))
        .on_operation("keys", |ctx: Context| async move {
            Json(ctx.keys().map(str::to_owned).collect::<Vec<_>>())
        });

    let ctx = Context::new().without_middleware();
    let out = router.call_with_context("keys", ctx, None).await;

    // Neither stage ran: no `m1` key was added and the rejection never happened.
    assert_eq!(out.unwrap(), json!(["middleware"]));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_receives_middleware_mutated_context() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .layer(stage("m1", Arc::clone(&hits), None))
        .layer(stage("m2", Arc::clone(&hits), None))
        .on_operation("flags", |input: Value, ctx: Context| async move {
            json!({ "input": input, "m1": ctx.get("m1"), "m2": ctx.get("m2") })
        });

    let out = router
        .dispatch("flags", Call::new().payload("x").context(Context::new().with("trace", "abc")))
        .await
        .unwrap();

    assert_eq!(out, json!({ "input": "x", "m1": true, "m2": true }));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn handler_errors_propagate_untranslated() {
    #[derive(Debug, thiserror::Error)]
    #[error("ledger is locked")]
    struct Locked;

    let router = Router::new().on_operation("debit", |_amount: u64| async { Err::<(), _>(Locked) });

    let err = router.call_with("debit", 10).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Handler);
    assert!(!err.is_router_failure());
    assert_eq!(err.to_string(), "ledger is locked");
    assert!(err.handler_error::<Locked>().is_some());
}

#[tokio::test]
async fn payload_of_wrong_shape_is_invalid() {
    let router = demo_router();
    let err = router.call_with("add", json!({ "a": 1 })).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
}

struct Greet;

impl Operation for Greet {
    const NAME: &'static str = "greet";
    type Input = Person;
    type Output = String;
}

#[tokio::test]
async fn typed_operation_round_trip() {
    let router = Router::new().operation::<Greet>(|p: Person, ctx: Context| async move {
        let greeting = ctx.get("greeting").and_then(Value::as_str).unwrap_or("hello").to_owned();
        Ok::<_, BoxError>(format!("{greeting}, {} {}", p.first_name, p.last_name))
    });

    let person = Person { first_name: "Ada".into(), last_name: "Lovelace".into() };
    let out = router.call_operation::<Greet>(person).await.unwrap();
    assert_eq!(out, "hello, Ada Lovelace");

    let ctx = Context::new().with("greeting", "hi");
    let person = Person { first_name: "Alan".into(), last_name: "Turing".into() };
    let out = router.call_operation_with_context::<Greet>(ctx, person).await.unwrap();
    assert_eq!(out, "hi, Alan Turing");
}

#[tokio::test]
async fn typed_call_detects_contract_mismatch() {
    // Something untyped took over the contract's name.
    let router = Router::new().on_operation("greet", |_p: Value| async { 42 });

    let person = Person { first_name: "Ada".into(), last_name: "Lovelace".into() };
    let err = router.call_operation::<Greet>(person).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidOutput);
}

#[tokio::test]
async fn router_is_shareable_across_tasks() {
    let router = Arc::new(demo_router());

    let tasks: Vec<_> = (0..8i64)
        .map(|i| {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.call_with("add", json!([i, i])).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), json!(2 * i as i64));
    }
}
