//! Minimal oprouter example: three operations, one logging stage.
//!
//! Run with:
//!   RUST_LOG=debug OPROUTER_LOG=debug cargo run --example basic

use oprouter::middleware::trace::TraceMiddleware;
use oprouter::{DispatchError, Operations, Router, RouterConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    first_name: String,
    last_name: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let operations = Operations::new()
        .operation("example", example)
        .operation("test", test)
        .operation("add", add);

    let router = Router::with_config(RouterConfig::from_env().name("demo"))
        .use_operations(operations)
        .layer(TraceMiddleware::new());

    router.call("example").await.expect("example never fails");

    print(router.call_with("add", json!([1, 3])).await);
    print(router.call_with("test", json!({ "firstName": "123", "lastName": "532" })).await);
    print(router.call_with("test", json!({ "firstName": "123", "lastName": "123" })).await);
    print(router.call("test").await);
}

// Router failures print in the same `{ "error": … }` shape handlers use.
fn print(result: Result<Value, DispatchError>) {
    match result {
        Ok(value) => println!("{value}"),
        Err(err) => println!("{}", err.sentinel()),
    }
}

async fn example() {
    println!("this example fn");
}

// A handler may answer with its own error-shaped value; the router passes it
// through as a normal result.
async fn test(person: Person) -> Value {
    if person.first_name == person.last_name {
        return json!({ "error": "Why firstName=lastName?" });
    }
    json!(person)
}

async fn add(payload: (i64, i64)) -> i64 {
    payload.0 + payload.1
}
