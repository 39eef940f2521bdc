//! # oprouter
//!
//! A name-keyed operation dispatcher for Rust services.
//! Register operations by name, call them by name.
//!
//! ## The contract
//!
//! A host registers a fixed catalogue of RPC-like operations (`"add"`,
//! `"user.get"`, …) and calls them by string key with an optional payload and
//! an optional per-call [`Context`]. Before the handler runs, the context is
//! folded through a chain of [middleware](middleware) stages, each of which
//! may enrich it or reject the call outright.
//!
//! What oprouter intentionally leaves to the host:
//!
//! - **Transport** (HTTP, IPC, queues): the router only sequences local calls
//! - **Wire format**: payloads are in-process [`serde_json::Value`]s
//! - **Auth policy**: write it as middleware
//! - **Retries and timeouts**: wrap the call future yourself
//!
//! ## Quick start
//!
//! ```rust
//! use oprouter::{Context, Router};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new()
//!         .on_operation("add", add)
//!         .on_operation("whoami", whoami)
//!         .set_middleware(authenticate, "alice");
//!
//!     assert_eq!(router.call_with("add", json!([1, 3])).await.unwrap(), json!(4));
//!     assert_eq!(router.call("whoami").await.unwrap(), json!("alice"));
//!
//!     // Router failures are ordinary errors with a legacy `{ "error": … }` rendering.
//!     let err = router.call("missing").await.unwrap_err();
//!     assert_eq!(err.sentinel(), json!({ "error": "Operation not found" }));
//! }
//!
//! async fn add(p: (i64, i64)) -> i64 {
//!     p.0 + p.1
//! }
//!
//! async fn whoami(ctx: Context) -> serde_json::Value {
//!     ctx.get("user").cloned().unwrap_or_default()
//! }
//!
//! async fn authenticate(mut ctx: Context, user: std::sync::Arc<&'static str>) -> Context {
//!     ctx.insert("user", *user);
//!     ctx
//! }
//! ```

mod config;
mod context;
mod error;
mod handler;
mod operation;
mod output;
mod registry;
mod router;
mod shared;

pub mod middleware;

pub use config::{LOG_ENV, RouterConfig};
pub use context::{Context, is_truthy};
pub use error::{BoxError, DispatchError, ErrorKind};
pub use handler::{BoxFuture, Handler};
pub use middleware::{FnMiddleware, Middleware, Pipeline, Rejection};
pub use operation::{Operation, OperationHandler};
pub use output::{IntoOutput, Json};
pub use registry::{Operations, Registry};
pub use router::{Call, Router};
pub use shared::SharedRouter;
