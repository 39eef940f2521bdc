//! A router that can be extended while calls are in flight.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::Handler;
use crate::middleware::Middleware;
use crate::registry::Operations;
use crate::router::{Call, Router};

/// A cloneable handle to a lock-guarded [`Router`].
///
/// Calls hold a read guard for their whole duration; registration takes the
/// write guard. A registration therefore waits for running calls to finish,
/// and a call never sees a half-updated catalogue or pipeline.
///
/// ```rust
/// use oprouter::{Router, SharedRouter};
///
/// # #[tokio::main] async fn main() {
/// let shared = SharedRouter::new(Router::new());
///
/// let writer = shared.clone();
/// tokio::spawn(async move {
///     writer.register("ping", || async { "pong" }).await;
/// })
/// .await
/// .unwrap();
///
/// assert_eq!(shared.call("ping").await.unwrap(), "pong");
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SharedRouter {
    inner: Arc<RwLock<Router>>,
}

impl SharedRouter {
    pub fn new(router: Router) -> Self {
        Self { inner: Arc::new(RwLock::new(router)) }
    }

    pub async fn register<M>(&self, name: impl Into<String>, handler: impl Handler<M>) {
        self.inner.write().await.register(name, handler);
    }

    pub async fn register_operations(&self, operations: Operations) {
        self.inner.write().await.register_operations(operations);
    }

    pub async fn add_middleware<F, Fut, B>(&self, transform: F, bound: B)
    where
        F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Context> + Send + 'static,
        B: Send + Sync + 'static,
    {
        self.inner.write().await.add_middleware(transform, bound);
    }

    pub async fn add_middleware_named<F, Fut, B>(&self, name: &'static str, transform: F, bound: B)
    where
        F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Context> + Send + 'static,
        B: Send + Sync + 'static,
    {
        self.inner.write().await.add_middleware_named(name, transform, bound);
    }

    pub async fn push_middleware(&self, middleware: impl Middleware) {
        self.inner.write().await.push_middleware(middleware);
    }

    pub async fn operation_exists(&self, name: &str) -> bool {
        self.inner.read().await.operation_exists(name)
    }

    pub async fn operation_names(&self) -> Vec<String> {
        self.inner.read().await.operation_names().map(str::to_owned).collect()
    }

    pub async fn call(&self, name: &str) -> Result<Value, DispatchError> {
        self.dispatch(name, Call::new()).await
    }

    pub async fn call_with(&self, name: &str, payload: impl Into<Value>) -> Result<Value, DispatchError> {
        self.dispatch(name, Call::new().payload(payload)).await
    }

    pub async fn call_with_context(
        &self,
        name: &str,
        context: Context,
        payload: Option<Value>,
    ) -> Result<Value, DispatchError> {
        self.dispatch(name, Call { payload, context }).await
    }

    pub async fn dispatch(&self, name: &str, call: Call) -> Result<Value, DispatchError> {
        self.inner.read().await.dispatch(name, call).await
    }

    /// Unwraps the router if this is the last handle.
    pub fn try_into_inner(self) -> Result<Router, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<Router> for SharedRouter {
    fn from(router: Router) -> Self {
        Self::new(router)
    }
}
