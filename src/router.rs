//! The operation router.
//!
//! Composes the [`Registry`] and the [`Pipeline`] and owns the dispatch
//! protocol:
//!
//! 1. look the operation up by name; unknown names fail with
//!    [`DispatchError::OperationNotFound`] before any middleware runs;
//! 2. a handler that declares an input but got no payload fails with
//!    [`DispatchError::PayloadRequired`], again before any middleware runs;
//! 3. unless the context says `middleware: false`, fold the context through
//!    the pipeline; a rejection fails with
//!    [`DispatchError::MiddlewareRejected`] and the handler is skipped;
//! 4. call the handler with the payload and the folded context and return
//!    its result.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, Level, Span};

use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::Handler;
use crate::middleware::{FnMiddleware, Middleware, Pipeline, Rejection};
use crate::operation::{Operation, OperationHandler};
use crate::registry::{Operations, Registry};

/// Arguments of one dispatch.
///
/// A payload is either present or not; `Some(Value::Null)` is a present
/// payload that happens to be null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    pub payload: Option<Value>,
    pub context: Context,
}

impl Call {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

/// The operation router.
///
/// Build it once at startup, then share it (`Arc<Router>`) between tasks.
/// Registration needs `&mut self` or ownership, so the catalogue cannot change
/// under an in-flight call; use [`SharedRouter`](crate::SharedRouter) when
/// registration has to happen while calls are running.
///
/// ```rust
/// use oprouter::Router;
/// use serde_json::json;
///
/// # #[tokio::main] async fn main() {
/// let router = Router::new()
///     .on_operation("add", |p: (i64, i64)| async move { p.0 + p.1 });
///
/// assert_eq!(router.call_with("add", json!([1, 3])).await.unwrap(), json!(4));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Router {
    registry: Registry,
    pipeline: Pipeline,
    config: RouterConfig,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// A router pre-loaded with `operations`.
    pub fn from_operations(operations: Operations) -> Self {
        Self::new().use_operations(operations)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    // ── Registration (builder) ───────────────────────────────────────────────

    /// Registers every operation in the record. Entries without a handler
    /// are skipped.
    pub fn use_operations(mut self, operations: Operations) -> Self {
        self.register_operations(operations);
        self
    }

    /// Registers `handler` under `name`, replacing any earlier handler.
    pub fn on_operation<M>(mut self, name: impl Into<String>, handler: impl Handler<M>) -> Self {
        self.register(name, handler);
        self
    }

    /// Registers a handler under the contract's name.
    pub fn operation<O: Operation>(mut self, handler: impl OperationHandler<O>) -> Self {
        self.register_operation::<O>(handler);
        self
    }

    /// Appends a closure stage. `bound` is the stage's fixed auxiliary
    /// context, passed to every invocation.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use oprouter::{Context, Router};
    ///
    /// struct ApiKey(&'static str);
    ///
    /// let router = Router::new().set_middleware(
    ///     |mut ctx: Context, key: Arc<ApiKey>| async move {
    ///         if ctx.get("key").and_then(|v| v.as_str()) != Some(key.0) {
    ///             ctx.reject("unauthorized");
    ///         }
    ///         ctx
    ///     },
    ///     ApiKey("secret"),
    /// );
    /// ```
    pub fn set_middleware<F, Fut, B>(mut self, transform: F, bound: B) -> Self
    where
        F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Context> + Send + 'static,
        B: Send + Sync + 'static,
    {
        self.add_middleware(transform, bound);
        self
    }

    /// [`set_middleware`](Self::set_middleware) with a stage name, reported in
    /// logs, [`middleware_names`](Self::middleware_names) and
    /// [`DispatchError::MiddlewareRejected`].
    pub fn set_middleware_named<F, Fut, B>(mut self, name: &'static str, transform: F, bound: B) -> Self
    where
        F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Context> + Send + 'static,
        B: Send + Sync + 'static,
    {
        self.add_middleware_named(name, transform, bound);
        self
    }

    /// Appends any [`Middleware`] value.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.push_middleware(middleware);
        self
    }

    // ── Registration (in place) ──────────────────────────────────────────────

    pub fn register_operations(&mut self, operations: Operations) {
        for (name, handler) in operations.into_present() {
            let replaced = self.registry.insert_boxed(name.clone(), handler);
            self.log_registration(&name, replaced);
        }
    }

    pub fn register<M>(&mut self, name: impl Into<String>, handler: impl Handler<M>) {
        let name = name.into();
        let replaced = self.registry.insert_boxed(name.clone(), handler.into_boxed_handler());
        self.log_registration(&name, replaced);
    }

    pub fn register_operation<O: Operation>(&mut self, handler: impl OperationHandler<O>) {
        let replaced = self
            .registry
            .insert_boxed(O::NAME.to_owned(), handler.into_boxed_handler());
        self.log_registration(O::NAME, replaced);
    }

    pub fn add_middleware<F, Fut, B>(&mut self, transform: F, bound: B)
    where
        F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Context> + Send + 'static,
        B: Send + Sync + 'static,
    {
        self.push_middleware(FnMiddleware::new(transform, bound));
    }

    pub fn add_middleware_named<F, Fut, B>(&mut self, name: &'static str, transform: F, bound: B)
    where
        F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Context> + Send + 'static,
        B: Send + Sync + 'static,
    {
        self.push_middleware(FnMiddleware::named(name, transform, bound));
    }

    pub fn push_middleware(&mut self, middleware: impl Middleware) {
        if self.config.enabled(Level::DEBUG) {
            tracing::debug!(
                router = %self.config.name,
                stage = middleware.name(),
                position = self.pipeline.len(),
                "middleware added",
            );
        }
        self.pipeline.append(middleware);
    }

    // ── Introspection ────────────────────────────────────────────────────────

    pub fn operation_exists(&self, name: &str) -> bool {
        self.registry.exists(name)
    }

    /// Registered operation names. Order carries no meaning.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Calls `name` with no payload and an empty context.
    pub async fn call(&self, name: &str) -> Result<Value, DispatchError> {
        self.dispatch(name, Call::new()).await
    }

    /// Calls `name` with `payload` and an empty context.
    pub async fn call_with(&self, name: &str, payload: impl Into<Value>) -> Result<Value, DispatchError> {
        self.dispatch(name, Call::new().payload(payload)).await
    }

    /// Calls `name` with the given context and optional payload.
    pub async fn call_with_context(
        &self,
        name: &str,
        context: Context,
        payload: Option<Value>,
    ) -> Result<Value, DispatchError> {
        self.dispatch(name, Call { payload, context }).await
    }

    /// Calls a typed operation with an empty context.
    pub async fn call_operation<O: Operation>(&self, input: O::Input) -> Result<O::Output, DispatchError> {
        self.call_operation_with_context::<O>(Context::new(), input).await
    }

    /// Calls a typed operation with the given context.
    pub async fn call_operation_with_context<O: Operation>(
        &self,
        context: Context,
        input: O::Input,
    ) -> Result<O::Output, DispatchError> {
        let payload = serde_json::to_value(input).map_err(DispatchError::InvalidPayload)?;
        let output = self.call_with_context(O::NAME, context, Some(payload)).await?;
        serde_json::from_value(output).map_err(DispatchError::InvalidOutput)
    }

    /// Resolves and runs one call. Every other `call*` method ends up here.
    pub async fn dispatch(&self, name: &str, call: Call) -> Result<Value, DispatchError> {
        let span = if self.config.enabled(Level::DEBUG) {
            tracing::debug_span!("dispatch", router = %self.config.name, operation = name)
        } else {
            Span::none()
        };
        self.dispatch_inner(name, call).instrument(span).await
    }

    async fn dispatch_inner(&self, name: &str, call: Call) -> Result<Value, DispatchError> {
        let Call { payload, context } = call;

        let Some(handler) = self.registry.get(name) else {
            if self.config.enabled(Level::WARN) {
                tracing::warn!(operation = name, "operation not found");
            }
            return Err(DispatchError::OperationNotFound { name: name.to_owned() });
        };

        if handler.requires_input() && payload.is_none() {
            if self.config.enabled(Level::WARN) {
                tracing::warn!(operation = name, "payload required but none supplied");
            }
            return Err(DispatchError::PayloadRequired { name: name.to_owned() });
        }

        let run_middleware = context.middleware_enabled();
        if self.config.enabled(Level::DEBUG) {
            tracing::debug!(
                operation = name,
                has_payload = payload.is_some(),
                middleware = run_middleware,
                stages = self.pipeline.len(),
                "dispatching",
            );
        }

        let context = if run_middleware {
            match self.pipeline.fold(context, self.config.enabled(Level::TRACE)).await {
                Ok(context) => context,
                Err(Rejection { stage, index, error }) => {
                    if self.config.enabled(Level::WARN) {
                        tracing::warn!(operation = name, stage, index, %error, "middleware rejected call");
                    }
                    return Err(DispatchError::MiddlewareRejected { stage, error });
                }
            }
        } else {
            context
        };

        handler.call(payload, context).await
    }

    fn log_registration(&self, name: &str, replaced: bool) {
        if self.config.enabled(Level::DEBUG) {
            tracing::debug!(router = %self.config.name, operation = name, replaced, "operation registered");
        }
    }
}
