//! Middleware layer.
//!
//! Middleware is the right place for cross-cutting concerns: authentication,
//! structured tracing, input validation, enrichment of the context. Each stage
//! receives the context produced by the previous one and returns the context
//! for the next, so the pipeline is a left fold over the registered stages:
//!
//! ```text
//! ctx₀ ─▶ stage 1 ─▶ ctx₁ ─▶ stage 2 ─▶ ctx₂ ─▶ … ─▶ handler
//!                     │                  │
//!                     └─ payload.error? ─┴─▶ stop, handler never runs
//! ```
//!
//! A stage aborts dispatch by returning a context whose `payload.error` is
//! truthy (see [`Context::reject`]). There is no priority or reordering:
//! stages run in the order they were added.
//!
//! Built-in middleware:
//! - [`trace`]: logs every context passing through, changes nothing

pub mod trace;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::handler::BoxFuture;

/// A pipeline stage.
///
/// Closures registered through
/// [`Router::set_middleware`](crate::Router::set_middleware) are adapted by
/// [`FnMiddleware`]; implement the trait directly for stages with their own
/// state.
///
/// ```rust
/// use oprouter::{BoxFuture, Context, Middleware};
///
/// struct RequireUser;
///
/// impl Middleware for RequireUser {
///     fn name(&self) -> &'static str { "require-user" }
///
///     fn process<'a>(&'a self, mut ctx: Context) -> BoxFuture<'a, Context> {
///         Box::pin(async move {
///             if !ctx.contains_key("user") {
///                 ctx.reject("user required");
///             }
///             ctx
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    /// Stage name, used in logs and in [`Rejection`]s.
    fn name(&self) -> &'static str;

    /// Transforms the context. Reject with [`Context::reject`] to stop the
    /// pipeline.
    fn process<'a>(&'a self, ctx: Context) -> BoxFuture<'a, Context>;
}

/// Adapts a `Fn(Context, Arc<B>) -> Future<Output = Context>` into a
/// [`Middleware`].
///
/// `B` is the stage's bound context: fixed at registration and handed to
/// every invocation as the same shared, read-only value.
pub struct FnMiddleware<F, B> {
    name: &'static str,
    transform: F,
    bound: Arc<B>,
}

impl<F, B> FnMiddleware<F, B> {
    pub fn new(transform: F, bound: B) -> Self {
        Self::named("middleware", transform, bound)
    }

    pub fn named(name: &'static str, transform: F, bound: B) -> Self {
        Self { name, transform, bound: Arc::new(bound) }
    }

    pub fn bound(&self) -> &B {
        &self.bound
    }
}

impl<F, Fut, B> Middleware for FnMiddleware<F, B>
where
    F: Fn(Context, Arc<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Context> + Send + 'static,
    B: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, ctx: Context) -> BoxFuture<'a, Context> {
        Box::pin((self.transform)(ctx, Arc::clone(&self.bound)))
    }
}

/// A stage asked the pipeline to stop.
#[derive(Clone, Debug, PartialEq)]
pub struct Rejection {
    /// Name of the rejecting stage.
    pub stage: &'static str,
    /// Position of the rejecting stage, zero-based.
    pub index: usize,
    /// The stage's `payload.error`, verbatim.
    pub error: Value,
}

/// Ordered, append-only list of middleware stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage after every existing one.
    pub fn append(&mut self, middleware: impl Middleware) {
        self.stages.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Folds `ctx` through every stage in order.
    ///
    /// Each stage runs only after the previous one resolved. The first stage
    /// whose result carries a truthy `payload.error` ends the fold; later
    /// stages do not run.
    pub async fn run(&self, ctx: Context) -> Result<Context, Rejection> {
        self.fold(ctx, true).await
    }

    /// [`run`](Self::run), emitting the per-stage trace event only when
    /// `trace` is set.
    pub(crate) async fn fold(&self, mut ctx: Context, trace: bool) -> Result<Context, Rejection> {
        for (index, stage) in self.stages.iter().enumerate() {
            if trace {
                tracing::trace!(stage = stage.name(), index, "running middleware");
            }
            ctx = stage.process(ctx).await;
            if let Some(error) = ctx.error() {
                return Err(Rejection { stage: stage.name(), index, error: error.clone() });
            }
        }
        Ok(ctx)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> impl Middleware {
        FnMiddleware::named(tag, move |mut ctx: Context, _bound: Arc<()>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(tag);
                let mut seen = ctx.get("seen").and_then(Value::as_array).cloned().unwrap_or_default();
                seen.push(json!(tag));
                ctx.insert("seen", seen);
                ctx
            }
        }, ())
    }

    #[tokio::test]
    async fn test_stages_fold_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.append(tagging("first", Arc::clone(&log)));
        pipeline.append(tagging("second", Arc::clone(&log)));

        let ctx = pipeline.run(Context::new()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
        assert_eq!(ctx.get("seen"), Some(&json!(["first", "second"])));
        assert_eq!(pipeline.stage_names(), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_rejection_stops_the_fold() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.append(FnMiddleware::named(
            "auth",
            |mut ctx: Context, _: Arc<()>| async move {
                ctx.reject("denied");
                ctx
            },
            (),
        ));
        pipeline.append(tagging("after", Arc::clone(&log)));

        let rejection = pipeline.run(Context::new()).await.unwrap_err();

        assert_eq!(rejection, Rejection { stage: "auth", index: 0, error: json!("denied") });
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bound_context_is_shared_and_unchanged() {
        #[derive(Debug, PartialEq)]
        struct Secret(&'static str);

        let stage = FnMiddleware::new(
            |mut ctx: Context, secret: Arc<Secret>| async move {
                ctx.insert("secret", secret.0);
                ctx
            },
            Secret("s3cr3t"),
        );

        let first = stage.process(Context::new()).await;
        let second = stage.process(Context::new()).await;

        assert_eq!(first.get("secret"), Some(&json!("s3cr3t")));
        assert_eq!(second.get("secret"), Some(&json!("s3cr3t")));
        assert_eq!(stage.bound(), &Secret("s3cr3t"));
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_context_untouched() {
        let ctx = Context::new().with("k", 1);
        assert_eq!(Pipeline::new().run(ctx.clone()).await.unwrap(), ctx);
    }
}
