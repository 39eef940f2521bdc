//! Pass-through stage that logs each context it sees.

use tracing::Level;

use crate::context::Context;
use crate::handler::BoxFuture;
use crate::middleware::Middleware;

/// Logs the context keys (and, at `TRACE`, the full context) and returns it
/// unchanged.
///
/// ```rust
/// use oprouter::Router;
/// use oprouter::middleware::trace::TraceMiddleware;
///
/// let router = Router::new().layer(TraceMiddleware::new());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TraceMiddleware {
    name: &'static str,
    level: Level,
}

impl TraceMiddleware {
    pub fn new() -> Self {
        Self { name: "trace", level: Level::DEBUG }
    }

    /// A trace stage with a custom name, to tell several apart in logs.
    pub fn named(name: &'static str) -> Self {
        Self { name, ..Self::new() }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    fn log(&self, ctx: &Context) {
        let keys: Vec<&str> = ctx.keys().collect();
        if self.level == Level::ERROR {
            tracing::error!(stage = self.name, ?keys, "context");
        } else if self.level == Level::WARN {
            tracing::warn!(stage = self.name, ?keys, "context");
        } else if self.level == Level::INFO {
            tracing::info!(stage = self.name, ?keys, "context");
        } else if self.level == Level::DEBUG {
            tracing::debug!(stage = self.name, ?keys, "context");
        } else {
            tracing::trace!(stage = self.name, ?keys, context = ?ctx, "context");
        }
    }
}

impl Default for TraceMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for TraceMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, ctx: Context) -> BoxFuture<'a, Context> {
        self.log(&ctx);
        Box::pin(async move { ctx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trace_passes_context_through() {
        let stage = TraceMiddleware::named("audit").level(Level::TRACE);
        let ctx = Context::new().with("user", "alice");

        let out = stage.process(ctx.clone()).await;

        assert_eq!(out, ctx);
        assert_eq!(stage.name(), "audit");
    }
}
