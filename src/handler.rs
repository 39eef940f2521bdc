//! Handler trait and type erasure.
//!
//! # How operation handlers are stored
//!
//! The registry holds handlers of *different* types in a single
//! `HashMap<String, BoxedHandler>`. Every handler is wrapped in a small
//! adapter that implements [`ErasedHandler`]: it decodes the JSON payload into
//! the handler's input type, calls the function, and converts whatever comes
//! back through [`IntoOutput`].
//!
//! ```text
//! async fn add(p: (i64, i64)) -> i64 { … }         ← user writes this
//!        ↓ router.on_operation("add", add)
//! add.into_boxed_handler()                         ← Handler blanket impl
//!        ↓
//! Arc::new(WithInput(add))                         ← adapter, records arity
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(Some(json!([1, 3])), ctx)           ← one vtable dispatch
//!        ↓
//! Box::pin(async { add((1, 3)).await.into_output() })
//! ```
//!
//! # Accepted shapes
//!
//! | Signature | Requires a payload |
//! |---|---|
//! | `Fn() -> Fut` | no |
//! | `Fn(Context) -> Fut` | no |
//! | `Fn(T) -> Fut` | yes |
//! | `Fn(T, Context) -> Fut` | yes |
//!
//! `T` is any `DeserializeOwned` type and `Fut::Output` any [`IntoOutput`].
//! The payload requirement is decided by the signature alone: a handler taking
//! `Option<T>` still declares an input and still needs one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::Context;
use crate::error::DispatchError;
use crate::output::IntoOutput;

/// A heap-allocated, type-erased future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What an erased handler call resolves to.
pub type HandlerFuture = BoxFuture<'static, Result<Value, DispatchError>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` because it appears in the return type of the public
/// [`Handler::into_boxed_handler`]. Callers never need to name it.
#[doc(hidden)]
pub trait ErasedHandler {
    /// Whether the wrapped function declares an input parameter.
    fn requires_input(&self) -> bool;

    /// Runs the handler. A missing `input` for a handler that requires one
    /// resolves to [`DispatchError::PayloadRequired`] with an empty `name`;
    /// the router checks presence itself and reports the operation name.
    fn call(&self, input: Option<Value>, ctx: Context) -> HandlerFuture;
}

/// A type-erased handler, shared between the registry and in-flight calls.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid operation handler.
///
/// You never implement this yourself; it is satisfied by any function with
/// one of the shapes listed in the [module docs](self). The `M` parameter is
/// a marker that keeps the four blanket impls apart and is always inferred.
pub trait Handler<M>: private::Sealed<M> + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed<M> {}
}

/// Marker for handlers that declare no input.
#[doc(hidden)]
pub struct NoInput;

/// Marker for handlers that declare an input.
#[doc(hidden)]
pub struct Input;

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed<(NoInput,)> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
}

impl<F, Fut, R> Handler<(NoInput,)> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Bare(self))
    }
}

impl<F, Fut, R> private::Sealed<(NoInput, Context)> for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
}

impl<F, Fut, R> Handler<(NoInput, Context)> for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(ContextOnly(self))
    }
}

impl<F, Fut, R, T> private::Sealed<(Input, T)> for F
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
    T: DeserializeOwned + Send + 'static,
{
}

impl<F, Fut, R, T> Handler<(Input, T)> for F
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
    T: DeserializeOwned + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(WithInput::<_, T>::new(move |input: T, _ctx: Context| self(input)))
    }
}

impl<F, Fut, R, T> private::Sealed<(Input, T, Context)> for F
where
    F: Fn(T, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
    T: DeserializeOwned + Send + 'static,
{
}

impl<F, Fut, R, T> Handler<(Input, T, Context)> for F
where
    F: Fn(T, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
    T: DeserializeOwned + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(WithInput::<_, T>::new(self))
    }
}

// ── Concrete adapters ─────────────────────────────────────────────────────────

struct Bare<F>(F);

impl<F, Fut, R> ErasedHandler for Bare<F>
where
    F: Fn() -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
    fn requires_input(&self) -> bool {
        false
    }

    fn call(&self, _input: Option<Value>, _ctx: Context) -> HandlerFuture {
        let fut = (self.0)();
        Box::pin(async move { fut.await.into_output() })
    }
}

struct ContextOnly<F>(F);

impl<F, Fut, R> ErasedHandler for ContextOnly<F>
where
    F: Fn(Context) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
{
    fn requires_input(&self) -> bool {
        false
    }

    fn call(&self, _input: Option<Value>, ctx: Context) -> HandlerFuture {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_output() })
    }
}

/// Decodes the payload into `T` before calling the wrapped function.
struct WithInput<F, T> {
    handler: F,
    _input: std::marker::PhantomData<fn(T)>,
}

impl<F, T> WithInput<F, T> {
    fn new(handler: F) -> Self {
        Self { handler, _input: std::marker::PhantomData }
    }
}

impl<F, Fut, R, T> ErasedHandler for WithInput<F, T>
where
    F: Fn(T, Context) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutput,
    T: DeserializeOwned,
{
    fn requires_input(&self) -> bool {
        true
    }

    fn call(&self, input: Option<Value>, ctx: Context) -> HandlerFuture {
        // The router checks presence first; an absent payload here means the
        // handler was called directly.
        let Some(input) = input else {
            return Box::pin(async {
                Err::<Value, _>(DispatchError::PayloadRequired { name: String::new() })
            });
        };
        let parsed: T = match serde_json::from_value(input) {
            Ok(v) => v,
            Err(e) => return Box::pin(async move { Err::<Value, _>(DispatchError::InvalidPayload(e)) }),
        };

        let fut = (self.handler)(parsed, ctx);
        Box::pin(async move { fut.await.into_output() })
    }
}
