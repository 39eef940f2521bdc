//! Typed operation contracts.
//!
//! The router itself is dynamic: names are strings, payloads and results are
//! JSON values. An [`Operation`] pins one name to a concrete input and output
//! type so that registration and calls can be written against Rust types:
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use oprouter::{Context, Operation, Router};
//!
//! struct Add;
//!
//! impl Operation for Add {
//!     const NAME: &'static str = "add";
//!     type Input = (i64, i64);
//!     type Output = i64;
//! }
//!
//! # #[tokio::main] async fn main() {
//! let router = Router::new()
//!     .operation::<Add>(|(a, b): (i64, i64), _ctx: Context| async move {
//!         Ok::<_, Infallible>(a + b)
//!     });
//!
//! assert_eq!(router.call_operation::<Add>((1, 3)).await.unwrap(), 4);
//! # }
//! ```
//!
//! The contract is checked at the boundary: a typed call encodes its input,
//! dispatches by name, and decodes the result into `Output`. If something else
//! was registered under the same name, the mismatch surfaces as
//! [`DispatchError::InvalidPayload`](crate::DispatchError::InvalidPayload) or
//! [`DispatchError::InvalidOutput`](crate::DispatchError::InvalidOutput).

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::BoxError;
use crate::handler::{BoxedHandler, Handler, Input};

/// One entry of the operation catalogue: a name and its input/output shapes.
pub trait Operation {
    const NAME: &'static str;
    type Input: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;
}

/// A handler that fulfils the contract of operation `O`:
/// `Fn(O::Input, Context) -> impl Future<Output = Result<O::Output, E>>`.
///
/// Satisfied automatically; the router stores it like any other handler.
pub trait OperationHandler<O: Operation>: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

impl<O, F, Fut, E> OperationHandler<O> for F
where
    O: Operation,
    F: Fn(O::Input, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O::Output, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Handler::<(Input, O::Input, Context)>::into_boxed_handler(self)
    }
}
