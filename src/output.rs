//! Handler return values and the [`IntoOutput`] conversion trait.
//!
//! Handlers return whatever is natural for them; the router stores every
//! result as a [`serde_json::Value`]. `IntoOutput` is the bridge.

use serde::Serialize;
use serde_json::Value;

use crate::error::{BoxError, DispatchError};

/// Conversion of a handler's return value into the dispatch result.
///
/// Implemented for `Result<T, E>` with a serializable `T`, for
/// [`Value`], `()`, strings, booleans and numbers, and for [`Json<T>`].
/// Implement it on your own types to return them directly from handlers.
///
/// # Example
///
/// ```rust
/// use oprouter::{DispatchError, IntoOutput};
/// use serde_json::{Value, json};
///
/// struct Sum(i64);
///
/// impl IntoOutput for Sum {
///     fn into_output(self) -> Result<Value, DispatchError> {
///         Ok(json!({ "sum": self.0 }))
///     }
/// }
/// ```
pub trait IntoOutput {
    fn into_output(self) -> Result<Value, DispatchError>;
}

/// Wraps any serializable value so it can be returned from a handler.
///
/// ```rust
/// use oprouter::Json;
///
/// #[derive(serde::Serialize)]
/// struct User { id: u32 }
///
/// async fn get_user() -> Json<User> {
///     Json(User { id: 1 })
/// }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoOutput for Json<T> {
    fn into_output(self) -> Result<Value, DispatchError> {
        serde_json::to_value(self.0).map_err(DispatchError::InvalidOutput)
    }
}

impl<T, E> IntoOutput for Result<T, E>
where
    T: Serialize,
    E: Into<BoxError>,
{
    fn into_output(self) -> Result<Value, DispatchError> {
        match self {
            Ok(value) => Json(value).into_output(),
            Err(err) => Err(DispatchError::Handler(err.into())),
        }
    }
}

impl IntoOutput for Value {
    fn into_output(self) -> Result<Value, DispatchError> {
        Ok(self)
    }
}

impl IntoOutput for () {
    fn into_output(self) -> Result<Value, DispatchError> {
        Ok(Value::Null)
    }
}

impl IntoOutput for &'static str {
    fn into_output(self) -> Result<Value, DispatchError> {
        Ok(Value::from(self))
    }
}

macro_rules! into_output_via_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOutput for $ty {
                fn into_output(self) -> Result<Value, DispatchError> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

into_output_via_value!(String, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
