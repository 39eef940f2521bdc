//! The per-call context record.
//!
//! A [`Context`] is a string-keyed map threaded through one dispatch: every
//! middleware stage receives it, may change it, and hands it on; the handler
//! gets whatever the last stage produced. It lives exactly as long as one
//! call.
//!
//! A handful of keys carry meaning for the router:
//!
//! | Key | Meaning |
//! |---|---|
//! | `body` | caller-supplied echo of the payload, shape is operation-specific |
//! | `callback` | operation-specific return-channel marker, never invoked by the router |
//! | `payload` | result bag written by middleware; a truthy `payload.error` aborts dispatch |
//! | `middleware` | an explicit `false` skips the middleware pipeline for this call |
//!
//! Any other key belongs to whichever middleware or handler introduced it.

use serde::Serialize;
use serde_json::{Map, Value};

const BODY: &str = "body";
const CALLBACK: &str = "callback";
const PAYLOAD: &str = "payload";
const ERROR: &str = "error";
const MIDDLEWARE: &str = "middleware";

/// Mutable key/value record for a single dispatch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context {
    fields: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.get_mut(key)
    }

    /// Sets `key`, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Chaining form of [`insert`](Context::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    // ── Recognised fields ────────────────────────────────────────────────────

    pub fn body(&self) -> Option<&Value> {
        self.get(BODY)
    }

    pub fn set_body(&mut self, body: impl Into<Value>) {
        self.insert(BODY, body);
    }

    pub fn callback(&self) -> Option<&Value> {
        self.get(CALLBACK)
    }

    pub fn set_callback(&mut self, callback: impl Into<Value>) {
        self.insert(CALLBACK, callback);
    }

    pub fn payload(&self) -> Option<&Value> {
        self.get(PAYLOAD)
    }

    /// Mutable access to the `payload` object, creating it when absent.
    ///
    /// A `payload` that is present but not an object is replaced by an empty
    /// one.
    pub fn payload_mut(&mut self) -> &mut Map<String, Value> {
        let slot = self
            .fields
            .entry(PAYLOAD)
            .or_insert_with(|| Value::Object(Map::new()));
        object_mut(slot)
    }

    /// The failure signal: `payload.error`, if present and truthy.
    pub fn error(&self) -> Option<&Value> {
        self.payload()
            .and_then(|payload| payload.get(ERROR))
            .filter(|error| is_truthy(error))
    }

    /// Marks the context as failed by writing `payload.error`.
    ///
    /// A middleware stage that returns a rejected context stops the pipeline
    /// and the handler never runs.
    pub fn reject(&mut self, error: impl Into<Value>) {
        self.payload_mut().insert(ERROR.to_owned(), error.into());
    }

    /// `false` only when the context carries an explicit `middleware: false`.
    pub fn middleware_enabled(&self) -> bool {
        !matches!(self.get(MIDDLEWARE), Some(Value::Bool(false)))
    }

    pub fn set_middleware_enabled(&mut self, enabled: bool) {
        self.insert(MIDDLEWARE, enabled);
    }

    /// Returns the context with `middleware: false` set.
    pub fn without_middleware(mut self) -> Self {
        self.set_middleware_enabled(false);
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for Context {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<Context> for Value {
    fn from(ctx: Context) -> Self {
        Value::Object(ctx.fields)
    }
}

// Views `value` as an object, replacing anything else with an empty one.
fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            object_mut(other)
        }
    }
}

/// Loose truthiness: `null`, `false`, `0`, and `""` are falsy, everything
/// else (including empty arrays and objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
