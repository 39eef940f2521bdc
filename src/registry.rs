//! Operation registry.
//!
//! A plain name → handler map. Registering a name twice replaces the first
//! handler; nothing is ever removed. Lookup hands out a cloned `Arc` so an
//! in-flight call keeps its handler alive even if the name is re-registered
//! behind it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};

/// Name-keyed storage for operation handlers.
#[derive(Default)]
pub struct Registry {
    operations: HashMap<String, BoxedHandler>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the handler for `name`. Returns `true` if an
    /// earlier handler was replaced.
    pub fn register<M>(&mut self, name: impl Into<String>, handler: impl Handler<M>) -> bool {
        self.insert_boxed(name.into(), handler.into_boxed_handler())
    }

    pub(crate) fn insert_boxed(&mut self, name: String, handler: BoxedHandler) -> bool {
        self.operations.insert(name, handler).is_some()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Registered names. Order carries no meaning.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<BoxedHandler> {
        self.operations.get(name).map(Arc::clone)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// ── Operations ────────────────────────────────────────────────────────────────

/// A bulk record of operations, applied in one go with
/// [`Router::use_operations`](crate::Router::use_operations).
///
/// Entries added through [`maybe_operation`](Operations::maybe_operation)
/// with `None` are kept in the record but skipped when it is applied, so a
/// catalogue can list optional operations without branching at the call site.
///
/// ```rust
/// use oprouter::{Operations, Router};
///
/// async fn add(p: (i64, i64)) -> i64 { p.0 + p.1 }
/// async fn ping() -> &'static str { "pong" }
///
/// let debug_enabled = false;
/// let ops = Operations::new()
///     .operation("add", add)
///     .maybe_operation("ping", debug_enabled.then_some(ping));
///
/// let router = Router::from_operations(ops);
/// assert!(router.operation_exists("add"));
/// assert!(!router.operation_exists("ping"));
/// ```
#[derive(Default)]
pub struct Operations {
    entries: Vec<(String, Option<BoxedHandler>)>,
}

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation<M>(mut self, name: impl Into<String>, handler: impl Handler<M>) -> Self {
        self.entries.push((name.into(), Some(handler.into_boxed_handler())));
        self
    }

    pub fn maybe_operation<M, H: Handler<M>>(mut self, name: impl Into<String>, handler: Option<H>) -> Self {
        self.entries.push((name.into(), handler.map(|h| h.into_boxed_handler())));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with a handler, in insertion order. Later entries win when the
    /// same name appears twice.
    pub(crate) fn into_present(self) -> impl Iterator<Item = (String, BoxedHandler)> {
        self.entries
            .into_iter()
            .filter_map(|(name, handler)| handler.map(|h| (name, h)))
    }
}

impl fmt::Debug for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, h)| (name, h.is_some())))
            .finish()
    }
}
