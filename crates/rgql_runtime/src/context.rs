//! Caller-supplied request context.
//!
//! The router never looks inside a context; it hands the same shared value to
//! the executor for every call made on behalf of a request or subscription.
//! Values are keyed by `TypeId`, so embedders get type-safe access to their
//! own data (auth, database handles, request ids).

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type-safe storage for request-scoped data.
///
/// # Example
///
/// ```
/// use rgql_runtime::context::Context;
///
/// #[derive(Clone)]
/// struct UserId(String);
///
/// let mut ctx = Context::new();
/// ctx.insert(UserId("123".into()));
///
/// let user_id: Option<&UserId> = ctx.get();
/// assert_eq!(user_id.unwrap().0, "123");
/// ```
#[derive(Default)]
pub struct Context {
    data: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
    headers: HashMap<String, String>,
}

impl Context {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.data
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Gets a reference to a value by type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Removes a value by type.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns true if the context contains a value of the given type.
    pub fn contains<T: 'static>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Sets a header value.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Gets a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Returns all headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Wraps the context for sharing across tasks.
    pub fn shared(self) -> SharedContext {
        Arc::new(self)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("data_count", &self.data.len())
            .field("headers", &self.headers)
            .finish()
    }
}

/// A shareable, thread-safe context.
pub type SharedContext = Arc<Context>;

/// Fluent construction helpers.
pub trait ContextExt {
    /// Adds a value to the context and returns self.
    #[must_use]
    fn with<T: Send + Sync + 'static>(self, value: T) -> Self;

    /// Adds a header and returns self.
    #[must_use]
    fn with_header(self, key: impl Into<String>, value: impl Into<String>) -> Self;
}

impl ContextExt for Context {
    fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TenantId(String);

    #[test]
    fn test_context_replace_and_remove() {
        let mut ctx = Context::new();
        ctx.insert(TenantId("old".into()));
        let old = ctx.insert(TenantId("new".into()));

        assert_eq!(old, Some(TenantId("old".into())));
        assert_eq!(ctx.get::<TenantId>(), Some(&TenantId("new".into())));

        assert!(ctx.remove::<TenantId>().is_some());
        assert!(!ctx.contains::<TenantId>());
    }

    #[test]
    fn test_context_ext_fluent() {
        let ctx = Context::new()
            .with(TenantId("acme".into()))
            .with_header("Authorization", "Bearer token");

        assert!(ctx.contains::<TenantId>());
        assert_eq!(ctx.header("Authorization"), Some("Bearer token"));
        assert_eq!(ctx.header("Missing"), None);
    }
}
