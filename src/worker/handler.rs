//! Handler registration: mapping a task's `kind` to the async function
//! that executes it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// Executes a task's payload and produces either a result value or a
/// human-readable failure reason.
///
/// A handler returning `Err` is a normal, expected outcome (the task
/// transitions to `Failed`); a panicking handler is isolated by the
/// worker pool and also surfaces as `Failed`, not a crashed worker.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, payload: HashMap<String, Value>) -> Result<Value, String>;
}

/// Adapts a plain async closure to [`Handler`].
///
/// # Examples
///
/// ```
/// use taskrunner::worker::handler::FnHandler;
/// use std::collections::HashMap;
///
/// let handler = FnHandler::new(|payload: HashMap<String, serde_json::Value>| async move {
///     let x = payload.get("x").and_then(|v| v.as_i64()).ok_or("missing x")?;
///     Ok(serde_json::json!(x * x))
/// });
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HashMap<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, String>> + Send,
{
    async fn call(&self, payload: HashMap<String, Value>) -> Result<Value, String> {
        (self.f)(payload).await
    }
}

/// Adapts a plain blocking (non-async) closure to [`Handler`], running it on
/// tokio's blocking thread pool via [`tokio::task::spawn_blocking`] so a
/// slow or CPU-bound handler does not stall the worker's async executor.
///
/// # Examples
///
/// ```
/// use taskrunner::worker::handler::BlockingFnHandler;
/// use std::collections::HashMap;
///
/// let handler = BlockingFnHandler::new(|payload: HashMap<String, serde_json::Value>| {
///     let x = payload.get("x").and_then(|v| v.as_i64()).ok_or("missing x")?;
///     Ok(serde_json::json!(x * x))
/// });
/// ```
pub struct BlockingFnHandler<F> {
    f: Arc<F>,
}

impl<F> BlockingFnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> Handler for BlockingFnHandler<F>
where
    F: Fn(HashMap<String, Value>) -> Result<Value, String> + Send + Sync + 'static,
{
    async fn call(&self, payload: HashMap<String, Value>) -> Result<Value, String> {
        let f = Arc::clone(&self.f);
        tokio::task::spawn_blocking(move || f(payload))
            .await
            .map_err(|e| format!("blocking handler panicked: {e}"))?
    }
}

/// Concurrent map from task `kind` to its registered [`Handler`].
///
/// Registration is expected at startup; lookups happen on every dispatch,
/// so this uses the same `DashMap` fine-grained-locking approach as the
/// in-memory backends rather than a `RwLock<HashMap<_>>`.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any prior registration.
    pub fn register(&self, kind: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Looks up the handler for `kind`, if registered.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(kind).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn register_then_get_returns_handler() {
        let registry = HandlerRegistry::new();
        registry.register(
            "square",
            Arc::new(FnHandler::new(|payload: HashMap<String, Value>| async move {
                let x = payload.get("x").and_then(Value::as_i64).ok_or("missing x")?;
                Ok(json!(x * x))
            })),
        );

        let handler = registry.get("square").expect("handler should be registered");
        let mut payload = HashMap::new();
        payload.insert("x".to_string(), json!(7));
        let result = handler.call(payload).await.unwrap();
        assert_eq!(result, json!(49));
    }

    #[tokio::test]
    async fn get_unregistered_kind_returns_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn blocking_fn_handler_runs_on_blocking_pool() {
        let handler = BlockingFnHandler::new(|payload: HashMap<String, Value>| {
            let x = payload.get("x").and_then(Value::as_i64).ok_or("missing x")?;
            Ok(json!(x * x))
        });
        let mut payload = HashMap::new();
        payload.insert("x".to_string(), json!(9));
        assert_eq!(handler.call(payload).await.unwrap(), json!(81));
    }

    #[tokio::test]
    async fn register_overwrites_prior_handler_for_same_kind() {
        let registry = HandlerRegistry::new();
        registry.register(
            "k",
            Arc::new(FnHandler::new(|_: HashMap<String, Value>| async move { Ok(json!(1)) })),
        );
        registry.register(
            "k",
            Arc::new(FnHandler::new(|_: HashMap<String, Value>| async move { Ok(json!(2)) })),
        );
        let result = registry.get("k").unwrap().call(HashMap::new()).await.unwrap();
        assert_eq!(result, json!(2));
        assert_eq!(registry.len(), 1);
    }
}
