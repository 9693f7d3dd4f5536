//! Named post-validation hooks.
//!
//! A `validate*` call may name a registered callback, pass one inline, or
//! pass none. Callbacks receive the finished report; a synchronous caller
//! discards any returned work, while the async and streaming paths await
//! asynchronous callbacks before returning.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::rule::ValidationReport;

pub type SyncCallback = Arc<dyn Fn(&ValidationReport) + Send + Sync>;
pub type AsyncCallback =
    Arc<dyn Fn(ValidationReport) -> BoxFuture<'static, ()> + Send + Sync>;

/// A post-validation hook, synchronous or suspending.
///
/// Synchronous hooks borrow the report; asynchronous hooks receive their
/// own copy so the pending work can outlive the call.
#[derive(Clone)]
pub enum Callback {
    Sync(SyncCallback),
    Async(AsyncCallback),
}

impl Callback {
    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(&ValidationReport) + Send + Sync + 'static,
    {
        Callback::Sync(Arc::new(hook))
    }

    /// Wraps an `async` hook; the future is boxed internally.
    pub fn asynchronous<F, Fut>(hook: F) -> Self
    where
        F: Fn(ValidationReport) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let boxed: AsyncCallback = Arc::new(move |report| Box::pin(hook(report)));
        Callback::Async(boxed)
    }

    /// Runs the hook without awaiting: an async hook's pending work is
    /// built and discarded, mirroring the sync path's contract.
    pub(crate) fn invoke_sync(&self, report: &ValidationReport) {
        match self {
            Callback::Sync(hook) => hook(report),
            Callback::Async(hook) => {
                drop(hook(report.clone()));
            }
        }
    }

    pub(crate) async fn invoke_async(&self, report: &ValidationReport) {
        match self {
            Callback::Sync(hook) => hook(report),
            Callback::Async(hook) => hook(report.clone()).await,
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Sync(_) => f.write_str("Callback::Sync"),
            Callback::Async(_) => f.write_str("Callback::Async"),
        }
    }
}

/// How a `validate*` call refers to its hook.
#[derive(Debug, Clone, Default)]
pub enum CallbackSpec {
    #[default]
    None,
    /// Name previously registered on the engine.
    Named(String),
    Inline(Callback),
}

impl CallbackSpec {
    pub fn named(name: impl Into<String>) -> Self {
        CallbackSpec::Named(name.into())
    }

    pub fn inline(callback: Callback) -> Self {
        CallbackSpec::Inline(callback)
    }

    /// Interprets an untyped configuration value as a callback reference:
    /// absent/null means no callback, text means a registered name, and
    /// anything else is a `BadCallbackKind` failure.
    pub fn from_value(value: Option<&Value>) -> EngineResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(CallbackSpec::None),
            Some(Value::String(name)) => Ok(CallbackSpec::Named(name.clone())),
            Some(_) => Err(EngineError::BadCallbackKind),
        }
    }
}

/// Name-keyed callback table attached to one engine.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    by_name: HashMap<String, Callback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, callback: Callback) {
        self.by_name.insert(name.into(), callback);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolves a spec to a runnable callback, failing with
    /// `UnknownCallback` for unregistered names.
    pub fn resolve<'a>(&'a self, spec: &'a CallbackSpec) -> EngineResult<Option<&'a Callback>> {
        match spec {
            CallbackSpec::None => Ok(None),
            CallbackSpec::Inline(callback) => Ok(Some(callback)),
            CallbackSpec::Named(name) => self
                .by_name
                .get(name)
                .map(Some)
                .ok_or_else(|| EngineError::UnknownCallback { name: name.clone() }),
        }
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("registered", &self.by_name.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolve_named_callback() {
        let mut registry = CallbackRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        registry.register(
            "audit",
            Callback::sync(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let spec = CallbackSpec::named("audit");
        let callback = registry.resolve(&spec).unwrap().unwrap();
        callback.invoke_sync(&ValidationReport::passed(json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_name_fails() {
        let registry = CallbackRegistry::new();
        let err = registry.resolve(&CallbackSpec::named("ghost")).unwrap_err();
        assert_eq!(err.kind(), "UnknownCallback");
    }

    #[test]
    fn none_resolves_to_nothing() {
        let registry = CallbackRegistry::new();
        assert!(registry.resolve(&CallbackSpec::None).unwrap().is_none());
    }

    #[test]
    fn from_value_accepts_names_and_absence_only() {
        assert!(matches!(
            CallbackSpec::from_value(Some(&json!("hook"))),
            Ok(CallbackSpec::Named(_))
        ));
        assert!(matches!(
            CallbackSpec::from_value(None),
            Ok(CallbackSpec::None)
        ));
        assert!(matches!(
            CallbackSpec::from_value(Some(&Value::Null)),
            Ok(CallbackSpec::None)
        ));
        let err = CallbackSpec::from_value(Some(&json!(42))).unwrap_err();
        assert_eq!(err.kind(), "BadCallbackKind");
    }

    #[tokio::test]
    async fn async_callback_is_awaited() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback = Callback::asynchronous(move |report| {
            let seen = Arc::clone(&seen);
            async move {
                assert!(report.is_valid);
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });
        callback
            .invoke_async(&ValidationReport::passed(json!({})))
            .await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
