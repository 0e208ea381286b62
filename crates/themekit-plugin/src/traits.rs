//! Closure adapters for async hook filters.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use themekit_core::result::AppResult;

use crate::hooks::definitions::{AsyncHookFilter, HookAction, HookCallback};

type BoxedFilterFuture = Pin<Box<dyn Future<Output = AppResult<HookAction>> + Send>>;

/// A closure-based async filter for quick registration.
///
/// The closure receives owned copies of the running value and the extra
/// arguments, so the returned future can be `'static`.
pub struct ClosureFilter {
    /// Label used in debug output.
    label: String,
    /// Filter function.
    handler: Arc<dyn Fn(Value, Vec<Value>) -> BoxedFilterFuture + Send + Sync>,
}

impl std::fmt::Debug for ClosureFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureFilter")
            .field("label", &self.label)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureFilter {
    /// Creates a new closure-based filter.
    pub fn new<F, Fut>(label: &str, handler: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<HookAction>> + Send + 'static,
    {
        Self {
            label: label.to_string(),
            handler: Arc::new(move |value: Value, args: Vec<Value>| -> BoxedFilterFuture {
                Box::pin(handler(value, args))
            }),
        }
    }

    /// Wraps the filter into a registrable [`HookCallback`].
    pub fn into_callback(self) -> HookCallback {
        HookCallback::from_async(self)
    }
}

#[async_trait]
impl AsyncHookFilter for ClosureFilter {
    async fn filter(&self, value: &Value, args: &[Value]) -> AppResult<HookAction> {
        (self.handler)(value.clone(), args.to_vec()).await
    }
}
