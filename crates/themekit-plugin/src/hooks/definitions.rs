//! Filter callback definitions.
//!
//! A hook is a pipeline: each filter sees the running value and either
//! leaves it alone ([`HookAction::Continue`]) or replaces it
//! ([`HookAction::Replace`]).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use themekit_core::result::AppResult;

/// What a filter wants done with the running pipeline value.
#[derive(Debug, Clone, PartialEq)]
pub enum HookAction {
    /// Carry the current value over unchanged.
    Continue,
    /// Replace the current value.
    Replace(Value),
}

impl HookAction {
    /// Creates a replacement action from anything convertible to JSON.
    pub fn replace(value: impl Into<Value>) -> Self {
        Self::Replace(value.into())
    }

    /// Applies this action to the running value.
    pub fn apply(self, current: Value) -> Value {
        match self {
            Self::Continue => current,
            Self::Replace(value) => value,
        }
    }
}

impl From<Option<Value>> for HookAction {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(v) => Self::Replace(v),
            None => Self::Continue,
        }
    }
}

/// Signature of a synchronous filter: `(current, extra args) -> action`.
pub type HookFn = dyn Fn(&Value, &[Value]) -> AppResult<HookAction> + Send + Sync;

/// Trait for asynchronous filters, awaited in chain order by
/// [`HookDispatcher::trigger_async`](super::dispatcher::HookDispatcher::trigger_async).
#[async_trait]
pub trait AsyncHookFilter: Send + Sync {
    /// Filters the running value.
    async fn filter(&self, value: &Value, args: &[Value]) -> AppResult<HookAction>;
}

/// A registered filter.
///
/// Identity is the identity of the inner `Arc`: keep a clone of the callback
/// you registered to remove it later with `off`.
#[derive(Clone)]
pub enum HookCallback {
    /// Runs inline.
    Sync(Arc<HookFn>),
    /// Must be awaited; only valid under `trigger_async`.
    Async(Arc<dyn AsyncHookFilter>),
}

impl HookCallback {
    /// Wraps a synchronous closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> AppResult<HookAction> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wraps an asynchronous filter implementation.
    pub fn from_async(filter: impl AsyncHookFilter + 'static) -> Self {
        Self::Async(Arc::new(filter))
    }

    /// Returns true when both callbacks point at the same filter.
    pub fn same_as(&self, other: &HookCallback) -> bool {
        match (self, other) {
            (Self::Sync(a), Self::Sync(b)) => Arc::ptr_eq(a, b),
            (Self::Async(a), Self::Async(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether this callback must be awaited.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl std::fmt::Debug for HookCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("HookCallback::Sync(<closure>)"),
            Self::Async(_) => f.write_str("HookCallback::Async(<filter>)"),
        }
    }
}
