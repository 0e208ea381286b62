//! Hook dispatcher, which runs filter pipelines.
//!
//! Both dispatch modes share the same contract:
//! - The running value starts as the seed.
//! - Filters run in priority order over a snapshot of the chain.
//! - `Replace` overrides the running value, `Continue` carries it over.
//! - A failing filter aborts the pipeline and the error reaches the caller.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use themekit_core::error::AppError;
use themekit_core::result::AppResult;

use super::definitions::HookCallback;
use super::registry::HookRegistry;

/// Dispatches hooks to all registered filters.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    /// Runs the pipeline for `name` synchronously.
    ///
    /// Returns `seed` untouched when nothing is registered. An async filter in
    /// the chain cannot be awaited here and is reported as a hook error.
    pub fn trigger(&self, name: &str, seed: Value, args: &[Value]) -> AppResult<Value> {
        let chain = self.registry.snapshot(name);
        if chain.is_empty() {
            return Ok(seed);
        }

        debug!(hook = %name, filter_count = chain.len(), "Triggering hook");

        let mut result = seed;
        for (position, callback) in chain.iter().enumerate() {
            match callback {
                HookCallback::Sync(filter) => {
                    let action = filter(&result, args).inspect_err(|e| {
                        warn!(hook = %name, position = position, error = %e, "Hook filter failed");
                    })?;
                    result = action.apply(result);
                }
                HookCallback::Async(_) => {
                    return Err(AppError::hook(format!(
                        "Hook '{name}' has an async filter at position {position}; \
                         use trigger_async"
                    )));
                }
            }
        }

        Ok(result)
    }

    /// Runs the pipeline for `name`, awaiting each filter before the next.
    pub async fn trigger_async(&self, name: &str, seed: Value, args: &[Value]) -> AppResult<Value> {
        let chain = self.registry.snapshot(name);
        if chain.is_empty() {
            return Ok(seed);
        }

        debug!(hook = %name, filter_count = chain.len(), "Triggering hook (async)");

        let mut result = seed;
        for (position, callback) in chain.iter().enumerate() {
            let action = match callback {
                HookCallback::Sync(filter) => filter(&result, args),
                HookCallback::Async(filter) => filter.filter(&result, args).await,
            }
            .inspect_err(|e| {
                warn!(hook = %name, position = position, error = %e, "Hook filter failed");
            })?;
            result = action.apply(result);
        }

        Ok(result)
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::hooks::definitions::{AsyncHookFilter, HookAction};

    fn dispatcher() -> HookDispatcher {
        HookDispatcher::new(Arc::new(HookRegistry::new()))
    }

    #[test]
    fn test_identity_without_filters() {
        let d = dispatcher();
        let out = d.trigger("nothing", json!({"a": 1}), &[]).unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn test_pass_through_when_all_continue() {
        let d = dispatcher();
        d.registry().filter("h", 10, |_, _| Ok(HookAction::Continue));
        d.registry().filter("h", 5, |_, _| Ok(HookAction::Continue));
        assert_eq!(d.trigger("h", json!("seed"), &[]).unwrap(), json!("seed"));
    }

    #[test]
    fn test_order_follows_priority_and_insertion() {
        let d = dispatcher();
        let calls = Arc::new(Mutex::new(Vec::new()));
        for (label, priority) in [("c", 20), ("a1", 1), ("b", 10), ("a2", 1)] {
            let calls = calls.clone();
            d.registry().filter("h", priority, move |_, _| {
                calls.lock().unwrap().push(label);
                Ok(HookAction::Continue)
            });
        }
        d.trigger("h", Value::Null, &[]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn test_replace_feeds_next_filter_and_extra_args() {
        let d = dispatcher();
        d.registry().filter("title", 10, |value, args| {
            let suffix = args.first().and_then(|a| a.as_str()).unwrap_or_default();
            Ok(HookAction::replace(format!(
                "{}{}",
                value.as_str().unwrap_or_default(),
                suffix
            )))
        });
        d.registry().filter("title", 20, |value, _| {
            Ok(HookAction::replace(value.as_str().unwrap_or_default().to_uppercase()))
        });
        let out = d.trigger("title", json!("hello"), &[json!(" world")]).unwrap();
        assert_eq!(out, json!("HELLO WORLD"));
    }

    #[test]
    fn test_filter_error_propagates() {
        let d = dispatcher();
        let reached = Arc::new(Mutex::new(false));
        d.registry()
            .filter("h", 1, |_, _| Err(AppError::hook("broken stage")));
        let flag = reached.clone();
        d.registry().filter("h", 2, move |_, _| {
            *flag.lock().unwrap() = true;
            Ok(HookAction::Continue)
        });

        let err = d.trigger("h", Value::Null, &[]).unwrap_err();
        assert_eq!(err.message, "broken stage");
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_off_stops_invocation() {
        let d = dispatcher();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let handle = d.registry().filter("h", 10, move |_, _| {
            *c.lock().unwrap() += 1;
            Ok(HookAction::Continue)
        });
        d.trigger("h", Value::Null, &[]).unwrap();
        d.registry().off("h", &handle);
        d.trigger("h", Value::Null, &[]).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_registration_during_trigger_applies_next_time() {
        let d = dispatcher();
        let registry = d.registry().clone();
        d.registry().filter("h", 10, move |value, _| {
            registry.filter("h", 0, |_, _| Ok(HookAction::replace(100)));
            Ok(HookAction::replace(value.as_i64().unwrap_or(0) + 1))
        });

        assert_eq!(d.trigger("h", json!(0), &[]).unwrap(), json!(1));
        assert_eq!(d.registry().hook_count("h"), 2);
        // The filter registered in-flight now runs first (priority 0).
        assert_eq!(d.trigger("h", json!(0), &[]).unwrap(), json!(101));
    }

    struct Delayed {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        delay: Duration,
    }

    #[async_trait]
    impl AsyncHookFilter for Delayed {
        async fn filter(&self, value: &Value, _args: &[Value]) -> AppResult<HookAction> {
            tokio::time::sleep(self.delay).await;
            self.log.lock().unwrap().push(self.label);
            let mut list = value.as_array().cloned().unwrap_or_default();
            list.push(json!(self.label));
            Ok(HookAction::Replace(Value::Array(list)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_filters_run_sequentially() {
        let d = dispatcher();
        let log = Arc::new(Mutex::new(Vec::new()));
        d.registry().on(
            "h",
            HookCallback::from_async(Delayed {
                label: "slow",
                log: log.clone(),
                delay: Duration::from_millis(50),
            }),
            1,
        );
        d.registry().on(
            "h",
            HookCallback::from_async(Delayed {
                label: "fast",
                log: log.clone(),
                delay: Duration::from_millis(1),
            }),
            2,
        );
        d.registry().filter("h", 3, |_, _| Ok(HookAction::Continue));

        let out = d.trigger_async("h", json!([]), &[]).await.unwrap();
        assert_eq!(out, json!(["slow", "fast"]));
        assert_eq!(*log.lock().unwrap(), vec!["slow", "fast"]);
    }

    #[test]
    fn test_sync_trigger_rejects_async_filter() {
        let d = dispatcher();
        d.registry().on(
            "h",
            HookCallback::from_async(Delayed {
                label: "x",
                log: Arc::new(Mutex::new(Vec::new())),
                delay: Duration::ZERO,
            }),
            10,
        );
        let err = d.trigger("h", Value::Null, &[]).unwrap_err();
        assert_eq!(err.kind, themekit_core::error::ErrorKind::Hook);
    }
}
