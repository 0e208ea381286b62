//! Hook registry: filters keyed by hook name, ordered by priority.

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use themekit_core::config::DEFAULT_PRIORITY;
use themekit_core::result::AppResult;

use super::definitions::{AsyncHookFilter, HookAction, HookCallback};

/// Entry in the hook registry.
#[derive(Debug, Clone)]
struct HookEntry {
    /// The filter.
    callback: HookCallback,
    /// Priority (lower = earlier execution).
    priority: i32,
}

/// Registry of hook filters organized by hook name.
#[derive(Debug)]
pub struct HookRegistry {
    /// Hook name → chain sorted by priority, insertion order among ties.
    chains: DashMap<String, Vec<HookEntry>>,
    /// Priority used by [`HookRegistry::add`].
    default_priority: i32,
}

impl HookRegistry {
    /// Creates a new empty hook registry.
    pub fn new() -> Self {
        Self::with_default_priority(DEFAULT_PRIORITY)
    }

    /// Creates a registry whose [`add`](Self::add) uses `priority`.
    pub fn with_default_priority(priority: i32) -> Self {
        Self {
            chains: DashMap::new(),
            default_priority: priority,
        }
    }

    /// Registers a filter for `name` at `priority`.
    ///
    /// Registering the same callback twice yields two invocations.
    pub fn on(&self, name: &str, callback: HookCallback, priority: i32) {
        let mut chain = self.chains.entry(name.to_string()).or_default();
        chain.push(HookEntry { callback, priority });
        // Vec::sort_by_key is stable, so ties keep insertion order.
        chain.sort_by_key(|e| e.priority);

        debug!(
            hook = %name,
            priority = priority,
            chain_len = chain.len(),
            "Hook filter registered"
        );
    }

    /// Registers a filter at the default priority.
    pub fn add(&self, name: &str, callback: HookCallback) {
        self.on(name, callback, self.default_priority);
    }

    /// Registers a synchronous closure and returns its handle for [`off`](Self::off).
    pub fn filter<F>(&self, name: &str, priority: i32, f: F) -> HookCallback
    where
        F: Fn(&Value, &[Value]) -> AppResult<HookAction> + Send + Sync + 'static,
    {
        let callback = HookCallback::sync(f);
        self.on(name, callback.clone(), priority);
        callback
    }

    /// Registers an async filter and returns its handle for [`off`](Self::off).
    pub fn on_async(
        &self,
        name: &str,
        filter: impl AsyncHookFilter + 'static,
        priority: i32,
    ) -> HookCallback {
        let callback = HookCallback::from_async(filter);
        self.on(name, callback.clone(), priority);
        callback
    }

    /// Removes every registration of `callback` under `name`. No-op if absent.
    pub fn off(&self, name: &str, callback: &HookCallback) {
        let removed = match self.chains.get_mut(name) {
            Some(mut chain) => {
                let before = chain.len();
                chain.retain(|e| !e.callback.same_as(callback));
                before - chain.len()
            }
            None => 0,
        };

        // Remove empty hook entries
        self.chains.remove_if(name, |_, chain| chain.is_empty());

        debug!(hook = %name, removed = removed, "Hook filter removed");
    }

    /// Returns a snapshot of the chain for `name`, in execution order.
    ///
    /// Later registrations do not affect a snapshot already taken.
    pub fn snapshot(&self, name: &str) -> Vec<HookCallback> {
        self.chains
            .get(name)
            .map(|chain| chain.iter().map(|e| e.callback.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns whether any filters are registered for `name`.
    pub fn has_hooks(&self, name: &str) -> bool {
        self.chains
            .get(name)
            .map(|chain| !chain.is_empty())
            .unwrap_or(false)
    }

    /// Returns the number of filters registered for `name`.
    pub fn hook_count(&self, name: &str) -> usize {
        self.chains.get(name).map(|chain| chain.len()).unwrap_or(0)
    }

    /// Returns all hook names with at least one filter.
    pub fn registered_hooks(&self) -> Vec<String> {
        self.chains.iter().map(|e| e.key().clone()).collect()
    }

    /// Returns the default priority used by [`add`](Self::add).
    pub fn default_priority(&self) -> i32 {
        self.default_priority
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
