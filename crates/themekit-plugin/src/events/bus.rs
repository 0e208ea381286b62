//! Named pub/sub with isolated listener failures.
//!
//! Listeners run synchronously in insertion order. A listener that returns
//! an error or panics is logged and skipped; the remaining listeners still
//! run and the emitter never sees the failure.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, error};

use themekit_core::result::AppResult;

/// An event listener. Identity for [`EventBus::off`] is `Arc` identity.
pub type Listener = Arc<dyn Fn(&Value) -> AppResult<()> + Send + Sync>;

/// Wraps a closure into a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Value) -> AppResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Entry in the listener table.
#[derive(Clone)]
struct ListenerEntry {
    /// The caller-supplied callback.
    callback: Listener,
    /// Latch for `once` listeners; `None` for persistent ones.
    fired: Option<Arc<AtomicBool>>,
}

/// Event bus keyed by event name.
#[derive(Default)]
pub struct EventBus {
    /// Event name → listeners in insertion order.
    listeners: DashMap<String, Vec<ListenerEntry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to `event`.
    pub fn on(&self, event: &str, callback: Listener) {
        self.push(event, ListenerEntry {
            callback,
            fired: None,
        });
    }

    /// Subscribes `callback` for a single delivery.
    ///
    /// The listener is removed before `callback` runs, so a callback that
    /// re-emits the same event does not reach itself again.
    pub fn once(&self, event: &str, callback: Listener) {
        self.push(event, ListenerEntry {
            callback,
            fired: Some(Arc::new(AtomicBool::new(false))),
        });
    }

    /// Removes every subscription of `callback` (including `once` ones).
    pub fn off(&self, event: &str, callback: &Listener) {
        if let Some(mut entries) = self.listeners.get_mut(event) {
            entries.retain(|e| !Arc::ptr_eq(&e.callback, callback));
        }
        self.listeners.remove_if(event, |_, entries| entries.is_empty());
    }

    /// Removes all listeners of `event`.
    pub fn clear(&self, event: &str) {
        self.listeners.remove(event);
    }

    /// Delivers `data` to every listener of `event`.
    ///
    /// Returns how many listeners completed successfully.
    pub fn emit(&self, event: &str, data: &Value) -> usize {
        let snapshot: Vec<ListenerEntry> = match self.listeners.get(event) {
            Some(entries) => entries.clone(),
            None => return 0,
        };

        debug!(event = %event, listener_count = snapshot.len(), "Emitting event");

        let mut delivered = 0;
        for entry in snapshot {
            if let Some(fired) = &entry.fired {
                if fired.swap(true, Ordering::SeqCst) {
                    continue;
                }
                self.remove_once(event, fired);
            }

            match panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(data))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    error!(event = %event, error = %e, "Event listener failed");
                }
                Err(_) => {
                    error!(event = %event, "Event listener panicked");
                }
            }
        }

        delivered
    }

    /// Returns the number of listeners subscribed to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(|e| e.len()).unwrap_or(0)
    }

    fn push(&self, event: &str, entry: ListenerEntry) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(entry);
        debug!(event = %event, "Event listener registered");
    }

    fn remove_once(&self, event: &str, latch: &Arc<AtomicBool>) {
        if let Some(mut entries) = self.listeners.get_mut(event) {
            entries.retain(|e| !e.fired.as_ref().is_some_and(|f| Arc::ptr_eq(f, latch)));
        }
        self.listeners.remove_if(event, |_, entries| entries.is_empty());
    }
}
