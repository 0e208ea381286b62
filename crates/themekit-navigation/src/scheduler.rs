//! Navigation-completion scheduler.
//!
//! After a navigation the scheduler waits for evidence that the new view is
//! in the document: added nodes under a content container, followed by a
//! quiet debounce window. If no such evidence arrives the fallback timer
//! settles the navigation anyway. Either way `content_render` fires once per
//! navigation, with the generation counter discarding timers that belong to
//! an earlier one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, trace, warn};

use themekit_core::config::scheduler::SchedulerConfig;
use themekit_core::names::{EventName, HookPoint};
use themekit_core::result::AppResult;
use themekit_dom::host::{DomHost, MutationObserver, MutationRecord};
use themekit_plugin::events::bus::EventBus;
use themekit_plugin::hooks::dispatcher::HookDispatcher;

use crate::location::Location;
use crate::state::{NavigationState, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Fallback,
    Debounce,
}

impl Timer {
    fn as_str(self) -> &'static str {
        match self {
            Self::Fallback => "fallback",
            Self::Debounce => "debounce",
        }
    }
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    /// Navigations that changed the path.
    pub navigations: u64,
    /// `content_render` dispatches.
    pub renders: u64,
    /// Timers that elapsed after their navigation was superseded.
    pub stale_timers: u64,
    /// Current generation.
    pub generation: u64,
    /// Current phase.
    pub phase: Phase,
    /// Current path, if known.
    pub last_path: Option<String>,
    /// When `content_render` was last dispatched.
    pub last_render_at: Option<DateTime<Utc>>,
}

struct Shared {
    state: Mutex<NavigationState>,
    hooks: HookDispatcher,
    events: Arc<EventBus>,
    dom: Arc<dyn DomHost>,
    config: SchedulerConfig,
    /// Content selectors joined into one selector list.
    content_selector: String,
    origin: String,
    navigations: AtomicU64,
    renders: AtomicU64,
    stale_timers: AtomicU64,
    last_render_at: Mutex<Option<DateTime<Utc>>>,
}

/// Fires `content_render` once per navigation, after the content settles.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct NavigationScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for NavigationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationScheduler")
            .field("config", &self.shared.config)
            .field("origin", &self.shared.origin)
            .finish()
    }
}

impl NavigationScheduler {
    /// Creates an idle scheduler. Relative navigation targets resolve
    /// against `origin`.
    pub fn new(
        hooks: HookDispatcher,
        events: Arc<EventBus>,
        dom: Arc<dyn DomHost>,
        config: SchedulerConfig,
        origin: &str,
    ) -> Self {
        let content_selector = config.content_selectors.join(", ");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(NavigationState::new()),
                hooks,
                events,
                dom,
                config,
                content_selector,
                origin: origin.to_string(),
                navigations: AtomicU64::new(0),
                renders: AtomicU64::new(0),
                stale_timers: AtomicU64::new(0),
                last_render_at: Mutex::new(None),
            }),
        }
    }

    /// Records the initial location.
    ///
    /// With `render_on_start` the page load is treated as the first
    /// navigation: the fallback is armed but `route_change` is not fired.
    pub fn start(&self, href: &str) -> AppResult<()> {
        let location = self.resolve(href)?;
        let path = location.path.clone();
        let mut state = self.lock();
        state.record(location);
        if self.shared.config.render_on_start {
            let generation = state.begin();
            self.arm(&mut state, Timer::Fallback, generation);
        }

        info!(
            path = %path,
            render_on_start = self.shared.config.render_on_start,
            "Navigation scheduler started"
        );
        Ok(())
    }

    /// Resolves `href` and navigates to it. See [`navigate_to`](Self::navigate_to).
    pub async fn navigate(&self, href: &str) -> AppResult<bool> {
        let location = self.resolve(href)?;
        self.navigate_to(location).await
    }

    /// Starts a navigation to `location` unless it is the current path.
    ///
    /// Fires the `route_change` hook and event with `{from, to, query}`.
    /// Returns whether a navigation started. A failing `route_change` filter
    /// is returned to the caller after the navigation has been committed and
    /// the event emitted.
    pub async fn navigate_to(&self, location: Location) -> AppResult<bool> {
        let (previous, generation) = {
            let mut state = self.lock();
            let Some((previous, generation)) = state.navigate(location.clone()) else {
                debug!(path = %location.path, "Navigation to current path ignored");
                return Ok(false);
            };
            state.cancel_debounce();
            self.arm(&mut state, Timer::Fallback, generation);
            (previous, generation)
        };
        self.shared.navigations.fetch_add(1, Ordering::Relaxed);

        let from = previous.map(|l| l.path);
        info!(
            from = from.as_deref().unwrap_or("-"),
            to = %location.path,
            generation = generation,
            "Navigated"
        );

        let payload = json!({
            "from": from,
            "to": location.path,
            "query": location.query_value(),
        });
        let hooked = self
            .shared
            .hooks
            .trigger_async(HookPoint::RouteChange.as_str(), payload.clone(), &[])
            .await;
        self.shared
            .events
            .emit(EventName::RouteChange.as_str(), &payload);

        // The navigation stays committed; the caller still hears about the failure.
        if let Err(e) = hooked {
            error!(path = %location.path, error = %e, "route_change hook failed");
            return Err(e);
        }
        Ok(true)
    }

    /// Feeds DOM mutations. Added nodes under a content container re-arm the
    /// debounce window while a navigation is pending.
    pub fn observe(&self, records: &[MutationRecord]) {
        if !records.iter().any(|r| self.qualifies(r)) {
            return;
        }
        let mut state = self.lock();
        if state.phase != Phase::Navigated {
            return;
        }
        let generation = state.generation;
        self.arm(&mut state, Timer::Debounce, generation);
        trace!(generation = generation, "Content mutation, debounce re-armed");
    }

    /// A [`MutationObserver`] forwarding to [`observe`](Self::observe).
    ///
    /// Holds the scheduler weakly so the document does not keep it alive.
    pub fn observer(&self) -> MutationObserver {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        Arc::new(move |records: &[MutationRecord]| {
            if let Some(shared) = shared.upgrade() {
                NavigationScheduler { shared }.observe(records);
            }
        })
    }

    /// Aborts pending timers and returns to idle.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.cancel_fallback();
        state.cancel_debounce();
        state.phase = Phase::Idle;
        info!(generation = state.generation, "Navigation scheduler stopped");
    }

    /// Activity counters and current state.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.lock();
        SchedulerStats {
            navigations: self.shared.navigations.load(Ordering::Relaxed),
            renders: self.shared.renders.load(Ordering::Relaxed),
            stale_timers: self.shared.stale_timers.load(Ordering::Relaxed),
            generation: state.generation,
            phase: state.phase,
            last_path: state.last_path().map(str::to_string),
            last_render_at: *self
                .shared
                .last_render_at
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// The current location.
    pub fn current(&self) -> Option<Location> {
        self.lock().current.clone()
    }

    /// Resolves `href` against the site origin.
    pub fn resolve(&self, href: &str) -> AppResult<Location> {
        Location::resolve(&self.shared.origin, href)
    }

    /// Scheduler settings.
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, NavigationState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn qualifies(&self, record: &MutationRecord) -> bool {
        if !record.has_added_nodes() {
            return false;
        }
        match self
            .shared
            .dom
            .matches(record.target, &self.shared.content_selector)
        {
            Ok(matched) => matched,
            Err(e) => {
                warn!(node = %record.target, error = %e, "Content selector check failed");
                false
            }
        }
    }

    /// Replaces the pending timer of `kind` with a fresh one for `generation`.
    fn arm(&self, state: &mut NavigationState, kind: Timer, generation: u64) {
        let delay = match kind {
            Timer::Fallback => {
                state.cancel_fallback();
                self.shared.config.fallback()
            }
            Timer::Debounce => {
                state.cancel_debounce();
                self.shared.config.debounce()
            }
        };

        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.elapsed(kind, generation).await;
        });

        match kind {
            Timer::Fallback => state.fallback = Some(handle),
            Timer::Debounce => state.debounce = Some(handle),
        }
    }

    async fn elapsed(&self, kind: Timer, generation: u64) {
        let location = {
            let mut state = self.lock();
            if !state.settle(generation) {
                self.shared.stale_timers.fetch_add(1, Ordering::Relaxed);
                debug!(
                    timer = kind.as_str(),
                    generation = generation,
                    current = state.generation,
                    "Stale timer ignored"
                );
                return;
            }
            // Drop our own handle and cancel the other timer.
            match kind {
                Timer::Fallback => {
                    state.fallback.take();
                    state.cancel_debounce();
                }
                Timer::Debounce => {
                    state.debounce.take();
                    state.cancel_fallback();
                }
            }
            state.current.clone()
        };

        let (path, query) = location
            .map(|l| (l.path.clone(), l.query_value()))
            .unwrap_or_else(|| (String::new(), Value::Object(Default::default())));

        info!(
            path = %path,
            generation = generation,
            settled_by = kind.as_str(),
            "Navigation settled"
        );

        let payload = json!({ "path": path, "query": query });
        if let Err(e) = self
            .shared
            .hooks
            .trigger_async(HookPoint::ContentRender.as_str(), payload, &[])
            .await
        {
            error!(path = %path, error = %e, "content_render hook failed");
        }

        self.shared.renders.fetch_add(1, Ordering::Relaxed);
        *self
            .shared
            .last_render_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        self.lock().finish(generation);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use themekit_core::error::AppError;
    use themekit_dom::MemoryDocument;
    use themekit_plugin::events::bus::listener;
    use themekit_plugin::hooks::definitions::HookAction;
    use themekit_plugin::hooks::registry::HookRegistry;
    use tokio::time::sleep;

    use super::*;

    const PAGE: &str = r#"<html><body><main id="app"></main><aside id="side"></aside></body></html>"#;

    struct Harness {
        doc: Arc<MemoryDocument>,
        hooks: Arc<HookRegistry>,
        events: Arc<EventBus>,
        scheduler: NavigationScheduler,
        renders: Arc<Mutex<Vec<Value>>>,
    }

    fn harness(config: SchedulerConfig) -> Harness {
        let doc = Arc::new(MemoryDocument::from_html(PAGE));
        let hooks = Arc::new(HookRegistry::new());
        let events = Arc::new(EventBus::new());
        let scheduler = NavigationScheduler::new(
            HookDispatcher::new(hooks.clone()),
            events.clone(),
            doc.clone(),
            config,
            "http://localhost",
        );
        doc.observe(scheduler.observer());

        let renders = Arc::new(Mutex::new(Vec::new()));
        let sink = renders.clone();
        hooks.filter(HookPoint::ContentRender.as_str(), 10, move |v, _| {
            sink.lock().unwrap().push(v.clone());
            Ok(HookAction::Continue)
        });

        Harness {
            doc,
            hooks,
            events,
            scheduler,
            renders,
        }
    }

    fn quiet_start() -> SchedulerConfig {
        SchedulerConfig {
            render_on_start: false,
            ..SchedulerConfig::default()
        }
    }

    fn grow(doc: &MemoryDocument, selector: &str) {
        let parent = doc.query_selector(selector).unwrap().unwrap();
        let child = doc.create_element("div").unwrap();
        doc.append_child(parent, child).unwrap();
    }

    fn render_paths(h: &Harness) -> Vec<String> {
        h.renders
            .lock()
            .unwrap()
            .iter()
            .map(|v| v["path"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_mutation_renders_once_after_debounce() {
        let h = harness(quiet_start());
        h.scheduler.start("/").unwrap();
        assert!(h.scheduler.navigate("/posts/1").await.unwrap());

        grow(&h.doc, "main");
        sleep(Duration::from_millis(100)).await;
        assert!(render_paths(&h).is_empty());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(render_paths(&h), vec!["/posts/1".to_string()]);

        // The fallback was cancelled by the debounce.
        sleep(Duration::from_millis(2000)).await;
        assert_eq!(render_paths(&h).len(), 1);
        assert_eq!(h.scheduler.stats().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_keep_extending_debounce() {
        let h = harness(quiet_start());
        h.scheduler.navigate("/list").await.unwrap();

        for _ in 0..4 {
            grow(&h.doc, "#app");
            sleep(Duration::from_millis(100)).await;
        }
        assert!(render_paths(&h).is_empty());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(render_paths(&h).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_renders_without_mutation() {
        let h = harness(quiet_start());
        h.scheduler.start("/").unwrap();
        h.scheduler.navigate("/about").await.unwrap();

        sleep(Duration::from_millis(700)).await;
        assert!(render_paths(&h).is_empty());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(render_paths(&h), vec!["/about".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_outside_content_does_not_debounce() {
        let h = harness(quiet_start());
        h.scheduler.navigate("/tags").await.unwrap();

        grow(&h.doc, "#side");
        sleep(Duration::from_millis(300)).await;
        assert!(render_paths(&h).is_empty());

        sleep(Duration::from_millis(600)).await;
        assert_eq!(render_paths(&h).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_navigations_render_last_path_once() {
        let h = harness(quiet_start());
        h.scheduler.start("/").unwrap();
        h.scheduler.navigate("/a").await.unwrap();
        sleep(Duration::from_millis(100)).await;
        h.scheduler.navigate("/b").await.unwrap();

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(render_paths(&h), vec!["/b".to_string()]);

        let stats = h.scheduler.stats();
        assert_eq!(stats.navigations, 2);
        assert_eq!(stats.renders, 1);
        assert_eq!(stats.generation, 2);
        assert!(stats.last_render_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_path_and_idle_mutations_are_ignored() {
        let h = harness(quiet_start());
        h.scheduler.start("/same").unwrap();
        assert!(!h.scheduler.navigate("/same").await.unwrap());

        grow(&h.doc, "main");
        sleep(Duration::from_millis(2000)).await;
        assert!(render_paths(&h).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_on_start_skips_route_change() {
        let h = harness(SchedulerConfig::default());
        let routes = Arc::new(AtomicU64::new(0));
        let counter = routes.clone();
        h.hooks.filter(HookPoint::RouteChange.as_str(), 10, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(HookAction::Continue)
        });

        h.scheduler.start("/home?lang=en").unwrap();
        sleep(Duration::from_millis(900)).await;

        let renders = h.renders.lock().unwrap().clone();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0], json!({"path": "/home?lang=en", "query": {"lang": "en"}}));
        assert_eq!(routes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_change_payload_reaches_hook_and_event() {
        let h = harness(quiet_start());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.events.on(
            EventName::RouteChange.as_str(),
            listener(move |v| {
                sink.lock().unwrap().push(v.clone());
                Ok(())
            }),
        );
        let hooked = Arc::new(Mutex::new(Vec::new()));
        let hook_sink = hooked.clone();
        h.hooks.filter(HookPoint::RouteChange.as_str(), 10, move |v, _| {
            hook_sink.lock().unwrap().push(v.clone());
            Ok(HookAction::Continue)
        });

        h.scheduler.start("/").unwrap();
        h.scheduler.navigate("/search?q=rust").await.unwrap();

        let expected = json!({"from": "/", "to": "/search?q=rust", "query": {"q": "rust"}});
        assert_eq!(*seen.lock().unwrap(), vec![expected.clone()]);
        assert_eq!(*hooked.lock().unwrap(), vec![expected]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_route_change_reaches_caller_after_commit() {
        let h = harness(quiet_start());
        let emitted = Arc::new(Mutex::new(0));
        let count = emitted.clone();
        h.events.on(
            EventName::RouteChange.as_str(),
            listener(move |_| {
                *count.lock().unwrap() += 1;
                Ok(())
            }),
        );
        h.hooks.filter(HookPoint::RouteChange.as_str(), 10, |_, _| {
            Err(AppError::hook("analytics offline"))
        });

        h.scheduler.start("/").unwrap();
        let err = h.scheduler.navigate("/docs").await.unwrap_err();
        assert_eq!(err.kind, themekit_core::error::ErrorKind::Hook);

        assert_eq!(*emitted.lock().unwrap(), 1);
        assert_eq!(h.scheduler.stats().last_path.as_deref(), Some("/docs"));
        sleep(Duration::from_millis(900)).await;
        assert_eq!(render_paths(&h), vec!["/docs".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_render_hook_does_not_stall_scheduler() {
        let h = harness(quiet_start());
        h.hooks.filter(HookPoint::ContentRender.as_str(), 1, |_, _| {
            Err(AppError::hook("typesetter crashed"))
        });

        h.scheduler.navigate("/one").await.unwrap();
        sleep(Duration::from_millis(900)).await;
        h.scheduler.navigate("/two").await.unwrap();
        sleep(Duration::from_millis(900)).await;

        let stats = h.scheduler.stats();
        assert_eq!(stats.renders, 2);
        assert_eq!(stats.phase, Phase::Idle);
        // The failing filter runs first and aborts the chain.
        assert!(render_paths(&h).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_timers() {
        let h = harness(quiet_start());
        h.scheduler.navigate("/bye").await.unwrap();
        grow(&h.doc, "main");
        h.scheduler.shutdown();

        sleep(Duration::from_millis(2000)).await;
        assert!(render_paths(&h).is_empty());
        assert_eq!(h.scheduler.stats().phase, Phase::Idle);
    }
}
