//! Runtime context shared by everything running on a page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Value, json};
use tracing::{debug, info};

use themekit_content::shortcode::engine::ShortcodeEngine;
use themekit_content::slot::registry::{Container, SlotRegistry};
use themekit_core::config::RuntimeConfig;
use themekit_core::error::AppError;
use themekit_core::names::{EventName, HookPoint};
use themekit_core::result::AppResult;
use themekit_dom::host::DomHost;
use themekit_navigation::history::BrowserHistory;
use themekit_navigation::scheduler::NavigationScheduler;
use themekit_plugin::events::bus::EventBus;
use themekit_plugin::hooks::dispatcher::HookDispatcher;
use themekit_plugin::hooks::registry::HookRegistry;

/// Name of the slot painted at the end of the body during boot.
pub const BODY_END_SLOT: &str = "body_end";

/// Every extension point of a page, constructed once and shared by `Arc`.
#[derive(Clone)]
pub struct ThemeRuntime {
    /// Runtime configuration.
    pub config: Arc<RuntimeConfig>,
    /// The document.
    pub dom: Arc<dyn DomHost>,
    /// Hook registrations.
    pub hooks: Arc<HookRegistry>,
    /// Hook pipelines over [`hooks`](Self::hooks).
    pub dispatcher: HookDispatcher,
    /// Event bus.
    pub events: Arc<EventBus>,
    /// Shortcode engine.
    pub shortcodes: Arc<ShortcodeEngine>,
    /// Slot registry.
    pub slots: Arc<SlotRegistry>,
    /// Navigation-completion scheduler.
    pub scheduler: NavigationScheduler,
    /// Session history feeding the scheduler.
    pub history: Arc<BrowserHistory>,

    entry: String,
    site: Arc<Mutex<Value>>,
    locale: Arc<Mutex<String>>,
    booted: Arc<AtomicBool>,
}

impl std::fmt::Debug for ThemeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeRuntime")
            .field("entry", &self.entry)
            .field("hooks", &self.hooks.registered_hooks())
            .field("shortcodes", &self.shortcodes.registered())
            .field("slots", &self.slots.slot_names())
            .field("booted", &self.booted.load(Ordering::Relaxed))
            .finish()
    }
}

impl ThemeRuntime {
    /// Builds the runtime for a page loaded at `entry` (path or URL).
    ///
    /// The scheduler is subscribed to the document's mutations here; it does
    /// not act on them until [`boot`](Self::boot) starts it.
    pub fn new(config: RuntimeConfig, dom: Arc<dyn DomHost>, entry: &str) -> AppResult<Self> {
        let hooks = Arc::new(HookRegistry::with_default_priority(
            config.hooks.default_priority,
        ));
        let dispatcher = HookDispatcher::new(hooks.clone());
        let events = Arc::new(EventBus::new());

        let shortcodes = Arc::new(ShortcodeEngine::new(dispatcher.clone())?);
        let slots = Arc::new(SlotRegistry::new(
            dom.clone(),
            dispatcher.clone(),
            config.slots.clone(),
        ));

        let scheduler = NavigationScheduler::new(
            dispatcher.clone(),
            events.clone(),
            dom.clone(),
            config.scheduler.clone(),
            &config.site.origin,
        );
        dom.observe(scheduler.observer());
        let history = Arc::new(BrowserHistory::new(scheduler.clone(), entry)?);

        let locale = config.site.locale.clone();
        debug!(entry = %entry, origin = %config.site.origin, "Theme runtime created");

        Ok(Self {
            config: Arc::new(config),
            dom,
            hooks,
            dispatcher,
            events,
            shortcodes,
            slots,
            scheduler,
            history,
            entry: entry.to_string(),
            site: Arc::new(Mutex::new(Value::Null)),
            locale: Arc::new(Mutex::new(locale)),
            booted: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Runs the page start-up sequence and returns the effective site info.
    ///
    /// 1. `system_init` filters `site`.
    /// 2. Declared slots are rendered.
    /// 3. The navigation scheduler starts.
    /// 4. `theme:ready` is emitted.
    /// 5. The `body_end` slot is painted and its hook fired.
    pub async fn boot(&self, site: Value) -> AppResult<Value> {
        if self.booted.swap(true, Ordering::SeqCst) {
            return Err(AppError::internal("Theme runtime already booted"));
        }
        info!(entry = %self.entry, "Booting theme runtime");

        let site = match self
            .dispatcher
            .trigger_async(HookPoint::SystemInit.as_str(), site, &[])
            .await
        {
            Ok(site) => site,
            Err(e) => {
                // Nothing has been painted yet, so a later boot may retry.
                self.booted.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        *self.site.lock().unwrap_or_else(PoisonError::into_inner) = site.clone();

        let rendered = self.slots.auto_render().await?;

        self.scheduler.start(&self.entry)?;

        let delivered = self.events.emit(
            EventName::ThemeReady.as_str(),
            &json!({ "site": site, "slots": rendered }),
        );
        debug!(listeners = delivered, "theme:ready emitted");

        self.paint_body_end().await?;

        info!(slots = rendered, "Theme runtime booted");
        Ok(site)
    }

    /// Switches the active locale and emits `locale:change`.
    /// Returns the previous locale.
    pub fn set_locale(&self, locale: &str) -> String {
        let previous = {
            let mut current = self.locale.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, locale.to_string())
        };
        info!(from = %previous, to = %locale, "Locale changed");
        self.events.emit(
            EventName::LocaleChange.as_str(),
            &json!({ "from": previous, "to": locale }),
        );
        previous
    }

    /// Expands shortcodes in `content`.
    pub async fn render_content(&self, content: &str, context: &Value) -> AppResult<String> {
        self.shortcodes.render(content, context).await
    }

    /// Navigates like `history.pushState` would.
    pub async fn navigate(&self, href: &str) -> AppResult<bool> {
        self.history.push_state(href).await
    }

    /// Site info as returned by `system_init`; `null` before boot.
    pub fn site(&self) -> Value {
        self.site
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Active locale.
    pub fn locale(&self) -> String {
        self.locale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether [`boot`](Self::boot) has run.
    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::SeqCst)
    }

    /// Stops the scheduler's pending timers.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    async fn paint_body_end(&self) -> AppResult<()> {
        // Rendering fires the slot's hook itself; an empty slot still
        // announces the end of the body.
        if !self.slots.get_content(BODY_END_SLOT).is_empty() {
            let container = Container::Selector(self.config.slots.body_container.clone());
            if self.slots.render(BODY_END_SLOT, container).await?.is_some() {
                return Ok(());
            }
        }
        self.dispatcher
            .trigger_async(
                HookPoint::BodyEnd.as_str(),
                json!({ "container": Value::Null, "slot": BODY_END_SLOT }),
                &[],
            )
            .await?;
        Ok(())
    }
}
