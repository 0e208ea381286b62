//! Slot registry: priority-ordered contributions painted into the document.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, info, warn};

use themekit_core::config::slots::SlotConfig;
use themekit_core::error::AppError;
use themekit_core::result::AppResult;
use themekit_dom::host::{DomHost, NodeId};
use themekit_plugin::hooks::dispatcher::HookDispatcher;

type ContentFn = dyn Fn() -> String + Send + Sync;

/// Markup contributed to a slot.
#[derive(Clone)]
pub enum SlotContent {
    /// Fixed markup.
    Static(String),
    /// Markup produced on every resolution.
    Dynamic(Arc<ContentFn>),
}

impl SlotContent {
    /// Wraps a closure producing markup.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Produces the markup.
    pub fn resolve(&self) -> String {
        match self {
            Self::Static(html) => html.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl std::fmt::Debug for SlotContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(html) => f.debug_tuple("Static").field(html).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<closure>").finish(),
        }
    }
}

impl From<&str> for SlotContent {
    fn from(html: &str) -> Self {
        Self::Static(html.to_string())
    }
}

impl From<String> for SlotContent {
    fn from(html: String) -> Self {
        Self::Static(html)
    }
}

/// Where a slot is painted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// First element matching a selector.
    Selector(String),
    /// A known element.
    Element(NodeId),
}

impl From<&str> for Container {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<NodeId> for Container {
    fn from(node: NodeId) -> Self {
        Self::Element(node)
    }
}

/// A container a slot was painted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTarget {
    /// The container element.
    pub container: NodeId,
    /// The `slot-{name}` wrapper; `None` while the slot had no content.
    pub wrapper: Option<NodeId>,
}

#[derive(Debug, Clone)]
struct Contribution {
    content: SlotContent,
    priority: i32,
}

#[derive(Debug, Default)]
struct SlotState {
    contributions: Vec<Contribution>,
    rendered: bool,
    targets: Vec<SlotTarget>,
}

/// Registry of slot contributions and their rendered targets.
pub struct SlotRegistry {
    /// Slot name → state.
    slots: DashMap<String, SlotState>,
    /// Document the slots are painted into.
    dom: Arc<dyn DomHost>,
    /// Dispatcher for the per-slot "painted" hook.
    hooks: HookDispatcher,
    /// Declarative wiring settings.
    config: SlotConfig,
}

impl std::fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("slots", &self.slot_names())
            .field("config", &self.config)
            .finish()
    }
}

impl SlotRegistry {
    /// Creates an empty registry painting into `dom`.
    pub fn new(dom: Arc<dyn DomHost>, hooks: HookDispatcher, config: SlotConfig) -> Self {
        Self {
            slots: DashMap::new(),
            dom,
            hooks,
            config,
        }
    }

    /// Adds a contribution to `name` at `priority`.
    ///
    /// When the slot is already on the page, the new markup is appended to
    /// every rendered wrapper. Earlier contributions are left alone.
    pub fn register(
        &self,
        name: &str,
        content: impl Into<SlotContent>,
        priority: i32,
    ) -> AppResult<()> {
        check_name(name)?;
        let content = content.into();
        let targets = {
            let mut state = self.slots.entry(name.to_string()).or_default();
            state.contributions.push(Contribution {
                content: content.clone(),
                priority,
            });
            state.contributions.sort_by_key(|c| c.priority);
            if state.rendered {
                state.targets.clone()
            } else {
                Vec::new()
            }
        };

        debug!(slot = %name, priority = priority, "Slot contribution registered");

        if targets.is_empty() {
            return Ok(());
        }
        let html = content.resolve();
        if html.is_empty() {
            return Ok(());
        }

        for target in targets {
            let wrapper = match target.wrapper {
                Some(wrapper) => wrapper,
                None => {
                    let wrapper = self.create_wrapper(name)?;
                    self.dom.append_child(target.container, wrapper)?;
                    self.record_wrapper(name, target.container, wrapper);
                    wrapper
                }
            };
            self.append_markup(wrapper, &html)?;
            debug!(slot = %name, wrapper = %wrapper, "Slot content injected live");
        }
        Ok(())
    }

    /// Adds a contribution at the hook registry's default priority.
    pub fn add(&self, name: &str, content: impl Into<SlotContent>) -> AppResult<()> {
        let priority = self.hooks.registry().default_priority();
        self.register(name, content, priority)
    }

    /// Resolves every contribution of `name` in priority order, joined by newlines.
    pub fn get_content(&self, name: &str) -> String {
        // Clone out so dynamic contributors run without the map guard.
        let contents: Vec<SlotContent> = self
            .slots
            .get(name)
            .map(|state| state.contributions.iter().map(|c| c.content.clone()).collect())
            .unwrap_or_default();

        contents
            .iter()
            .map(SlotContent::resolve)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Paints `name` into `container` and announces it through the hook of
    /// the same name.
    ///
    /// Returns `None` when the container cannot be found.
    pub async fn render(
        &self,
        name: &str,
        container: impl Into<Container>,
    ) -> AppResult<Option<SlotTarget>> {
        check_name(name)?;
        let container = match container.into() {
            Container::Element(node) => node,
            Container::Selector(selector) => match self.dom.query_selector(&selector)? {
                Some(node) => node,
                None => {
                    warn!(slot = %name, selector = %selector, "Slot container not found");
                    return Ok(None);
                }
            },
        };

        let html = self.get_content(name);
        let wrapper = if html.is_empty() {
            None
        } else {
            let wrapper = self.create_wrapper(name)?;
            self.dom.set_inner_html(wrapper, &html)?;
            self.dom.append_child(container, wrapper)?;
            for script in self.dom.select_within(wrapper, "script")? {
                self.dom.activate_script(script)?;
            }
            Some(wrapper)
        };

        let target = SlotTarget { container, wrapper };
        {
            let mut state = self.slots.entry(name.to_string()).or_default();
            state.rendered = true;
            state.targets.push(target);
        }

        info!(slot = %name, container = %container, empty = wrapper.is_none(), "Slot rendered");

        self.hooks
            .trigger_async(name, json!({ "container": container.0, "slot": name }), &[])
            .await?;

        Ok(Some(target))
    }

    /// Renders every slot declared in the document through the slot data
    /// attribute. Returns how many were rendered.
    pub async fn auto_render(&self) -> AppResult<usize> {
        let attribute = &self.config.data_attribute;
        let hosts = self.dom.query_selector_all(&format!("[{attribute}]"))?;

        let mut rendered = 0;
        for host in hosts {
            let Some(name) = self.dom.attribute(host, attribute) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if let Err(e) = check_name(name) {
                warn!(slot = %name, error = %e, "Declared slot skipped");
                continue;
            }
            if self.render(name, host).await?.is_some() {
                rendered += 1;
            }
        }

        debug!(rendered = rendered, "Declared slots rendered");
        Ok(rendered)
    }

    /// Whether `name` has been painted at least once.
    pub fn is_rendered(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|s| s.rendered)
    }

    /// Names of every slot with contributions or renders, sorted.
    pub fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Slot wiring settings.
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    fn create_wrapper(&self, name: &str) -> AppResult<NodeId> {
        let wrapper = self.dom.create_element("div")?;
        self.dom.set_attribute(wrapper, "class", &format!("slot-{name}"))?;
        self.dom.set_attribute(wrapper, "data-slot-rendered", name)?;
        Ok(wrapper)
    }

    fn record_wrapper(&self, name: &str, container: NodeId, wrapper: NodeId) {
        if let Some(mut state) = self.slots.get_mut(name) {
            for target in state.targets.iter_mut() {
                if target.container == container && target.wrapper.is_none() {
                    target.wrapper = Some(wrapper);
                }
            }
        }
    }

    /// Appends parsed `html` after the wrapper's existing children and
    /// re-creates the scripts it brought in.
    fn append_markup(&self, wrapper: NodeId, html: &str) -> AppResult<()> {
        let staging = self.dom.create_element("div")?;
        self.dom.set_inner_html(staging, html)?;
        let scripts = self.dom.select_within(staging, "script")?;
        for child in self.dom.children(staging)? {
            self.dom.append_child(wrapper, child)?;
        }
        for script in scripts {
            self.dom.activate_script(script)?;
        }
        Ok(())
    }
}

/// Slot names become a CSS class and a hook name, so they must be a single
/// non-empty token.
fn check_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(AppError::slot(format!("Invalid slot name '{name}'")));
    }
    Ok(())
}
