//! Shared test helpers for integration tests.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use themekit_core::config::RuntimeConfig;
use themekit_core::config::scheduler::SchedulerConfig;
use themekit_dom::{DomHost, MemoryDocument};
use themekit_plugin::events::bus::listener;
use themekit_plugin::hooks::definitions::HookAction;
use themekit_runtime::ThemeRuntime;

/// A blog-like page with a content area, a sidebar slot and a footer.
pub const BLOG_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Blog</title></head><body>
<header id="top"></header>
<main><div id="article-content"></div></main>
<aside data-slot="sidebar"></aside>
</body></html>"#;

/// Test page context
pub struct TestPage {
    /// The in-memory document
    pub doc: Arc<MemoryDocument>,
    /// Runtime wired to `doc`
    pub runtime: ThemeRuntime,
}

impl TestPage {
    /// Page at `/` with default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Page whose first view does not schedule `content_render`
    pub fn quiet() -> Self {
        Self::with_config(RuntimeConfig {
            scheduler: SchedulerConfig {
                render_on_start: false,
                ..SchedulerConfig::default()
            },
            ..RuntimeConfig::default()
        })
    }

    /// Page with a custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        let doc = Arc::new(MemoryDocument::from_html(BLOG_PAGE));
        let runtime =
            ThemeRuntime::new(config, doc.clone(), "/").expect("Failed to build runtime");
        Self { doc, runtime }
    }

    /// Records every seed passed to hook `name`
    pub fn record_hook(&self, name: &str) -> Arc<Mutex<Vec<Value>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        self.runtime.hooks.filter(name, 100, move |value, _| {
            sink.lock().unwrap().push(value.clone());
            Ok(HookAction::Continue)
        });
        seen
    }

    /// Records every payload emitted for `event`
    pub fn record_event(&self, event: &str) -> Arc<Mutex<Vec<Value>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        self.runtime.events.on(
            event,
            listener(move |value| {
                sink.lock().unwrap().push(value.clone());
                Ok(())
            }),
        );
        seen
    }

    /// Replaces the article body, as a view framework would after a route change
    pub fn render_article(&self, html: &str) {
        let area = self
            .doc
            .query_selector("#article-content")
            .unwrap()
            .expect("Page has no article area");
        self.doc.set_inner_html(area, html).unwrap();
    }
}

/// The `path` field of each recorded `content_render` payload
pub fn paths(recorded: &Arc<Mutex<Vec<Value>>>) -> Vec<String> {
    recorded
        .lock()
        .unwrap()
        .iter()
        .map(|v| v["path"].as_str().unwrap_or_default().to_string())
        .collect()
}
