//! Shortcode handler trait and closure adapter.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use themekit_core::result::AppResult;

/// Parsed `key="value"` attributes of a shortcode.
pub type ShortcodeAttrs = BTreeMap<String, String>;

/// Renders one shortcode tag to HTML.
#[async_trait]
pub trait ShortcodeHandler: Send + Sync {
    /// Renders the tag. `inner` is empty for self-closing tags.
    async fn render(&self, inner: &str, attrs: &ShortcodeAttrs, context: &Value)
    -> AppResult<String>;
}

type RenderFn = dyn Fn(&str, &ShortcodeAttrs, &Value) -> AppResult<String> + Send + Sync;

/// A synchronous closure used as a shortcode handler.
#[derive(Clone)]
pub struct FnShortcode {
    /// Render function.
    render: Arc<RenderFn>,
}

impl FnShortcode {
    /// Wraps `render` into a handler.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&str, &ShortcodeAttrs, &Value) -> AppResult<String> + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(render),
        }
    }
}

impl std::fmt::Debug for FnShortcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnShortcode")
            .field("render", &"<closure>")
            .finish()
    }
}

#[async_trait]
impl ShortcodeHandler for FnShortcode {
    async fn render(
        &self,
        inner: &str,
        attrs: &ShortcodeAttrs,
        context: &Value,
    ) -> AppResult<String> {
        (self.render)(inner, attrs, context)
    }
}
