//! Shortcode engine: expands registered tags through their handlers.
//!
//! Rendering is span-based. Every tag found in the (pre-filtered) content is
//! replaced at its own position, so identical tags render independently and
//! handler output is never scanned again.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use themekit_core::error::AppError;
use themekit_core::names::HookPoint;
use themekit_core::result::AppResult;
use themekit_plugin::hooks::dispatcher::HookDispatcher;

use super::handler::{FnShortcode, ShortcodeAttrs, ShortcodeHandler};
use super::parser::ShortcodeScanner;

/// Expands `[name attrs]inner[/name]` and `[name attrs/]` tags.
pub struct ShortcodeEngine {
    /// Tag name → handler.
    handlers: DashMap<String, Arc<dyn ShortcodeHandler>>,
    /// Dispatcher for the before/output/after hooks.
    hooks: HookDispatcher,
    /// Compiled tag patterns.
    scanner: ShortcodeScanner,
}

impl std::fmt::Debug for ShortcodeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcodeEngine")
            .field("handlers", &self.registered())
            .finish()
    }
}

impl ShortcodeEngine {
    /// Creates an engine with no handlers.
    pub fn new(hooks: HookDispatcher) -> AppResult<Self> {
        Ok(Self {
            handlers: DashMap::new(),
            hooks,
            scanner: ShortcodeScanner::new()?,
        })
    }

    /// Registers `handler` for tag `name`, replacing any previous one.
    pub fn register(&self, name: &str, handler: impl ShortcodeHandler + 'static) {
        if self
            .handlers
            .insert(name.to_string(), Arc::new(handler))
            .is_some()
        {
            warn!(shortcode = %name, "Shortcode handler overwritten");
        } else {
            debug!(shortcode = %name, "Shortcode registered");
        }
    }

    /// Registers a synchronous closure for tag `name`.
    pub fn register_fn<F>(&self, name: &str, render: F)
    where
        F: Fn(&str, &ShortcodeAttrs, &Value) -> AppResult<String> + Send + Sync + 'static,
    {
        self.register(name, FnShortcode::new(render));
    }

    /// Removes the handler for `name`. Returns whether one existed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.handlers.remove(name).is_some();
        if removed {
            debug!(shortcode = %name, "Shortcode unregistered");
        }
        removed
    }

    /// Whether a handler is registered for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered tag names, sorted.
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Expands every registered shortcode in `content`.
    ///
    /// A failing handler is logged and its tag is kept verbatim. Hook
    /// failures abort rendering and reach the caller.
    pub async fn render(&self, content: &str, context: &Value) -> AppResult<String> {
        let content = self
            .hooks
            .trigger_async(
                HookPoint::ShortcodeBeforeRender.as_str(),
                Value::String(content.to_string()),
                std::slice::from_ref(context),
            )
            .await
            .and_then(|v| expect_text(HookPoint::ShortcodeBeforeRender, v))?;

        let found = match self.scanner.scan(&content) {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Shortcode scan failed, content left untouched");
                Vec::new()
            }
        };
        let mut output = String::with_capacity(content.len());
        let mut cursor = 0;
        let mut expanded = 0usize;

        for tag in found {
            output.push_str(&content[cursor..tag.span.start]);
            let tag_text = &content[tag.span.clone()];
            cursor = tag.span.end;

            let Some(handler) = self.handlers.get(&tag.name).map(|h| Arc::clone(h.value()))
            else {
                output.push_str(tag_text);
                continue;
            };

            let attrs = self.scanner.parse_attrs(&tag.raw_attrs)?;
            let inner = tag.inner.as_deref().unwrap_or_default();
            let html = match handler.render(inner, &attrs, context).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(shortcode = %tag.name, error = %e, "Shortcode handler failed");
                    output.push_str(tag_text);
                    continue;
                }
            };

            let args = [
                Value::String(tag.name.clone()),
                attrs_value(&attrs),
                context.clone(),
            ];
            let html = self
                .hooks
                .trigger_async(
                    HookPoint::ShortcodeOutput.as_str(),
                    Value::String(html),
                    &args,
                )
                .await
                .and_then(|v| expect_text(HookPoint::ShortcodeOutput, v))?;
            output.push_str(&html);
            expanded += 1;
        }
        output.push_str(&content[cursor..]);

        debug!(expanded = expanded, "Shortcodes rendered");

        self.hooks
            .trigger_async(
                HookPoint::ShortcodeAfterRender.as_str(),
                Value::String(output),
                std::slice::from_ref(context),
            )
            .await
            .and_then(|v| expect_text(HookPoint::ShortcodeAfterRender, v))
    }

    /// Removes registered shortcodes, keeping their inner text.
    ///
    /// Unregistered tags stay. No handlers or hooks run.
    pub fn strip(&self, content: &str) -> AppResult<String> {
        let mut output = String::with_capacity(content.len());
        let mut cursor = 0;
        for tag in self.scanner.scan(content)? {
            output.push_str(&content[cursor..tag.span.start]);
            if self.has(&tag.name) {
                output.push_str(tag.inner.as_deref().unwrap_or_default());
            } else {
                output.push_str(&content[tag.span.clone()]);
            }
            cursor = tag.span.end;
        }
        output.push_str(&content[cursor..]);
        Ok(output)
    }
}

fn attrs_value(attrs: &ShortcodeAttrs) -> Value {
    Value::Object(
        attrs
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<String, Value>>(),
    )
}

fn expect_text(hook: HookPoint, value: Value) -> AppResult<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(AppError::shortcode(format!(
            "Hook '{hook}' must produce a string, got {other}"
        ))),
    }
}
