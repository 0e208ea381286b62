//! Well-known hook and event names.
//!
//! Hooks and events are keyed by plain strings so that themes can invent
//! their own (every slot, for instance, announces itself through a hook of
//! the same name). The names below are the ones fired by the runtime itself.

use serde::{Deserialize, Serialize};

/// Hooks fired by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    // ── Lifecycle ──
    /// Fired once while the runtime boots. Seed is the site information.
    SystemInit,
    /// Fired after the `body_end` slot has been painted.
    BodyEnd,

    // ── Navigation ──
    /// Fired when the client-side route changes. Seed is `{from, to, query}`.
    RouteChange,
    /// Fired once per navigation when the primary content is believed stable.
    /// Seed is `{path, query}`.
    ContentRender,

    // ── Shortcodes ──
    /// Filters raw content before shortcodes are expanded.
    ShortcodeBeforeRender,
    /// Filters the HTML produced by a single shortcode handler.
    ShortcodeOutput,
    /// Filters the fully expanded content.
    ShortcodeAfterRender,
}

impl HookPoint {
    /// Returns the string name of this hook point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SystemInit => "system_init",
            Self::BodyEnd => "body_end",
            Self::RouteChange => "route_change",
            Self::ContentRender => "content_render",
            Self::ShortcodeBeforeRender => "shortcode_before_render",
            Self::ShortcodeOutput => "shortcode_output",
            Self::ShortcodeAfterRender => "shortcode_after_render",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    /// `route:change`, payload `{from, to, query}`.
    RouteChange,
    /// `theme:ready`, emitted at the end of boot.
    ThemeReady,
    /// `locale:change`, payload `{from, to}`.
    LocaleChange,
}

impl EventName {
    /// Returns the string name of this event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RouteChange => "route:change",
            Self::ThemeReady => "theme:ready",
            Self::LocaleChange => "locale:change",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
