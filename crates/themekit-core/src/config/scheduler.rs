//! Navigation-completion scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing and selector settings for the navigation-completion scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Delay after a navigation before `content_render` fires regardless of
    /// DOM evidence.
    #[serde(default = "default_fallback_ms")]
    pub fallback_ms: u64,
    /// Quiet window required after the last qualifying mutation.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Selectors identifying the primary content area.
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,
    /// Whether the initial page load counts as the first navigation.
    #[serde(default = "default_true")]
    pub render_on_start: bool,
}

impl SchedulerConfig {
    /// Fallback delay as a [`Duration`].
    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    /// Debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fallback_ms: default_fallback_ms(),
            debounce_ms: default_debounce_ms(),
            content_selectors: default_content_selectors(),
            render_on_start: default_true(),
        }
    }
}

fn default_fallback_ms() -> u64 {
    800
}

fn default_debounce_ms() -> u64 {
    150
}

fn default_content_selectors() -> Vec<String> {
    [
        "#article-content",
        ".article-content",
        ".post-content",
        ".page-content",
        "article",
        "main",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}
