//! Shortcode handlers, tag scanning and expansion.

pub mod engine;
pub mod handler;
pub mod parser;

pub use engine::ShortcodeEngine;
pub use handler::{FnShortcode, ShortcodeAttrs, ShortcodeHandler};
