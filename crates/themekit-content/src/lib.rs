//! # themekit-content
//!
//! Content extension points:
//!
//! - [`ShortcodeEngine`]: expands `[tag attr="v"]inner[/tag]` and `[tag/]`
//!   through registered handlers, with hook-based pre/post processing
//! - [`SlotRegistry`]: named page regions that many contributors append to,
//!   painted into the document on demand and updated live afterwards

pub mod shortcode;
pub mod slot;

pub use shortcode::engine::ShortcodeEngine;
pub use shortcode::handler::{FnShortcode, ShortcodeAttrs, ShortcodeHandler};
pub use slot::registry::{Container, SlotContent, SlotRegistry, SlotTarget};
