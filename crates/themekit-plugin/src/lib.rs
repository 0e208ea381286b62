//! # themekit-plugin
//!
//! Extension primitives for Themekit themes and plugins. Provides:
//!
//! - Hook registry with priority-ordered, insertion-stable chains
//! - Hook dispatcher running filter pipelines synchronously or with strict
//!   sequential awaiting
//! - Event bus with isolated listener failures and self-removing `once`
//!   listeners

pub mod events;
pub mod hooks;
pub mod prelude;
pub mod traits;

pub use events::bus::{EventBus, Listener};
pub use hooks::definitions::{AsyncHookFilter, HookAction, HookCallback};
pub use hooks::dispatcher::HookDispatcher;
pub use hooks::registry::HookRegistry;
