//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use crate::events::bus::{EventBus, Listener, listener};
pub use crate::hooks::definitions::{AsyncHookFilter, HookAction, HookCallback};
pub use crate::hooks::dispatcher::HookDispatcher;
pub use crate::hooks::registry::HookRegistry;
pub use crate::traits::ClosureFilter;

pub use themekit_core::names::{EventName, HookPoint};
