//! Hook system: registry, dispatcher and filter definitions.

pub mod definitions;
pub mod dispatcher;
pub mod registry;

pub use definitions::{AsyncHookFilter, HookAction, HookCallback};
pub use dispatcher::HookDispatcher;
pub use registry::HookRegistry;
