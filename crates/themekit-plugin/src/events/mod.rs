//! Event bus for fire-and-forget named notifications.

pub mod bus;

pub use bus::{EventBus, Listener, listener};
