//! Named page regions filled by many contributors.

pub mod registry;

pub use registry::{Container, SlotContent, SlotRegistry, SlotTarget};
