//! Slot rendering configuration.

use serde::{Deserialize, Serialize};

/// Declarative slot wiring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Attribute naming the slot an element hosts, e.g. `<div data-slot="sidebar">`.
    #[serde(default = "default_data_attribute")]
    pub data_attribute: String,
    /// Selector of the container the `body_end` slot is painted into.
    #[serde(default = "default_body_container")]
    pub body_container: String,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            data_attribute: default_data_attribute(),
            body_container: default_body_container(),
        }
    }
}

fn default_data_attribute() -> String {
    "data-slot".to_string()
}

fn default_body_container() -> String {
    "body".to_string()
}
