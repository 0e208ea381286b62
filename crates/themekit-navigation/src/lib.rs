//! # themekit-navigation
//!
//! Decides when a single-page navigation has finished rendering and fires
//! `content_render` once per navigation.
//!
//! - [`NavigationScheduler`]: state machine fed by navigations and DOM
//!   mutations, settled by a debounce window or a fallback timer
//! - [`BrowserHistory`]: `pushState`/`replaceState`/`popstate` entry points
//! - [`Location`]: path and query parsing against the site origin

pub mod history;
pub mod location;
pub mod scheduler;
pub mod state;

pub use history::BrowserHistory;
pub use location::Location;
pub use scheduler::{NavigationScheduler, SchedulerStats};
pub use state::{NavigationState, Phase};
