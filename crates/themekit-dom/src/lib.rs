//! # themekit-dom
//!
//! The document seam of the runtime.
//!
//! Slot rendering and the navigation scheduler never touch a concrete DOM;
//! they talk to a [`DomHost`]. A browser host forwards these calls to the
//! real document. [`MemoryDocument`] is a self-contained implementation used
//! by the preview binary and by tests: it parses markup, answers simple
//! selectors, reports mutations to observers, and models the platform rule
//! that only script elements created through the DOM API execute.

pub mod document;
pub mod host;
pub mod html;
pub mod selector;

pub use document::{ExecutedScript, MemoryDocument};
pub use host::{DomHost, MutationObserver, MutationRecord, NodeId};
