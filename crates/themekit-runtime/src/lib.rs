//! # themekit-runtime
//!
//! [`ThemeRuntime`] is the single context object a page builds at start-up.
//! It owns every registry and the navigation scheduler and hands them out by
//! reference, so themes and plugins never reach for globals.

pub mod runtime;

pub use runtime::ThemeRuntime;
