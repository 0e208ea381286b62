//! # themekit-core
//!
//! Core crate for Themekit. Contains configuration schemas, the well-known
//! hook and event names shared by themes and plugins, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other Themekit crates.

pub mod config;
pub mod error;
pub mod names;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
