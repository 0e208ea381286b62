//! Unified application error types for Themekit.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A hook filter failed or the hook pipeline was misused.
    Hook,
    /// An event listener failed.
    Event,
    /// A shortcode handler failed or its pattern could not be evaluated.
    Shortcode,
    /// A slot could not be rendered.
    Slot,
    /// A DOM operation failed (unknown node, malformed markup, bad selector).
    Dom,
    /// A navigation could not be processed.
    Navigation,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hook => write!(f, "HOOK"),
            Self::Event => write!(f, "EVENT"),
            Self::Shortcode => write!(f, "SHORTCODE"),
            Self::Slot => write!(f, "SLOT"),
            Self::Dom => write!(f, "DOM"),
            Self::Navigation => write!(f, "NAVIGATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Themekit.
///
/// Hook filters, event listeners and shortcode handlers all report failures
/// with this type, so a plugin author only ever has one error to construct.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a hook error.
    pub fn hook(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Hook, message)
    }

    /// Create an event error.
    pub fn event(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Event, message)
    }

    /// Create a shortcode error.
    pub fn shortcode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shortcode, message)
    }

    /// Create a slot error.
    pub fn slot(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Slot, message)
    }

    /// Create a DOM error.
    pub fn dom(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Dom, message)
    }

    /// Create a navigation error.
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Navigation, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

impl From<fancy_regex::Error> for AppError {
    fn from(err: fancy_regex::Error) -> Self {
        Self::with_source(
            ErrorKind::Shortcode,
            format!("Pattern evaluation error: {err}"),
            err,
        )
    }
}
