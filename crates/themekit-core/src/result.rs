//! Convenience result type alias for Themekit.

use crate::error::AppError;

/// A specialized `Result` type for Themekit operations.
pub type AppResult<T> = Result<T, AppError>;
