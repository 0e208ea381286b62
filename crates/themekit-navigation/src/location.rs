//! Page locations resolved against the site origin.

use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use themekit_core::error::{AppError, ErrorKind};
use themekit_core::result::AppResult;

/// Where the page currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Path plus search string, e.g. `/posts/1?tab=raw`. Two locations are
    /// the same navigation target exactly when their paths are equal.
    pub path: String,
    /// Path without the search string.
    pub pathname: String,
    /// Decoded query pairs; later duplicates win.
    pub query: Map<String, Value>,
}

impl Location {
    /// Resolves `href` (absolute, or relative to `origin`). Targets on
    /// another origin are rejected, as `history.pushState` does.
    pub fn resolve(origin: &str, href: &str) -> AppResult<Self> {
        let base = Url::parse(origin).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid site origin '{origin}'"),
                e,
            )
        })?;
        let url = base.join(href).map_err(|e| {
            AppError::with_source(
                ErrorKind::Navigation,
                format!("Invalid navigation target '{href}'"),
                e,
            )
        })?;
        if base.origin().is_tuple() && url.origin() != base.origin() {
            return Err(AppError::navigation(format!(
                "Navigation target '{href}' leaves origin '{origin}'"
            )));
        }
        Ok(Self::from_url(&url))
    }

    fn from_url(url: &Url) -> Self {
        let pathname = url.path().to_string();
        let path = match url.query() {
            Some(search) if !search.is_empty() => format!("{pathname}?{search}"),
            _ => pathname.clone(),
        };
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        Self {
            path,
            pathname,
            query,
        }
    }

    /// Query pairs as a JSON object.
    pub fn query_value(&self) -> Value {
        Value::Object(self.query.clone())
    }
}
