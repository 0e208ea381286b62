//! Runtime configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a serde default, so an empty source yields
//! the documented defaults.

pub mod logging;
pub mod scheduler;
pub mod slots;

use serde::{Deserialize, Serialize};
use tracing::debug;

use self::logging::LoggingConfig;
use self::scheduler::SchedulerConfig;
use self::slots::SlotConfig;

use crate::error::AppError;

/// Root runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Site settings.
    #[serde(default)]
    pub site: SiteConfig,
    /// Hook registry settings.
    #[serde(default)]
    pub hooks: HookConfig,
    /// Slot rendering settings.
    #[serde(default)]
    pub slots: SlotConfig,
    /// Navigation-completion scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Site-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin used to resolve relative navigation paths.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Initial locale reported to `locale:change` listeners.
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            locale: default_locale(),
        }
    }
}

/// Hook registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Priority used when a caller does not supply one (lower runs first).
    #[serde(default = "default_priority")]
    pub default_priority: i32,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay and
    /// environment variables prefixed with `THEMEKIT__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("THEMEKIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        debug!(env = %env, "Runtime configuration sources merged");

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Load configuration from a single file, still honouring `THEMEKIT__*`
    /// environment overrides.
    pub fn from_file(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("THEMEKIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

fn default_origin() -> String {
    "http://localhost".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

/// Default hook and slot priority.
pub const DEFAULT_PRIORITY: i32 = 10;

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}
