// Standard library
use std::path::PathBuf;
use std::sync::Arc;

// 3rd party crates
use serde::Deserialize;
use tokio::sync::RwLock;

// Project imports
use crate::admission::LimiterConfig;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Monitor {
    #[serde(default = "default_monitor_interval")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub monitor: Monitor,
    #[serde(default)]
    pub limiter: LimiterConfig,
}

/// Settings that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedSettings(pub(super) Settings);

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_monitor_interval() -> u64 {
    5000 // 5 seconds
}

/// Manages the application settings, allowing for loading and reloading configurations.
pub struct ConfigManager {
    pub settings: Arc<RwLock<Settings>>,
    pub config_path: PathBuf,
    /// Whether the default file was written while loading
    pub created_default: bool,
}
