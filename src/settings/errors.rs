// Standard library
use std::path::PathBuf;

// 3rd party crates
use config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid log level: {0}. Must be one of: error, warn, info, debug, trace")]
    InvalidLogLevel(String),
    #[error("Monitor interval must be greater than 0, got {0}")]
    InvalidMonitorInterval(u64),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
    #[error("Configuration file path contains invalid UTF-8 characters: {0:?}")]
    InvalidPath(PathBuf),
    #[error("Failed to create default configuration at {path:?}: {source}")]
    CreateDefault {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}
