// Standard library
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

// 3rd party crates
use config::{Config, Environment, File};
use log::{error, info, LevelFilter};
use tokio::sync::RwLock;

// Project imports
use crate::admission::LimiterConfig;

// Current module imports
use super::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_PATH_ENV, DEFAULT_CONFIG, ENV_PREFIX, ENV_SEPARATOR,
};
use super::errors::{SettingsError, ValidationError};
use super::types::{
    default_log_level, default_monitor_interval, ConfigManager, Log, Monitor, Settings,
    ValidatedSettings,
};

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            interval_ms: default_monitor_interval(),
        }
    }
}

impl Settings {
    pub fn get_log_level(&self) -> String {
        self.log.level.to_lowercase()
    }

    pub fn get_monitor_interval(&self) -> u64 {
        self.monitor.interval_ms
    }

    pub fn get_limiter(&self) -> LimiterConfig {
        self.limiter.clone()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate log level
        match self.log.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ValidationError::InvalidLogLevel(self.log.level.clone())),
        }

        // Validate monitor interval
        if self.monitor.interval_ms == 0 {
            return Err(ValidationError::InvalidMonitorInterval(
                self.monitor.interval_ms,
            ));
        }

        // Limiter numbers are coerced when the limiter is built, not rejected here.
        Ok(())
    }
}

impl ConfigManager {
    /// Creates a new `ConfigManager` from the default configuration location.
    pub async fn new() -> Result<Self, SettingsError> {
        let config_path: PathBuf = Self::get_config_path()?;
        Self::from_path(config_path).await
    }

    /// Creates a `ConfigManager` from an explicit file, writing the default file if missing.
    pub async fn from_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        let created_default: bool = Self::ensure_config_file_exists(&config_path)?;

        let settings: Settings = Self::load_settings(&config_path)?;

        // Validate settings before proceeding
        let validated_settings = ValidatedSettings::new(settings).map_err(|e| {
            error!("Configuration validation failed: {}", e);
            e
        })?;

        Ok(ConfigManager {
            settings: Arc::new(RwLock::new(validated_settings.into_inner())),
            config_path,
            created_default,
        })
    }

    /// Determines the configuration file path.
    fn get_config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            Ok(PathBuf::from(path))
        } else if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        } else {
            error!("Could not determine the configuration directory");
            Err(SettingsError::NoConfigDir)
        }
    }

    /// Ensures that the configuration file exists, creating it if necessary.
    /// Returns whether the default file was written.
    fn ensure_config_file_exists(config_path: &Path) -> Result<bool, SettingsError> {
        if !config_path.exists() {
            if let Some(parent_dir) = config_path.parent() {
                fs::create_dir_all(parent_dir).map_err(|e| {
                    error!("Failed to create configuration directory: {}", e);
                    SettingsError::CreateDefault {
                        path: config_path.to_path_buf(),
                        source: e,
                    }
                })?;
            }
            fs::write(config_path, DEFAULT_CONFIG).map_err(|e| {
                error!("Failed to create default configuration file: {}", e);
                SettingsError::CreateDefault {
                    path: config_path.to_path_buf(),
                    source: e,
                }
            })?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Loads the settings from the configuration file and environment variables.
    fn load_settings(config_path: &Path) -> Result<Settings, SettingsError> {
        let config_file: &str = config_path.to_str().ok_or_else(|| {
            error!("Configuration file path contains invalid UTF-8 characters");
            SettingsError::InvalidPath(config_path.to_path_buf())
        })?;

        let settings: Config = Config::builder()
            .add_source(File::with_name(config_file))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reloads the configuration from the file.
    pub async fn reload(&self) -> Result<(), SettingsError> {
        let new_settings: Settings = Self::load_settings(&self.config_path)?;

        // Validate settings before updating
        let validated_settings = ValidatedSettings::new(new_settings).map_err(|e| {
            error!("Configuration validation failed during reload: {}", e);
            e
        })?;

        *self.settings.write().await = validated_settings.into_inner();
        self.adjust_logging_level().await;
        info!("Configuration reloaded from {:?}", self.config_path);
        Ok(())
    }

    /// Adjusts the `log` facade level based on the configuration.
    ///
    /// Call after the logging backend is installed, since installing it resets the level.
    pub async fn adjust_logging_level(&self) {
        let level: String = self.get_log_level().await;
        let level_filter: LevelFilter = match level.as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        };
        log::set_max_level(level_filter);
    }

    /// Provides a read-locked reference to the current settings.
    pub async fn get_settings(&self) -> tokio::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().await
    }

    pub async fn get_log_level(&self) -> String {
        self.settings.read().await.get_log_level()
    }

    pub async fn get_monitor_interval(&self) -> u64 {
        self.settings.read().await.get_monitor_interval()
    }

    pub async fn get_limiter(&self) -> LimiterConfig {
        self.settings.read().await.get_limiter()
    }
}

impl ValidatedSettings {
    pub fn new(settings: Settings) -> Result<Self, ValidationError> {
        settings.validate()?;
        Ok(ValidatedSettings(settings))
    }

    pub fn into_inner(self) -> Settings {
        self.0
    }
}

// Implement Deref to allow transparent access to Settings fields
impl std::ops::Deref for ValidatedSettings {
    type Target = Settings;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
