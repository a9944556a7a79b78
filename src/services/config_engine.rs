// Tabrefresh Config Engine
// Loads, validates, updates and saves the refresher configuration.
// The configuration is stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::platform;
use crate::types::config::{RefresherConfig, MIN_TICK_INTERVAL_MS};
use crate::types::errors::ConfigError;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "TABREFRESH_CONFIG";

/// Trait defining the config engine interface.
pub trait ConfigEngineTrait {
    fn load(&mut self) -> Result<RefresherConfig, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn get_config(&self) -> &RefresherConfig;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), ConfigError>;
    fn reset(&mut self) -> Result<(), ConfigError>;
    fn get_config_path(&self) -> &str;
}

/// Config engine persisting [`RefresherConfig`] as JSON on disk.
pub struct ConfigEngine {
    config_path: String,
    config: RefresherConfig,
}

impl ConfigEngine {
    /// Creates a new ConfigEngine.
    ///
    /// Path precedence: `path_override`, then `TABREFRESH_CONFIG`, then
    /// `config.json` in the platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| {
                platform::get_config_dir()
                    .join("config.json")
                    .to_string_lossy()
                    .to_string()
            });

        Self {
            config_path,
            config: RefresherConfig::default(),
        }
    }

    /// Where the state database lives under the current configuration.
    pub fn database_path(&self) -> PathBuf {
        match &self.config.database_path {
            Some(path) => PathBuf::from(path),
            None => platform::default_database_path(),
        }
    }

    fn validate(config: &RefresherConfig) -> Result<(), ConfigError> {
        if config.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::InvalidValue {
                key: "tick_interval_ms".to_string(),
                message: format!(
                    "{} is below the minimum of {}",
                    config.tick_interval_ms, MIN_TICK_INTERVAL_MS
                ),
            });
        }
        if config.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "log_filter".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigEngineTrait for ConfigEngine {
    /// Loads the config file. A missing file yields defaults; a malformed or
    /// out-of-range one is an error.
    fn load(&mut self) -> Result<RefresherConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.config = RefresherConfig::default();
            return Ok(self.config.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config file: {}", e)))?;

        let config: RefresherConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::Serialization(format!("Failed to parse config file: {}", e))
        })?;
        Self::validate(&config)?;

        self.config = config;
        Ok(self.config.clone())
    }

    /// Saves the current config, creating parent directories as needed.
    fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Io(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::Io(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config(&self) -> &RefresherConfig {
        &self.config
    }

    /// Updates a single top-level key, validates the result and saves it.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        let mut json_value = serde_json::to_value(&self.config).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })?;

        match json_value.as_object_mut() {
            Some(map) if map.contains_key(key) => {
                map.insert(key.to_string(), value);
            }
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "unknown config key".to_string(),
                });
            }
        }

        let new_config: RefresherConfig =
            serde_json::from_value(json_value).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Self::validate(&new_config)?;

        self.config = new_config;
        self.save()
    }

    fn reset(&mut self) -> Result<(), ConfigError> {
        self.config = RefresherConfig::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
