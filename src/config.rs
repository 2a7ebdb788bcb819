//! Configuration management for the tombola ledger
//!
//! Centralized configuration with validation, defaults, and environment
//! variable support.

use crate::errors::{ConfigurationError, TombolaResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TombolaConfig {
    pub storage: StorageConfig,
    pub prizes: PrizeConfig,
    /// Owner identity of the administrative system wallet used as the
    /// funding source for payouts. When unset, payouts are credited
    /// directly from an unbounded external source.
    pub system_wallet_owner: Option<String>,
    /// Path of the device-local anonymous wallet file.
    pub local_wallet_path: String,
}

/// Durable ledger storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Wipe the database on startup. Test and demo use only.
    pub clear_on_start: bool,
}

/// Chip prize per win pattern
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrizeConfig {
    pub row1: i64,
    pub row2: i64,
    pub row3: i64,
    pub corners: i64,
    pub full: i64,
}

impl Default for TombolaConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            prizes: PrizeConfig::default(),
            system_wallet_owner: None,
            local_wallet_path: "./tombola_data/local_wallet.json".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./tombola_data/ledger".to_string(),
            clear_on_start: false,
        }
    }
}

impl Default for PrizeConfig {
    fn default() -> Self {
        Self {
            row1: 500,
            row2: 400,
            row3: 300,
            corners: 1000,
            full: 5000,
        }
    }
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> TombolaResult<TombolaConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            TombolaConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> TombolaResult<TombolaConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into()
        })
    }

    fn apply_env_overrides(&self, config: &mut TombolaConfig) -> TombolaResult<()> {
        if let Ok(data_dir) = env::var("TOMBOLA_DATA_DIR") {
            config.storage.data_dir = data_dir;
        }
        if let Ok(path) = env::var("TOMBOLA_LOCAL_WALLET_PATH") {
            config.local_wallet_path = path;
        }
        if let Ok(owner) = env::var("TOMBOLA_SYSTEM_WALLET") {
            config.system_wallet_owner = if owner.is_empty() { None } else { Some(owner) };
        }
        if let Ok(clear) = env::var("TOMBOLA_CLEAR_ON_START") {
            config.storage.clear_on_start =
                clear.parse().map_err(|_| ConfigurationError::InvalidValue {
                    field: "TOMBOLA_CLEAR_ON_START".to_string(),
                    value: clear,
                    reason: "Invalid boolean value".to_string(),
                })?;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self, config: &TombolaConfig) -> TombolaResult<()> {
        if config.storage.data_dir.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_dir".to_string()).into());
        }

        if config.local_wallet_path.is_empty() {
            return Err(
                ConfigurationError::MissingRequired("local_wallet_path".to_string()).into(),
            );
        }

        for (field, value) in [
            ("prizes.row1", config.prizes.row1),
            ("prizes.row2", config.prizes.row2),
            ("prizes.row3", config.prizes.row3),
            ("prizes.corners", config.prizes.corners),
            ("prizes.full", config.prizes.full),
        ] {
            if value <= 0 {
                return Err(ConfigurationError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "Prize amount must be positive".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &TombolaConfig, path: &str) -> TombolaResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into()
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
