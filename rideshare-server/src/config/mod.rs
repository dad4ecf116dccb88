//! Configuration module for rideshare-server.
//!
//! Handles loading configuration from TOML files and CLI arguments.

pub mod file;

use crate::config::file::{DispatchSection, FileConfig};
use rideshare_core::config::DispatchConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub dispatch: DispatchConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read, override, validate and convert the configuration file.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.parse(&config_content)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn parse(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config.dispatch)?;

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            dispatch: convert_dispatch(&file_config.dispatch),
        })
    }
}

fn validate(dispatch: &DispatchSection) -> Result<(), ConfigError> {
    if dispatch.offer_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.offer_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if dispatch.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.sweep_interval_secs must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn convert_dispatch(d: &DispatchSection) -> DispatchConfig {
    DispatchConfig {
        offer_timeout: Duration::from_secs(d.offer_timeout_secs),
        ride_retention: d.ride_retention_secs.map(Duration::from_secs),
        sweep_interval: Duration::from_secs(d.sweep_interval_secs),
    }
}
