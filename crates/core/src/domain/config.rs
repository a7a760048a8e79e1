//! Engine configuration
//!
//! This module provides:
//! - `EngineConfig`: render settings plus a snapshot of the chain settings
//! - TOML load/save via `tokio::fs`
//! - The default per-user config location
//!
//! The chain snapshot never reaches the stages directly; it is converted to
//! control messages, so configuration and live control share one path.

use crate::domain::control::ControlMessage;
use crate::domain::pipeline::ChainSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Frames per rendered block
    pub block_size: usize,

    /// Capacity of the control queue toward the render thread
    pub queue_capacity: usize,

    /// Initial settings of every stage
    pub chain: ChainSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 128,
            queue_capacity: 64,
            chain: ChainSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_toml()?).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that cannot drive a render loop
    ///
    /// Stage parameters are not checked here; they are clamped when applied.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".to_string()));
        }
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be positive".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Control messages that bring a fresh pipeline to this configuration
    pub fn to_messages(&self) -> Vec<ControlMessage> {
        self.chain.to_messages(self.sample_rate as f32)
    }

    /// Get the default config file location
    ///
    /// Returns `~/.config/cadence/config.toml` on Linux,
    /// `%APPDATA%\cadence\config.toml` on Windows
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("cadence").join("config.toml"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }
}
