//! Configuration module for pgevents-demo.
//!
//! Handles loading configuration from an optional TOML file, CLI arguments,
//! and the `DATABASE_URL` environment variable.

pub mod file;

use crate::config::file::FileConfig;
use pgevents_core::ListenerConfig;
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

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Settings for the periodic row writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub table: String,
    pub interval: Duration,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listener: ListenerConfig,
    pub writer: WriterConfig,
}

/// CLI values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub table: Option<String>,
    pub interval_secs: Option<u64>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: Option<impl AsRef<Path>>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if one was given
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Combine it with `DATABASE_URL`
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = self.read_file()?;
        self.build(file_config, get_database_url()?)
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match &self.config_path {
            Some(path) => {
                let config_content = std::fs::read_to_string(path)?;
                Ok(toml::from_str(&config_content)?)
            }
            None => Ok(FileConfig::default()),
        }
    }

    fn build(
        &self,
        mut file_config: FileConfig,
        database_url: String,
    ) -> Result<LoadedConfig, ConfigError> {
        if let Some(table) = &self.overrides.table {
            file_config.writer.table = table.clone();
        }
        if let Some(interval_secs) = self.overrides.interval_secs {
            file_config.writer.interval_secs = interval_secs;
        }

        if file_config.writer.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "writer interval must be at least one second".to_string(),
            ));
        }

        let listener = ListenerConfig {
            database_url,
            min_reconnect_interval_secs: file_config.listener.min_reconnect_interval_secs,
            max_reconnect_interval_secs: file_config.listener.max_reconnect_interval_secs,
            application_name: file_config.listener.application_name,
        };
        listener
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(LoadedConfig {
            listener,
            writer: WriterConfig {
                table: file_config.writer.table,
                interval: Duration::from_secs(file_config.writer.interval_secs),
            },
        })
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
