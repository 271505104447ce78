//! JSON file persistence for [`SimulationConfig`].
//!
//! The file holds pretty-printed camelCase JSON, the same shape the HTTP
//! `/api/config` route accepts.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use ticket_pool_core::SimulationConfig;

/// Errors from loading or saving the configuration file.
#[derive(Error, Debug)]
pub enum ConfigStoreError {
    /// The file could not be read or written
    #[error("Configuration file I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The file content is not a valid configuration
    #[error("Configuration file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads and saves the simulation configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store backed by `path`. Nothing is read until [`load`](Self::load).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the configuration file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigStoreError::Io`] if the file cannot be read (including
    /// when it does not exist) and [`ConfigStoreError::Json`] if it cannot be
    /// parsed.
    pub async fn load(&self) -> Result<SimulationConfig, ConfigStoreError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the configuration file, falling back to defaults.
    ///
    /// A missing or unreadable file is logged as a warning.
    pub async fn load_or_default(&self) -> SimulationConfig {
        match self.load().await {
            Ok(config) => {
                tracing::info!(path = %self.path.display(), "Configuration loaded");
                config
            }
            Err(ConfigStoreError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Configuration file not found, using defaults");
                SimulationConfig::default()
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Error loading configuration, using defaults");
                SimulationConfig::default()
            }
        }
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigStoreError`] if the file cannot be serialized or
    /// written.
    pub async fn save(&self, config: &SimulationConfig) -> Result<(), ConfigStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(config)?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }
}
