//! Configuration
//!
//! JSON file with:
//! - `database` (required): name of the database sessions write to
//! - `models_dir` (optional): where model definitions are saved and loaded
//! - `ensure_on_open` (optional, default true): ensure the database exists
//!   when a session opens

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid JSON for this structure
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Config parsed but a value is not allowed
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Crate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstrologyConfig {
    /// Database name (required)
    pub database: String,

    /// Model definitions directory (optional)
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    /// Ensure the database when a session opens (optional, default true)
    #[serde(default = "default_ensure_on_open")]
    pub ensure_on_open: bool,
}

fn default_ensure_on_open() -> bool {
    true
}

impl AstrologyConfig {
    /// Config for `database` with every optional value at its default.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            models_dir: None,
            ensure_on_open: default_ensure_on_open(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", path.display().to_string().as_str()), ("database", config.database.as_str())],
        );
        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: AstrologyConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Database names are non-empty ASCII letters, digits and underscores.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.is_empty() {
            return Err(ConfigError::Invalid("database must not be empty".into()));
        }
        if !self
            .database
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid(format!(
                "Invalid database name: '{}'. Only letters, digits and '_' are allowed.",
                self.database
            )));
        }
        if self.models_dir.as_deref() == Some(Path::new("")) {
            return Err(ConfigError::Invalid("models_dir must not be empty".into()));
        }
        Ok(())
    }
}
