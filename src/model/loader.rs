//! Model definitions on disk
//!
//! - One file per model at `<models_dir>/model_<model>.json`
//! - Files hold a `ModelRecord` with normalized validators
//! - Unreadable or malformed files fail the whole load (FATAL)
//! - Saved definitions are not overwritten with different content

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::registry::ModelRegistry;
use super::table::{ModelRecord, Table};
use crate::config::AstrologyConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{SchemaError, SchemaResult};

/// Reads and writes model definition files.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    models_dir: PathBuf,
}

impl ModelLoader {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Loader over the configured `models_dir`, `None` if none is set.
    pub fn from_config(config: &AstrologyConfig) -> Option<Self> {
        config.models_dir.as_deref().map(Self::new)
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Path of the definition file for `model`.
    pub fn path_for(&self, model: &str) -> PathBuf {
        self.models_dir.join(format!("model_{}.json", model))
    }

    /// Registers every `*.json` definition in the directory, in path order.
    ///
    /// A missing directory is created and yields no models.
    ///
    /// # Errors
    ///
    /// `ASTRO_MALFORMED_MODEL_FILE` for I/O or parse failures; registration
    /// errors as returned by `ModelRegistry::register`.
    pub fn load_all(&self, registry: &ModelRegistry) -> SchemaResult<Vec<Arc<Table>>> {
        let dir = self.models_dir.display().to_string();
        if !self.models_dir.exists() {
            fs::create_dir_all(&self.models_dir).map_err(|e| {
                SchemaError::malformed_model_file(&dir, format!("Failed to create models directory: {}", e))
            })?;
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.models_dir).map_err(|e| {
            SchemaError::malformed_model_file(&dir, format!("Failed to read models directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| {
                    SchemaError::malformed_model_file(&dir, format!("Failed to read directory entry: {}", e))
                })?
                .path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut tables = Vec::with_capacity(paths.len());
        for path in &paths {
            let record = Self::load_file(path)?;
            tables.push(registry.register(record.into_definition())?);
        }

        let count = tables.len().to_string();
        log_event_with_fields(Event::ModelsLoaded, &[("dir", dir.as_str()), ("count", count.as_str())]);
        Ok(tables)
    }

    /// Parses one definition file.
    pub fn load_file(path: &Path) -> SchemaResult<ModelRecord> {
        let shown = path.display().to_string();
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::malformed_model_file(&shown, format!("Failed to read file: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| SchemaError::malformed_model_file(&shown, format!("Invalid JSON: {}", e)))
    }

    /// Writes the definition of `table`.
    ///
    /// Saving a definition identical to the one on disk is a no-op.
    ///
    /// # Errors
    ///
    /// `ASTRO_INVALID_SPEC` if a different definition is already saved for
    /// the model; `ASTRO_MALFORMED_MODEL_FILE` for I/O failures.
    pub fn save(&self, table: &Table) -> SchemaResult<PathBuf> {
        let path = self.path_for(table.model());
        let shown = path.display().to_string();
        let record = table.to_record();

        if path.exists() {
            if Self::load_file(&path)? == record {
                return Ok(path);
            }
            return Err(SchemaError::invalid_spec(format!(
                "Model '{}' is already saved with a different definition at {}",
                table.model(),
                shown
            )));
        }

        fs::create_dir_all(&self.models_dir).map_err(|e| {
            SchemaError::malformed_model_file(
                self.models_dir.display().to_string(),
                format!("Failed to create models directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| SchemaError::malformed_model_file(&shown, format!("Failed to serialize model: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| SchemaError::malformed_model_file(&shown, format!("Failed to write file: {}", e)))?;

        log_event_with_fields(Event::ModelSaved, &[("model", table.model()), ("path", shown.as_str())]);
        Ok(path)
    }
}
