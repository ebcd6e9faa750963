//! Model metadata registry
//!
//! Append-only map from model identity to its `Table`. Registration is
//! serialized by the write lock; lookups share the read lock.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use super::table::{ModelDef, Table};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::schema::{SchemaError, SchemaResult};

static GLOBAL: LazyLock<ModelRegistry> = LazyLock::new(ModelRegistry::new);

/// Registry of table descriptions keyed by model name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    tables: RwLock<HashMap<String, Arc<Table>>>,
    metrics: MetricsRegistry,
}

impl ModelRegistry {
    /// Creates an empty, independent registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ModelRegistry {
        &GLOBAL
    }

    /// Builds and registers the table for `def`.
    ///
    /// Registering a structurally identical table again returns the existing
    /// one.
    ///
    /// # Errors
    ///
    /// `ASTRO_INVALID_SPEC` if the declaration is inconsistent (see
    /// `Table::build`) or a different table is already registered under the
    /// same model name.
    pub fn register(&self, def: ModelDef) -> SchemaResult<Arc<Table>> {
        let model = def.model().to_string();
        let table = Table::build(def).map_err(|e| self.reject(&model, e))?;

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = tables.get(&model) {
            if **existing == table {
                log_event_with_fields(Event::ModelReregistered, &[("model", model.as_str())]);
                return Ok(Arc::clone(existing));
            }
            return Err(self.reject(
                &model,
                SchemaError::invalid_spec(format!(
                    "Model '{}' is already registered with a different table",
                    model
                )),
            ));
        }

        let table = Arc::new(table);
        tables.insert(model.clone(), Arc::clone(&table));
        self.metrics.increment_models_registered();
        log_event_with_fields(
            Event::ModelRegistered,
            &[
                ("model", model.as_str()),
                ("table", table.name()),
                ("primary_key", table.primary_key_name()),
            ],
        );
        Ok(table)
    }

    fn reject(&self, model: &str, err: SchemaError) -> SchemaError {
        self.metrics.increment_models_rejected();
        log_event_with_fields(Event::ModelRejected, &[("model", model), ("reason", err.message())]);
        err
    }

    /// Gets the table registered for `model`.
    pub fn get(&self, model: &str) -> Option<Arc<Table>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned()
    }

    /// Like `get`, failing with `ASTRO_UNKNOWN_MODEL`.
    pub fn table(&self, model: &str) -> SchemaResult<Arc<Table>> {
        self.get(model).ok_or_else(|| SchemaError::unknown_model(model))
    }

    pub fn contains(&self, model: &str) -> bool {
        self.get(model).is_some()
    }

    /// All registered tables, ordered by model name.
    pub fn tables(&self) -> Vec<Arc<Table>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<Arc<Table>> = tables.values().cloned().collect();
        all.sort_by(|a, b| a.model().cmp(b.model()));
        all
    }

    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}
