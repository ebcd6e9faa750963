//! Document store contract
//!
//! The session hands a store whole batches of external documents; the store
//! owns durability. `MemoryStore` is the in-process implementation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{StoreError, StoreResult};

/// External document store used by a `Session`.
pub trait DocumentStore {
    /// Creates the database if it does not exist.
    fn ensure_database(&mut self, name: &str) -> StoreResult<()>;

    /// Creates the table in `database` if it does not exist.
    fn ensure_table(&mut self, database: &str, table: &str) -> StoreResult<()>;

    /// Applies every insert and delete of `batch`.
    fn batch_write(&mut self, database: &str, batch: &WriteBatch) -> StoreResult<()>;

    /// Fetches the external document stored under `key`, if any.
    fn fetch(&self, database: &str, table: &str, key: &Value) -> StoreResult<Option<Map<String, Value>>>;
}

/// Upsert of one external document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOp {
    pub table: String,
    pub key: Value,
    pub document: Map<String, Value>,
}

/// Removal of the document stored under `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOp {
    pub table: String,
    pub key: Value,
}

/// Writes collected by one commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub inserts: Vec<InsertOp>,
    pub deletes: Vec<DeleteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, key: Value, document: Map<String, Value>) {
        self.inserts.push(InsertOp {
            table: table.into(),
            key,
            document,
        });
    }

    pub fn delete(&mut self, table: impl Into<String>, key: Value) {
        self.deletes.push(DeleteOp {
            table: table.into(),
            key,
        });
    }

    /// Number of operations in the batch
    pub fn len(&self) -> usize {
        self.inserts.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tables(&self) -> impl Iterator<Item = &str> {
        self.inserts
            .iter()
            .map(|op| op.table.as_str())
            .chain(self.deletes.iter().map(|op| op.table.as_str()))
    }
}

type Rows = BTreeMap<String, Map<String, Value>>;

/// In-memory store. Rows are keyed by the compact JSON of the primary key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    databases: BTreeMap<String, BTreeMap<String, Rows>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.databases.contains_key(name)
    }

    pub fn has_table(&self, database: &str, table: &str) -> bool {
        self.databases
            .get(database)
            .is_some_and(|tables| tables.contains_key(table))
    }

    /// Number of documents in a table, 0 if it does not exist.
    pub fn document_count(&self, database: &str, table: &str) -> usize {
        self.databases
            .get(database)
            .and_then(|tables| tables.get(table))
            .map_or(0, BTreeMap::len)
    }

    fn tables(&self, database: &str) -> StoreResult<&BTreeMap<String, Rows>> {
        self.databases
            .get(database)
            .ok_or_else(|| StoreError::UnknownDatabase(database.to_string()))
    }

    fn rows(&self, database: &str, table: &str) -> StoreResult<&Rows> {
        self.tables(database)?
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable {
                database: database.to_string(),
                table: table.to_string(),
            })
    }
}

impl DocumentStore for MemoryStore {
    fn ensure_database(&mut self, name: &str) -> StoreResult<()> {
        self.databases.entry(name.to_string()).or_default();
        Ok(())
    }

    fn ensure_table(&mut self, database: &str, table: &str) -> StoreResult<()> {
        self.databases
            .get_mut(database)
            .ok_or_else(|| StoreError::UnknownDatabase(database.to_string()))?
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    fn batch_write(&mut self, database: &str, batch: &WriteBatch) -> StoreResult<()> {
        // Every table must exist before anything is applied.
        for table in batch.tables() {
            self.rows(database, table)?;
        }

        let tables = self
            .databases
            .get_mut(database)
            .ok_or_else(|| StoreError::UnknownDatabase(database.to_string()))?;
        for op in &batch.inserts {
            if let Some(rows) = tables.get_mut(&op.table) {
                rows.insert(op.key.to_string(), op.document.clone());
            }
        }
        for op in &batch.deletes {
            if let Some(rows) = tables.get_mut(&op.table) {
                rows.remove(&op.key.to_string());
            }
        }
        Ok(())
    }

    fn fetch(&self, database: &str, table: &str, key: &Value) -> StoreResult<Option<Map<String, Value>>> {
        Ok(self.rows(database, table)?.get(&key.to_string()).cloned())
    }
}
