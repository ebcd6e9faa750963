//! Model instances
//!
//! A `Document` is the mutable state of one model instance. Every write goes
//! through the field's validator; reads of unset fields are errors. Unset
//! fields are absent from the state rather than null.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::field::Field;
use super::table::Table;
use crate::schema::{SchemaError, SchemaResult};

/// One instance of a registered model.
#[derive(Clone, PartialEq)]
pub struct Document {
    table: Arc<Table>,
    state: Map<String, Value>,
}

impl Document {
    /// Empty instance; nothing is set.
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            state: Map::new(),
        }
    }

    /// Instance with each value written through `set`, in order.
    ///
    /// # Errors
    ///
    /// The first failing write's error; no instance is returned.
    pub fn with_values<I, K, V>(table: Arc<Table>, values: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut doc = Self::new(table);
        for (name, value) in values {
            doc.set(name.as_ref(), value)?;
        }
        Ok(doc)
    }

    /// Instance whose state is `state` as given. The source is trusted: no
    /// field is validated.
    pub fn from_external(table: Arc<Table>, state: Map<String, Value>) -> Self {
        Self { table, state }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    /// The model identity of this instance
    pub fn model(&self) -> &str {
        self.table.model()
    }

    /// Raw state, unset fields absent
    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    fn declared(&self, name: &str) -> SchemaResult<&Field> {
        self.table
            .field(name)
            .ok_or_else(|| SchemaError::unknown_field(self.model(), name))
    }

    /// Reads a field.
    ///
    /// # Errors
    ///
    /// `ASTRO_UNKNOWN_FIELD` for an undeclared name, `ASTRO_FIELD_NOT_SET` if
    /// the field was never written.
    pub fn get(&self, name: &str) -> SchemaResult<&Value> {
        self.declared(name)?;
        self.state
            .get(name)
            .ok_or_else(|| SchemaError::field_not_set(name))
    }

    /// Reads a field, `None` when unset or undeclared.
    pub fn try_get(&self, name: &str) -> Option<&Value> {
        self.state.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.state.contains_key(name)
    }

    /// Writes a field after validating the value.
    ///
    /// On error the state is left exactly as it was.
    ///
    /// # Errors
    ///
    /// `ASTRO_UNKNOWN_FIELD` for an undeclared name, `ASTRO_VALIDATION_FAILED`
    /// if the value does not match the field's validator.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> SchemaResult<()> {
        let value = value.into();
        self.declared(name)?.validate(&value)?;
        self.state.insert(name.to_string(), value);
        Ok(())
    }

    /// Removes a field's value, returning it.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        self.state.remove(name)
    }

    /// The primary key value, if set and not null.
    pub fn primary_key(&self) -> Option<&Value> {
        self.state
            .get(self.table.primary_key_name())
            .filter(|v| !v.is_null())
    }

    /// External representation for the store.
    ///
    /// A copy of the state without the keys of required fields whose value is
    /// null. Every other null is kept, and keys the table does not declare are
    /// passed through.
    ///
    /// # Errors
    ///
    /// `ASTRO_FIELD_NOT_SET` if the primary key is unset or null; it is never
    /// dropped.
    pub fn to_external(&self) -> SchemaResult<Map<String, Value>> {
        if self.primary_key().is_none() {
            return Err(SchemaError::field_not_set(self.table.primary_key_name()));
        }
        Ok(self
            .state
            .iter()
            .filter(|(name, value)| {
                !(value.is_null() && self.table.field(name).is_some_and(Field::is_required))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }
}

/// Sorted, indented JSON of the state.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string_pretty(&self.state).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.from_external({})", self.model(), Value::Object(self.state.clone()))
    }
}
