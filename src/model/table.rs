//! Model declarations and table metadata
//!
//! `ModelDef` is the declarative description a caller builds; `Table` is the
//! immutable metadata derived from it at registration. `ModelRecord` is the
//! serialized form used by the loader.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::field::Field;
use crate::schema::{SchemaError, SchemaResult, Validator};

/// Declarative description of a model: its name, table name and fields in
/// declaration order.
#[derive(Debug, Clone)]
pub struct ModelDef {
    model: String,
    table: Option<String>,
    fields: Vec<(String, Field)>,
}

impl ModelDef {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Table name in the store; defaults to the model name.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Declares `field` under `attr`. An unnamed field is bound to `attr`
    /// when the model is registered.
    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.fields.push((attr.into(), field));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Registered metadata for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    model: String,
    name: String,
    fields: Vec<Field>,
    primary_key: usize,
    secondary_indexes: BTreeMap<String, usize>,
}

impl Table {
    /// Builds the table from a declaration: binds field names, normalizes
    /// every spec and finds the primary key.
    ///
    /// # Errors
    ///
    /// `ASTRO_INVALID_SPEC` if:
    /// - A field spec does not normalize
    /// - A field is already bound to another name or two fields share a name
    /// - No field, or more than one field, is the primary key
    pub fn build(def: ModelDef) -> SchemaResult<Self> {
        let ModelDef {
            model,
            table,
            fields: declared,
        } = def;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(declared.len());
        for (attr, mut field) in declared {
            let name = match field.name() {
                Some(name) => name.to_string(),
                None => {
                    field.bind(&attr)?;
                    attr
                }
            };
            if !seen.insert(name.clone()) {
                return Err(SchemaError::invalid_spec(format!(
                    "Model '{}' declares field '{}' twice",
                    model, name
                )));
            }
            field.validator().map_err(|e| {
                SchemaError::invalid_spec(format!(
                    "Field '{}.{}': {}",
                    model,
                    name,
                    e.message()
                ))
            })?;
            fields.push(field);
        }

        let keys: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_primary_key())
            .map(|(i, _)| i)
            .collect();
        let primary_key = match keys.as_slice() {
            [only] => *only,
            [] => {
                return Err(SchemaError::invalid_spec(format!(
                    "Model '{}' has no primary key field",
                    model
                )))
            }
            many => {
                let names: Vec<&str> = many.iter().filter_map(|&i| fields[i].name()).collect();
                return Err(SchemaError::invalid_spec(format!(
                    "Model '{}' has more than one primary key: {}",
                    model,
                    names.join(", ")
                )));
            }
        };

        let secondary_indexes = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_indexed())
            .filter_map(|(i, f)| f.name().map(|n| (n.to_string(), i)))
            .collect();

        Ok(Self {
            name: table.unwrap_or_else(|| model.clone()),
            model,
            fields,
            primary_key,
            secondary_indexes,
        })
    }

    /// The model identity this table was registered under
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The table name in the store
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == Some(name))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(Field::name)
    }

    pub fn primary_key_field(&self) -> &Field {
        &self.fields[self.primary_key]
    }

    pub fn primary_key_name(&self) -> &str {
        self.primary_key_field().name().unwrap_or_default()
    }

    /// Fields flagged for a secondary index, by name.
    pub fn secondary_indexes(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.secondary_indexes
            .iter()
            .map(|(name, &i)| (name.as_str(), &self.fields[i]))
    }

    pub fn to_record(&self) -> ModelRecord {
        ModelRecord {
            model: self.model.clone(),
            table: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| FieldRecord {
                    name: f.name().unwrap_or_default().to_string(),
                    // Every field was normalized in `build`.
                    validator: f.validator().cloned().unwrap_or(Validator::Whatever),
                    required: f.is_required(),
                    primary_key: f.is_primary_key(),
                    indexed: f.is_indexed(),
                })
                .collect(),
        }
    }
}

/// Serialized model definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model: String,
    pub table: String,
    pub fields: Vec<FieldRecord>,
}

/// Serialized field definition, validator already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub validator: Validator,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub indexed: bool,
}

impl ModelRecord {
    pub fn into_definition(self) -> ModelDef {
        let mut def = ModelDef::new(self.model).table(self.table);
        for record in self.fields {
            let mut field = Field::from_validator(record.validator);
            if record.required {
                field = field.required();
            }
            if record.primary_key {
                field = field.primary_key();
            }
            if record.indexed {
                field = field.indexed();
            }
            def = def.field(record.name, field);
        }
        def
    }
}
