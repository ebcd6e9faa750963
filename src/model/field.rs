//! Field descriptors
//!
//! A `Field` is a named, validated slot on a model. Its name is bound once,
//! either explicitly or by the registry from the name it was declared under.
//! Its spec is normalized at most once; the validator is memoized.

use std::sync::OnceLock;

use serde_json::Value;

use crate::schema::{normalize, SchemaError, SchemaResult, Spec, Validator};

/// A top level field of a model.
#[derive(Debug, Clone)]
pub struct Field {
    name: Option<String>,
    spec: Spec,
    validator: OnceLock<Validator>,
    required: bool,
    primary_key: bool,
    indexed: bool,
}

impl Field {
    /// Unnamed, optional, non-key field.
    pub fn new(spec: impl Into<Spec>) -> Self {
        Self {
            name: None,
            spec: spec.into(),
            validator: OnceLock::new(),
            required: false,
            primary_key: false,
            indexed: false,
        }
    }

    /// Field with an explicit name, independent of the declaring attribute.
    pub fn named(name: impl Into<String>, spec: impl Into<Spec>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(spec)
        }
    }

    /// Field around an already-normalized validator.
    pub fn from_validator(validator: Validator) -> Self {
        Self {
            validator: OnceLock::from(validator.clone()),
            ..Self::new(Spec::Validator(validator))
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Flag the field for a secondary index.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Binds the field's name.
    ///
    /// Binding the same name again is a no-op; binding a different name
    /// fails with `ASTRO_INVALID_SPEC`.
    pub fn bind(&mut self, name: &str) -> SchemaResult<()> {
        match &self.name {
            None => {
                self.name = Some(name.to_string());
                Ok(())
            }
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(SchemaError::invalid_spec(format!(
                "Field '{}' is already bound and cannot be rebound to '{}'",
                existing, name
            ))),
        }
    }

    /// The bound name, `None` before binding.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// The normalized validator, computed on first use.
    pub fn validator(&self) -> SchemaResult<&Validator> {
        if let Some(validator) = self.validator.get() {
            return Ok(validator);
        }
        let validator = normalize(&self.spec)?;
        Ok(self.validator.get_or_init(|| validator))
    }

    /// Checks a value about to be written to this field.
    ///
    /// # Errors
    ///
    /// `ASTRO_VALIDATION_FAILED` carrying the rejected value and the expected
    /// shape; `ASTRO_INVALID_SPEC` if the spec does not normalize.
    pub fn validate(&self, value: &Value) -> SchemaResult<()> {
        let validator = self.validator()?;
        validator.check(value).map_err(|details| {
            SchemaError::validation_failed(
                self.name().unwrap_or("<unbound>"),
                value.clone(),
                validator,
                details,
            )
        })
    }
}

/// Fields are equal when bound to the same name with the same flags and
/// equal normalized validators.
impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.required == other.required
            && self.primary_key == other.primary_key
            && self.indexed == other.indexed
            && match (self.validator(), other.validator()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
    }
}
