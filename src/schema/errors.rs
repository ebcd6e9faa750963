//! Schema error types
//!
//! Error codes:
//! - ASTRO_INVALID_SPEC (FATAL)
//! - ASTRO_VALIDATION_FAILED (REJECT)
//! - ASTRO_FIELD_NOT_SET (REJECT)
//! - ASTRO_UNKNOWN_FIELD (REJECT)
//! - ASTRO_UNKNOWN_MODEL (REJECT)
//! - ASTRO_MALFORMED_MODEL_FILE (FATAL)

use std::fmt;

use serde_json::Value;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The offending call is rejected, nothing was changed
    Reject,
    /// The schema itself is wrong; a programming error surfaced at declaration time
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Shorthand is malformed or a model declaration is inconsistent
    AstroInvalidSpec,
    /// A value does not satisfy a field's validator
    AstroValidationFailed,
    /// A field was read before it was ever written
    AstroFieldNotSet,
    /// The table does not declare the requested field
    AstroUnknownField,
    /// No table is registered for the model
    AstroUnknownModel,
    /// A persisted model definition could not be read
    AstroMalformedModelFile,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::AstroInvalidSpec => "ASTRO_INVALID_SPEC",
            SchemaErrorCode::AstroValidationFailed => "ASTRO_VALIDATION_FAILED",
            SchemaErrorCode::AstroFieldNotSet => "ASTRO_FIELD_NOT_SET",
            SchemaErrorCode::AstroUnknownField => "ASTRO_UNKNOWN_FIELD",
            SchemaErrorCode::AstroUnknownModel => "ASTRO_UNKNOWN_MODEL",
            SchemaErrorCode::AstroMalformedModelFile => "ASTRO_MALFORMED_MODEL_FILE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::AstroInvalidSpec | SchemaErrorCode::AstroMalformedModelFile => {
                Severity::Fatal
            }
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Path to the mismatch inside the value (e.g., "address.city", "numbers[1]", "$")
    pub path: String,
    /// Description of the expected shape
    pub expected: String,
    /// JSON kind of the value actually found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: impl Into<String>, actual: &Value) -> Self {
        Self::new(path, expected, json_type_name(actual))
    }

    pub fn length_mismatch(path: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::new(
            path,
            format!("array of {} elements", expected),
            format!("array of {} elements", actual),
        )
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at '{}': expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Field name if applicable
    field: Option<String>,
    /// Rejected value for validation failures
    value: Option<Value>,
    details: Option<ValidationDetails>,
}

impl SchemaError {
    fn bare(code: SchemaErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            field: None,
            value: None,
            details: None,
        }
    }

    /// Create an invalid spec error
    pub fn invalid_spec(reason: impl Into<String>) -> Self {
        Self::bare(SchemaErrorCode::AstroInvalidSpec, reason.into())
    }

    /// Create a validation failed error for a write to `field`
    ///
    /// `shape` is the description of the field's whole validator; `details`
    /// locate the innermost mismatch.
    pub fn validation_failed(
        field: impl Into<String>,
        value: Value,
        shape: impl fmt::Display,
        details: ValidationDetails,
    ) -> Self {
        let field = field.into();
        Self {
            code: SchemaErrorCode::AstroValidationFailed,
            message: format!(
                "{} did not validate against {} for '{}': {}",
                value, shape, field, details
            ),
            field: Some(field),
            value: Some(value),
            details: Some(details),
        }
    }

    /// Create a field not set error
    pub fn field_not_set(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{}' has not been set", field),
            field: Some(field),
            ..Self::bare(SchemaErrorCode::AstroFieldNotSet, String::new())
        }
    }

    /// Create an unknown field error
    pub fn unknown_field(model: &str, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Model '{}' declares no field '{}'", model, field),
            field: Some(field),
            ..Self::bare(SchemaErrorCode::AstroUnknownField, String::new())
        }
    }

    /// Create an unknown model error
    pub fn unknown_model(model: &str) -> Self {
        Self::bare(
            SchemaErrorCode::AstroUnknownModel,
            format!("Model '{}' is not registered", model),
        )
    }

    /// Create an error for a malformed model definition file
    pub fn malformed_model_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::bare(
            SchemaErrorCode::AstroMalformedModelFile,
            format!("Malformed model file '{}': {}", path.into(), reason.into()),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the rejected value for validation failures
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns validation details if applicable
    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    /// Returns whether this error indicates a broken schema declaration
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
