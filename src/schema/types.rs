//! Validator tree definitions
//!
//! Supported shapes:
//! - whatever: no constraint
//! - primitive: string, int, float, bool
//! - literal: one exact JSON value
//! - nullable: null or an inner shape
//! - any_of: one of several alternatives
//! - sequence: fixed-arity positional array
//! - repeated: homogeneous array
//! - structural: open-world object
//! - pattern: string matching a regular expression

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::shorthand::canonicalize;

/// The four primitive type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// UTF-8 string
    String,
    /// Integer (signed or unsigned 64-bit)
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
}

impl PrimitiveKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Bool => "bool",
        }
    }

    /// Whether the runtime JSON kind of `value` is exactly this kind.
    ///
    /// No coercion: an integral number is not a float and a float with no
    /// fractional part is not an int.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PrimitiveKind::String => value.is_string(),
            PrimitiveKind::Int => value.is_i64() || value.is_u64(),
            PrimitiveKind::Float => value.is_f64(),
            PrimitiveKind::Bool => value.is_boolean(),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A compiled regular expression matched at the start of a string.
///
/// Serialized as its source text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles `source`; the match is anchored at the start of the candidate.
    pub fn new(source: impl Into<String>) -> SchemaResult<Self> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})", source)).map_err(|e| {
            SchemaError::invalid_spec(format!("Invalid pattern '{}': {}", source, e))
        })?;
        Ok(Self { source, regex })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(source).map_err(|e| serde::de::Error::custom(e.message().to_string()))
    }
}

const UUID_PATTERN: &str =
    r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

static UUID: LazyLock<Pattern> =
    LazyLock::new(|| Pattern::new(UUID_PATTERN).expect("UUID pattern compiles"));

/// A node of the validator tree.
///
/// Nodes are immutable once built. Evaluation lives in `validator.rs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Validator {
    /// Always matches
    Whatever,
    /// Matches values of exactly one primitive kind
    Primitive { kind: PrimitiveKind },
    /// Matches one canonical JSON value
    Literal { value: Value },
    /// Matches null or the inner validator
    Nullable { inner: Box<Validator> },
    /// Matches if any option matches
    AnyOf { options: Vec<Validator> },
    /// Fixed-arity array, element `i` checked against `elements[i]`
    Sequence { elements: Vec<Validator> },
    /// Homogeneous array of any length
    Repeated { element: Box<Validator> },
    /// Object whose declared keys, when present, match; other keys are ignored
    Structural { fields: BTreeMap<String, Validator> },
    /// String matching a regular expression
    Pattern { pattern: Pattern },
}

impl Validator {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Validator::Primitive { kind }
    }

    /// Literal after a serialize/deserialize round trip.
    pub fn literal<T: Serialize + ?Sized>(value: &T) -> SchemaResult<Self> {
        Ok(Validator::Literal {
            value: canonicalize(value)?,
        })
    }

    pub fn nullable(inner: Validator) -> Self {
        Validator::Nullable {
            inner: Box::new(inner),
        }
    }

    pub fn any_of(options: Vec<Validator>) -> Self {
        Validator::AnyOf { options }
    }

    /// `AnyOf` over literal alternatives.
    pub fn enumeration<I, T>(values: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let options = values
            .into_iter()
            .map(|v| Validator::literal(&v))
            .collect::<SchemaResult<Vec<_>>>()?;
        if options.is_empty() {
            return Err(SchemaError::invalid_spec("An enumeration needs at least one value"));
        }
        Ok(Validator::AnyOf { options })
    }

    pub fn sequence(elements: Vec<Validator>) -> Self {
        Validator::Sequence { elements }
    }

    pub fn repeated(element: Validator) -> Self {
        Validator::Repeated {
            element: Box::new(element),
        }
    }

    pub fn structural<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Validator)>,
        K: Into<String>,
    {
        Validator::Structural {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn pattern(source: &str) -> SchemaResult<Self> {
        Ok(Validator::Pattern {
            pattern: Pattern::new(source)?,
        })
    }

    /// Lower- or upper-case hyphenated UUID strings.
    pub fn uuid() -> Self {
        Validator::Pattern {
            pattern: UUID.clone(),
        }
    }

    /// Returns the variant name
    pub fn kind_name(&self) -> &'static str {
        match self {
            Validator::Whatever => "whatever",
            Validator::Primitive { .. } => "primitive",
            Validator::Literal { .. } => "literal",
            Validator::Nullable { .. } => "nullable",
            Validator::AnyOf { .. } => "any_of",
            Validator::Sequence { .. } => "sequence",
            Validator::Repeated { .. } => "repeated",
            Validator::Structural { .. } => "structural",
            Validator::Pattern { .. } => "pattern",
        }
    }
}

/// Human-readable description of the expected shape.
impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Whatever => f.write_str("anything"),
            Validator::Primitive { kind } => write!(f, "{}", kind),
            Validator::Literal { value } => write!(f, "{}", value),
            Validator::Nullable { inner } => write!(f, "Nullable({})", inner),
            Validator::AnyOf { options } => {
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", option)?;
                }
                Ok(())
            }
            Validator::Sequence { elements } => {
                f.write_str("(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str(")")
            }
            Validator::Repeated { element } => write!(f, "[{}]", element),
            Validator::Structural { fields } => {
                f.write_str("{")?;
                for (i, (name, validator)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, validator)?;
                }
                f.write_str("}")
            }
            Validator::Pattern { pattern } => write!(f, "/{}/", pattern.as_str()),
        }
    }
}
