//! Spec shorthand
//!
//! A `Spec` is the compact description a model author writes. Each accepted
//! shape has its own constructor, so normalization is a plain match with no
//! order-dependent fallbacks.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Number, Value};

use super::errors::{SchemaError, SchemaResult};
use super::types::{PrimitiveKind, Validator};

/// Conversion hook for caller-defined shapes.
pub trait ToValidator: Send + Sync {
    fn to_validator(&self) -> SchemaResult<Validator>;

    /// Name shown in `Debug` output and error messages.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Shorthand for an expected shape, before normalization.
#[derive(Clone)]
pub enum Spec {
    /// An already-built validator, used as is
    Validator(Validator),
    /// A caller-defined conversion
    Convert(Arc<dyn ToValidator>),
    /// The "no spec" marker
    Any,
    /// A primitive type tag
    Type(PrimitiveKind),
    /// An exact value
    Literal(Value),
    /// The one-element list shorthand `[X]`: any number of X
    Repeated(Box<Spec>),
    /// Explicit fixed-arity positional array
    Sequence(Vec<Spec>),
    /// A set of allowed literal values
    Set(Vec<Value>),
    /// An object shape, in declaration order
    Mapping(Vec<(String, Spec)>),
    /// Null or the inner shape
    Nullable(Box<Spec>),
    /// Any of the alternatives
    AnyOf(Vec<Spec>),
}

impl Spec {
    /// `[X]`: an array whose elements all match `element`.
    pub fn list(element: impl Into<Spec>) -> Self {
        Spec::Repeated(Box::new(element.into()))
    }

    pub fn sequence<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Spec>,
    {
        Spec::Sequence(elements.into_iter().map(Into::into).collect())
    }

    /// `{a, b, c}`: one of the given literal values.
    pub fn set<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Spec::Set(values.into_iter().map(Into::into).collect())
    }

    pub fn object<I, K, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<Spec>,
    {
        Spec::Mapping(
            fields
                .into_iter()
                .map(|(k, s)| (k.into(), s.into()))
                .collect(),
        )
    }

    pub fn nullable(inner: impl Into<Spec>) -> Self {
        Spec::Nullable(Box::new(inner.into()))
    }

    pub fn any_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Spec>,
    {
        Spec::AnyOf(options.into_iter().map(Into::into).collect())
    }

    pub fn convert(conversion: impl ToValidator + 'static) -> Self {
        Spec::Convert(Arc::new(conversion))
    }

    /// Literal from any serializable value, canonicalized eagerly.
    pub fn literal<T: Serialize + ?Sized>(value: &T) -> SchemaResult<Self> {
        Ok(Spec::Literal(canonicalize(value)?))
    }

    /// Float literal; NaN and infinities have no JSON form and are rejected.
    pub fn float(value: f64) -> SchemaResult<Self> {
        Number::from_f64(value)
            .map(|n| Spec::Literal(Value::Number(n)))
            .ok_or_else(|| {
                SchemaError::invalid_spec(format!("{} is not representable as a literal", value))
            })
    }
}

/// Canonical JSON form of a literal: serialize, then parse back.
///
/// Only values serde_json can write as text survive.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> SchemaResult<Value> {
    let text = serde_json::to_string(value).map_err(|e| {
        SchemaError::invalid_spec(format!(
            "{} isn't valid in a spec: {}",
            std::any::type_name::<T>(),
            e
        ))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        SchemaError::invalid_spec(format!("{} isn't valid in a spec: {}", text, e))
    })
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Validator(v) => f.debug_tuple("Validator").field(v).finish(),
            Spec::Convert(c) => f.debug_tuple("Convert").field(&c.describe()).finish(),
            Spec::Any => f.write_str("Any"),
            Spec::Type(kind) => f.debug_tuple("Type").field(kind).finish(),
            Spec::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Spec::Repeated(inner) => f.debug_tuple("Repeated").field(inner).finish(),
            Spec::Sequence(elements) => f.debug_tuple("Sequence").field(elements).finish(),
            Spec::Set(values) => f.debug_tuple("Set").field(values).finish(),
            Spec::Mapping(fields) => f.debug_tuple("Mapping").field(fields).finish(),
            Spec::Nullable(inner) => f.debug_tuple("Nullable").field(inner).finish(),
            Spec::AnyOf(options) => f.debug_tuple("AnyOf").field(options).finish(),
        }
    }
}

impl From<Validator> for Spec {
    fn from(v: Validator) -> Self {
        Spec::Validator(v)
    }
}

impl From<PrimitiveKind> for Spec {
    fn from(kind: PrimitiveKind) -> Self {
        Spec::Type(kind)
    }
}

impl From<Value> for Spec {
    fn from(value: Value) -> Self {
        Spec::Literal(value)
    }
}

impl From<&str> for Spec {
    fn from(value: &str) -> Self {
        Spec::Literal(Value::from(value))
    }
}

impl From<String> for Spec {
    fn from(value: String) -> Self {
        Spec::Literal(Value::from(value))
    }
}

impl From<i64> for Spec {
    fn from(value: i64) -> Self {
        Spec::Literal(Value::from(value))
    }
}

impl From<bool> for Spec {
    fn from(value: bool) -> Self {
        Spec::Literal(Value::from(value))
    }
}

impl<T: Into<Spec>> From<Option<T>> for Spec {
    /// `None` is the "no spec" marker.
    fn from(value: Option<T>) -> Self {
        value.map_or(Spec::Any, Into::into)
    }
}
