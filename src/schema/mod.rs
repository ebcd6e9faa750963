//! Schema subsystem: shorthand, normalization and the validator tree
//!
//! # Design Principles
//!
//! - Validators are immutable once built
//! - Normalization never mutates its input and is deterministic
//! - Validation is pure and total: malformed input yields `false`, never a panic
//! - No coercion between primitive kinds

mod errors;
mod normalizer;
mod shorthand;
mod types;
mod validator;

pub use errors::{json_type_name, SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails};
pub use normalizer::{normalize, NULL_SPEC_DEFAULT};
pub use shorthand::{canonicalize, Spec, ToValidator};
pub use types::{Pattern, PrimitiveKind, Validator};
