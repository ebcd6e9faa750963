//! Spec normalization
//!
//! Turns `Spec` shorthand into a `Validator` tree, recursively. The input is
//! never modified; the output for equal inputs is always equal.

use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};
use super::shorthand::Spec;
use super::types::Validator;

/// What the "no spec" marker normalizes to.
///
/// `Nullable(Whatever)` accepts exactly the same values; build it explicitly
/// when the distinction matters for display.
pub const NULL_SPEC_DEFAULT: Validator = Validator::Whatever;

/// Normalizes shorthand into a validator.
///
/// # Errors
///
/// Returns `ASTRO_INVALID_SPEC` if:
/// - A set, alternative list or sequence is empty
/// - A mapping declares the same key twice
/// - A literal cannot be represented as JSON
/// - A caller-defined conversion fails
pub fn normalize(spec: &Spec) -> SchemaResult<Validator> {
    match spec {
        Spec::Validator(v) => Ok(v.clone()),
        Spec::Convert(conversion) => conversion.to_validator().map_err(|e| {
            SchemaError::invalid_spec(format!(
                "Conversion {} failed: {}",
                conversion.describe(),
                e.message()
            ))
        }),
        Spec::Any => Ok(NULL_SPEC_DEFAULT),
        Spec::Type(kind) => Ok(Validator::primitive(*kind)),
        Spec::Literal(value) => Validator::literal(value),
        Spec::Repeated(element) => Ok(Validator::repeated(normalize(element)?)),
        Spec::Sequence(elements) => {
            if elements.is_empty() {
                return Err(SchemaError::invalid_spec(
                    "A sequence needs at least one positional spec",
                ));
            }
            Ok(Validator::sequence(normalize_all(elements)?))
        }
        Spec::Set(values) => {
            if values.is_empty() {
                return Err(SchemaError::invalid_spec("An empty set matches nothing"));
            }
            Validator::enumeration(values)
        }
        Spec::Mapping(fields) => {
            let mut normalized = BTreeMap::new();
            for (name, field_spec) in fields {
                if normalized.insert(name.clone(), normalize(field_spec)?).is_some() {
                    return Err(SchemaError::invalid_spec(format!(
                        "Key '{}' appears twice in an object spec",
                        name
                    )));
                }
            }
            Ok(Validator::Structural { fields: normalized })
        }
        Spec::Nullable(inner) => Ok(Validator::nullable(normalize(inner)?)),
        Spec::AnyOf(options) => {
            if options.is_empty() {
                return Err(SchemaError::invalid_spec(
                    "AnyOf needs at least one alternative",
                ));
            }
            Ok(Validator::any_of(normalize_all(options)?))
        }
    }
}

fn normalize_all(specs: &[Spec]) -> SchemaResult<Vec<Validator>> {
    specs.iter().map(normalize).collect()
}
