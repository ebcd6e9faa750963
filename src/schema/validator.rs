//! Validator evaluation
//!
//! Evaluation semantics:
//! - Pure and total: never panics, never mutates the candidate
//! - Shape mismatches (e.g. a sequence applied to a string) are plain failures
//! - Structural matching is open-world: undeclared keys are ignored and
//!   declared keys may be absent
//! - Literal equality is canonical JSON equality; integers and floats never
//!   compare equal to each other

use serde_json::Value;

use super::errors::ValidationDetails;
use super::types::Validator;

impl Validator {
    /// Returns whether `value` matches this validator.
    pub fn validate(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }

    /// Checks `value`, reporting the first mismatch found.
    pub fn check(&self, value: &Value) -> Result<(), ValidationDetails> {
        self.check_at(value, "")
    }

    fn check_at(&self, value: &Value, path: &str) -> Result<(), ValidationDetails> {
        match self {
            Validator::Whatever => Ok(()),
            Validator::Primitive { kind } => {
                if kind.matches(value) {
                    Ok(())
                } else {
                    Err(mismatch(path, self, value))
                }
            }
            Validator::Literal { value: expected } => {
                if expected == value {
                    Ok(())
                } else {
                    Err(ValidationDetails::new(
                        display_path(path),
                        self.to_string(),
                        value.to_string(),
                    ))
                }
            }
            Validator::Nullable { inner } => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.check_at(value, path)
                }
            }
            Validator::AnyOf { options } => {
                if options.iter().any(|option| option.validate(value)) {
                    Ok(())
                } else {
                    Err(mismatch(path, self, value))
                }
            }
            Validator::Sequence { elements } => {
                let items = value.as_array().ok_or_else(|| mismatch(path, self, value))?;
                if items.len() != elements.len() {
                    return Err(ValidationDetails::length_mismatch(
                        display_path(path),
                        elements.len(),
                        items.len(),
                    ));
                }
                for (i, (element, item)) in elements.iter().zip(items).enumerate() {
                    element.check_at(item, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            Validator::Repeated { element } => {
                let items = value.as_array().ok_or_else(|| mismatch(path, self, value))?;
                for (i, item) in items.iter().enumerate() {
                    element.check_at(item, &format!("{}[{}]", path, i))?;
                }
                Ok(())
            }
            Validator::Structural { fields } => {
                let obj = value.as_object().ok_or_else(|| mismatch(path, self, value))?;
                for (name, validator) in fields {
                    if let Some(field_value) = obj.get(name) {
                        validator.check_at(field_value, &make_path(path, name))?;
                    }
                }
                Ok(())
            }
            Validator::Pattern { pattern } => match value.as_str() {
                Some(s) if pattern.is_match(s) => Ok(()),
                Some(s) => Err(ValidationDetails::new(
                    display_path(path),
                    self.to_string(),
                    format!("{:?}", s),
                )),
                None => Err(mismatch(path, self, value)),
            },
        }
    }
}

/// Creates a field path from prefix and field name.
fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

fn mismatch(path: &str, expected: &Validator, actual: &Value) -> ValidationDetails {
    ValidationDetails::type_mismatch(display_path(path), expected.to_string(), actual)
}

#[cfg(test)]
mod tests {
    use super::super::types::PrimitiveKind;
    use super::*;
    use serde_json::json;

    fn int() -> Validator {
        Validator::primitive(PrimitiveKind::Int)
    }

    fn boolean() -> Validator {
        Validator::primitive(PrimitiveKind::Bool)
    }

    #[test]
    fn test_whatever_accepts_everything() {
        for value in [json!(null), json!(1), json!("x"), json!([1]), json!({"a": 1})] {
            assert!(Validator::Whatever.validate(&value));
        }
    }

    #[test]
    fn test_primitive_int() {
        assert!(int().validate(&json!(5)));
        assert!(!int().validate(&json!("5")));
        assert!(int().validate(&json!(u64::MAX)));
        assert!(int().validate(&json!(-3)));
    }

    #[test]
    fn test_literal() {
        let three = Validator::literal(&3).unwrap();
        assert!(three.validate(&json!(3)));
        assert!(!three.validate(&json!(4)));
    }

    #[test]
    fn test_literal_keeps_int_and_float_apart() {
        let three = Validator::literal(&3).unwrap();
        assert!(!three.validate(&json!(3.0)));

        let three_float = Validator::literal(&3.0).unwrap();
        assert!(three_float.validate(&json!(3.0)));
        assert!(!three_float.validate(&json!(3)));
    }

    #[test]
    fn test_literal_compound_value() {
        let v = Validator::literal(&json!({"a": [1, 2], "b": null})).unwrap();
        assert!(v.validate(&json!({"b": null, "a": [1, 2]})));
        assert!(!v.validate(&json!({"a": [2, 1], "b": null})));
    }

    #[test]
    fn test_any_of_literals() {
        let v = Validator::any_of(vec![
            Validator::literal("a").unwrap(),
            Validator::literal("b").unwrap(),
        ]);
        assert!(v.validate(&json!("a")));
        assert!(v.validate(&json!("b")));
        assert!(!v.validate(&json!("c")));
    }

    #[test]
    fn test_nullable() {
        let v = Validator::nullable(boolean());
        assert!(v.validate(&json!(null)));
        assert!(v.validate(&json!(false)));
        assert!(!v.validate(&json!("false")));
    }

    #[test]
    fn test_repeated() {
        let v = Validator::repeated(int());
        assert!(v.validate(&json!([1, 2, 3])));
        assert!(!v.validate(&json!([1, "x", 3])));
        assert!(v.validate(&json!([])));
    }

    #[test]
    fn test_repeated_on_non_array_is_false() {
        let v = Validator::repeated(int());
        assert!(!v.validate(&json!("123")));
        assert!(!v.validate(&json!({"0": 1})));
        assert!(!v.validate(&json!(null)));
    }

    #[test]
    fn test_sequence_is_positional_and_fixed_arity() {
        let v = Validator::sequence(vec![int(), Validator::primitive(PrimitiveKind::String)]);
        assert!(v.validate(&json!([1, "a"])));
        assert!(!v.validate(&json!(["a", 1])));
        assert!(!v.validate(&json!([1])));
        assert!(!v.validate(&json!([1, "a", "b"])));
        assert!(!v.validate(&json!(42)));
    }

    #[test]
    fn test_structural_is_open_world() {
        let v = Validator::structural([("ham", boolean())]);
        assert!(v.validate(&json!({"ham": true, "extra": 1})));
        assert!(v.validate(&json!({"extra": 1})));
        assert!(!v.validate(&json!({"ham": "yes"})));
        assert!(!v.validate(&json!([true])));
    }

    #[test]
    fn test_uuid_pattern() {
        let v = Validator::uuid();
        assert!(v.validate(&json!("123e4567-e89b-12d3-a456-426614174000")));
        assert!(v.validate(&json!("123E4567-E89B-12D3-A456-426614174000")));
        assert!(!v.validate(&json!("not-a-uuid")));
        assert!(!v.validate(&json!(12)));
    }

    #[test]
    fn test_check_reports_nested_path() {
        let v = Validator::structural([(
            "meat",
            Validator::structural([("numbers", Validator::repeated(int()))]),
        )]);
        let details = v
            .check(&json!({"meat": {"numbers": [1, 2, "three"]}}))
            .unwrap_err();
        assert_eq!(details.path, "meat.numbers[2]");
        assert_eq!(details.expected, "int");
        assert_eq!(details.actual, "string");
    }

    #[test]
    fn test_check_reports_root_and_length() {
        let v = Validator::sequence(vec![int(), int()]);
        let details = v.check(&json!([1])).unwrap_err();
        assert_eq!(details.path, "$");
        assert!(details.expected.contains("2 elements"));
    }
}
