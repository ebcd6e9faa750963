//! Schema Invariant Tests
//!
//! Tests for normalization and validator evaluation:
//! - Normalization is deterministic
//! - Primitive matching is exact
//! - Literal equality is canonical and type-preserving
//! - Structural matching is open-world
//! - Repeated and Sequence are distinct

use astrology::schema::{
    normalize, PrimitiveKind, Spec, ToValidator, Validator, NULL_SPEC_DEFAULT,
};
use astrology::SchemaResult;
use proptest::prelude::*;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn probes() -> Vec<Value> {
    vec![
        json!(null),
        json!(5),
        json!(5.5),
        json!(""),
        json!("a"),
        json!(true),
        json!([]),
        json!([1, 2, 3]),
        json!(["a", null]),
        json!({}),
        json!({"a": 1}),
        json!({"a": "x", "b": [true]}),
    ]
}

fn primitive_kind() -> impl Strategy<Value = PrimitiveKind> {
    prop_oneof![
        Just(PrimitiveKind::String),
        Just(PrimitiveKind::Int),
        Just(PrimitiveKind::Float),
        Just(PrimitiveKind::Bool),
    ]
}

fn leaf_spec() -> impl Strategy<Value = Spec> {
    prop_oneof![
        Just(Spec::Any),
        primitive_kind().prop_map(Spec::Type),
        any::<i64>().prop_map(Spec::from),
        "[a-z]{0,4}".prop_map(Spec::from),
        any::<bool>().prop_map(Spec::from),
    ]
}

fn shorthand() -> impl Strategy<Value = Spec> {
    leaf_spec().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| Spec::list(s)),
            inner.clone().prop_map(|s| Spec::nullable(s)),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Spec::any_of),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Spec::sequence),
            prop::collection::btree_map("[a-z]{1,3}", inner, 0..4).prop_map(Spec::object),
        ]
    })
}

// =============================================================================
// Normalization Determinism Tests
// =============================================================================

proptest! {
    /// Normalizing equal shorthand twice yields equal validators that agree on
    /// every probe.
    #[test]
    fn prop_normalize_is_deterministic(spec in shorthand()) {
        let first = normalize(&spec).unwrap();
        let second = normalize(&spec.clone()).unwrap();
        prop_assert_eq!(&first, &second);
        for probe in probes() {
            prop_assert_eq!(first.validate(&probe), second.validate(&probe));
        }
    }

    /// An already-built validator normalizes to itself.
    #[test]
    fn prop_validator_is_a_fixed_point(spec in shorthand()) {
        let validator = normalize(&spec).unwrap();
        prop_assert_eq!(normalize(&Spec::from(validator.clone())).unwrap(), validator);
    }

    /// Evaluation never depends on earlier evaluations.
    #[test]
    fn prop_validate_is_pure(spec in shorthand()) {
        let validator = normalize(&spec).unwrap();
        let before: Vec<bool> = probes().iter().map(|p| validator.validate(p)).collect();
        let after: Vec<bool> = probes().iter().map(|p| validator.validate(p)).collect();
        prop_assert_eq!(before, after);
    }
}

/// The "no spec" marker normalizes to the named default.
#[test]
fn test_null_spec_default() {
    assert_eq!(normalize(&Spec::Any).unwrap(), NULL_SPEC_DEFAULT);
    assert_eq!(normalize(&Spec::from(None::<bool>)).unwrap(), Validator::Whatever);

    let nullable_whatever = Validator::nullable(Validator::Whatever);
    for probe in probes() {
        assert!(NULL_SPEC_DEFAULT.validate(&probe));
        assert_eq!(NULL_SPEC_DEFAULT.validate(&probe), nullable_whatever.validate(&probe));
    }
}

// =============================================================================
// Primitive and Literal Tests
// =============================================================================

/// Primitive matching is exact.
#[test]
fn test_primitive_int() {
    let int = normalize(&Spec::Type(PrimitiveKind::Int)).unwrap();
    assert!(int.validate(&json!(5)));
    assert!(!int.validate(&json!("5")));
    assert!(!int.validate(&json!(5.0)));
}

/// Floats are not satisfied by integers.
#[test]
fn test_primitive_float_is_strict() {
    let float = Validator::primitive(PrimitiveKind::Float);
    assert!(float.validate(&json!(5.5)));
    assert!(!float.validate(&json!(5)));
}

#[test]
fn test_literal() {
    let three = normalize(&Spec::from(3i64)).unwrap();
    assert!(three.validate(&json!(3)));
    assert!(!three.validate(&json!(4)));
}

/// An integer literal does not match its floating point equivalent.
#[test]
fn test_literal_int_is_not_float() {
    let three = normalize(&Spec::from(3i64)).unwrap();
    assert!(!three.validate(&json!(3.0)));

    let three_float = normalize(&Spec::float(3.0).unwrap()).unwrap();
    assert!(three_float.validate(&json!(3.0)));
    assert!(!three_float.validate(&json!(3)));
}

/// Non-finite floats are not representable literals.
#[test]
fn test_non_finite_literal_rejected() {
    assert!(Spec::float(f64::NAN).is_err());
    assert!(Spec::float(f64::INFINITY).is_err());
}

#[test]
fn test_any_of_literals() {
    let choice = normalize(&Spec::any_of(["a", "b"])).unwrap();
    assert!(choice.validate(&json!("a")));
    assert!(choice.validate(&json!("b")));
    assert!(!choice.validate(&json!("c")));
}

// =============================================================================
// Collection Tests
// =============================================================================

#[test]
fn test_repeated() {
    let numbers = normalize(&Spec::list(PrimitiveKind::Int)).unwrap();
    assert!(matches!(numbers, Validator::Repeated { .. }));
    assert!(numbers.validate(&json!([1, 2, 3])));
    assert!(numbers.validate(&json!([])));
    assert!(!numbers.validate(&json!([1, "x", 3])));
}

/// Sequence is positional and fixed-arity.
#[test]
fn test_sequence_is_positional() {
    let pair = normalize(&Spec::sequence([
        Spec::Type(PrimitiveKind::String),
        Spec::Type(PrimitiveKind::Int),
    ]))
    .unwrap();
    assert!(pair.validate(&json!(["a", 1])));
    assert!(!pair.validate(&json!([1, "a"])));
    assert!(!pair.validate(&json!(["a", 1, 2])));
}

/// Collection validators applied to non-arrays return false.
#[test]
fn test_collections_reject_scalars() {
    let numbers = normalize(&Spec::list(PrimitiveKind::Int)).unwrap();
    assert!(!numbers.validate(&json!(5)));
    assert!(!numbers.validate(&json!({"0": 1})));
}

/// Undeclared keys are ignored.
#[test]
fn test_structural_is_open_world() {
    let ham = normalize(&Spec::object([("ham", PrimitiveKind::Bool)])).unwrap();
    assert!(ham.validate(&json!({"ham": true, "extra": 1})));
    assert!(ham.validate(&json!({"extra": 1})));
    assert!(!ham.validate(&json!({"ham": "yes"})));
    assert!(!ham.validate(&json!([true])));
}

#[test]
fn test_nested_failure_path() {
    let salad = normalize(&Spec::object([(
        "meat",
        Spec::object([("numbers", Spec::list(PrimitiveKind::Int))]),
    )]))
    .unwrap();
    let details = salad
        .check(&json!({"meat": {"numbers": [1, 2, "three"]}}))
        .unwrap_err();
    assert_eq!(details.path, "meat.numbers[2]");
    assert_eq!(details.expected, "int");
}

// =============================================================================
// Escape Hatch Tests
// =============================================================================

struct EvenLength;

impl ToValidator for EvenLength {
    fn to_validator(&self) -> SchemaResult<Validator> {
        Validator::pattern("(..)*$")
    }
}

/// Caller-defined conversions are delegated to.
#[test]
fn test_custom_conversion() {
    let even = normalize(&Spec::convert(EvenLength)).unwrap();
    assert!(even.validate(&json!("ab")));
    assert!(!even.validate(&json!("abc")));
}

#[test]
fn test_uuid_pattern() {
    let id = Validator::uuid();
    assert!(id.validate(&json!(uuid::Uuid::new_v4().to_string())));
    assert!(!id.validate(&json!("not-a-uuid")));
    assert!(!id.validate(&json!(42)));
}

// =============================================================================
// Invalid Spec Tests
// =============================================================================

#[test]
fn test_malformed_shorthand_is_invalid_spec() {
    for spec in [Spec::Set(vec![]), Spec::AnyOf(vec![]), Spec::Sequence(vec![])] {
        let err = normalize(&spec).unwrap_err();
        assert_eq!(err.code().code(), "ASTRO_INVALID_SPEC");
        assert!(err.is_fatal());
    }
}

#[test]
fn test_invalid_pattern() {
    assert!(Validator::pattern("(unclosed").is_err());
}
