//! Schema Invariant Tests
//!
//! - Validation is deterministic
//! - Absent attributes without defaults are reported as missing
//! - TYPED_DICT rejects undeclared keys
//! - Ranges are half-open
//! - Schemas survive a save/load cycle through the loader

use attrschema::config::{EngineConfig, LocaleStrategy};
use attrschema::path::resolve_schema_path;
use attrschema::registry::FunctionRegistry;
use attrschema::schema::{Attr, AttrKind, LenRange, Schema, SchemaBuilder, SchemaLoader};
use attrschema::validate::{validate_attr, validate_document, ValidationMode};
use attrschema::value::{Document, Value};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn users_schema() -> Schema {
    SchemaBuilder::new("users")
        .attr("_id", Attr::id().with_generator("object_id"))
        .attr("name", Attr::string())
        .attr("age", Attr::int_ranged(&[(0.0, 150.0)]).unwrap().nullable())
        .attr(
            "tags",
            Attr::list_with_len(vec![Attr::string()], LenRange::new(0, Some(5)).unwrap()).unwrap(),
        )
        .attr("bio", Attr::locale())
        .build()
        .unwrap()
}

fn doc(json: serde_json::Value) -> Document {
    match Value::from(json) {
        Value::Map(map) => map,
        other => panic!("expected a map, got {}", other.type_name()),
    }
}

fn check(attr: &Attr, value: serde_json::Value) -> bool {
    let config = EngineConfig::with_locales(["en", "fr"]).unwrap();
    let registry = FunctionRegistry::with_builtins();
    validate_attr(
        ValidationMode::Create,
        "attr",
        attr,
        &Value::from(value),
        &Document::new(),
        &config,
        &registry,
    )
    .is_ok()
}

// =============================================================================
// Determinism
// =============================================================================

/// Same document validates the same way every time.
#[test]
fn test_validation_is_deterministic() {
    let schema = users_schema();
    let config = EngineConfig::default();
    let registry = FunctionRegistry::with_builtins();
    let input = doc(json!({
        "_id": "507f1f77bcf86cd799439011",
        "name": "Alice",
        "tags": ["a"],
        "bio": {"en": "hi"}
    }));

    let first = validate_document(ValidationMode::Create, &input, &schema, &config, &registry)
        .unwrap();
    for _ in 0..100 {
        let again = validate_document(ValidationMode::Create, &input, &schema, &config, &registry)
            .unwrap();
        assert_eq!(first, again);
    }
}

/// Invalid document fails consistently.
#[test]
fn test_invalid_document_fails_consistently() {
    let schema = users_schema();
    let config = EngineConfig::default();
    let registry = FunctionRegistry::with_builtins();
    let input = doc(json!({"age": 20}));

    for _ in 0..100 {
        let err = validate_document(ValidationMode::Create, &input, &schema, &config, &registry)
            .unwrap_err();
        let mut missing: Vec<&str> = err.missing().map(|e| e.name()).collect();
        missing.sort_unstable();
        assert_eq!(missing, vec!["bio", "name", "tags"]);
    }
}

/// Generated `_id` values are object ids; the generator runs per call.
#[test]
fn test_generated_ids_are_unique() {
    let schema = users_schema();
    let config = EngineConfig::default();
    let registry = FunctionRegistry::with_builtins();
    let input = doc(json!({"name": "Alice", "tags": [], "bio": {"en": "hi"}}));

    let a = validate_document(ValidationMode::Create, &input, &schema, &config, &registry).unwrap();
    let b = validate_document(ValidationMode::Create, &input, &schema, &config, &registry).unwrap();
    assert!(matches!(a.get("_id"), Some(Value::Id(_))));
    assert_ne!(a.get("_id"), b.get("_id"));
}

// =============================================================================
// Kind boundaries
// =============================================================================

#[test]
fn test_int_range_is_half_open() {
    let attr = Attr::int_ranged(&[(0.0, 10.0)]).unwrap();
    assert!(!check(&attr, json!(10)));
    assert!(check(&attr, json!(9)));
    assert!(!check(&attr, json!(-1)));
}

#[test]
fn test_list_len_range_is_half_open() {
    let attr = Attr::list_with_len(vec![Attr::any()], LenRange::new(1, Some(3)).unwrap()).unwrap();
    assert!(!check(&attr, json!([])));
    assert!(check(&attr, json!([1])));
    assert!(check(&attr, json!([1, 2])));
    assert!(!check(&attr, json!([1, 2, 3])));
}

#[test]
fn test_typed_dict_rejects_extra_keys() {
    let attr = Attr::typed_dict([("a", Attr::int()), ("b", Attr::string())]).unwrap();
    assert!(!check(&attr, json!({"a": 1, "b": "x", "c": true})));
}

#[test]
fn test_locale_fills_from_primary() {
    let config = EngineConfig::with_locales(["en", "fr"])
        .unwrap()
        .with_strategy(LocaleStrategy::PrimaryLocale);
    let registry = FunctionRegistry::new();
    let out = validate_attr(
        ValidationMode::Create,
        "title",
        &Attr::locale(),
        &Value::from(json!({"en": "hello"})),
        &Document::new(),
        &config,
        &registry,
    )
    .unwrap();
    assert_eq!(out, Value::from(json!({"en": "hello", "fr": "hello"})));
}

#[test]
fn test_update_null_short_circuits() {
    let config = EngineConfig::default();
    let registry = FunctionRegistry::new();
    let out = validate_attr(
        ValidationMode::Update,
        "n",
        &Attr::int().with_static_default(3),
        &Value::Null,
        &Document::new(),
        &config,
        &registry,
    );
    assert_eq!(out, Ok(Value::Null));
}

#[test]
fn test_single_operator_per_update() {
    let config = EngineConfig::default();
    let registry = FunctionRegistry::new();
    let result = validate_attr(
        ValidationMode::Update,
        "n",
        &Attr::int(),
        &Value::from(json!({"$add": 5, "$multiply": 2})),
        &Document::new(),
        &config,
        &registry,
    );
    assert!(result.is_err());
}

#[test]
fn test_path_through_list_branch() {
    let schema = SchemaBuilder::new("posts")
        .attr(
            "items",
            Attr::list(vec![Attr::typed_dict([("x", Attr::int())]).unwrap()]).unwrap(),
        )
        .build()
        .unwrap();
    let attr = resolve_schema_path(&schema, "items.0.x", &EngineConfig::default()).unwrap();
    assert_eq!(attr.kind(), AttrKind::Int);
}

// =============================================================================
// Loader
// =============================================================================

#[test]
fn test_saved_schema_loads_identically() {
    let tmp = TempDir::new().unwrap();
    let registry = FunctionRegistry::with_builtins();
    let schema = users_schema();

    let writer = SchemaLoader::new(tmp.path());
    writer.save_schema(&schema).unwrap();

    let mut loader = SchemaLoader::new(tmp.path());
    loader.load_all(&registry).unwrap();
    assert_eq!(loader.schema_count(), 1);
    assert_eq!(loader.require("users").unwrap(), &schema);
}

#[test]
fn test_loader_rejects_unregistered_callbacks() {
    let tmp = TempDir::new().unwrap();
    let schema = SchemaBuilder::new("events")
        .attr("when", Attr::datetime().with_generator("utc_now.datetime"))
        .build()
        .unwrap();
    SchemaLoader::new(tmp.path()).save_schema(&schema).unwrap();

    let mut loader = SchemaLoader::new(tmp.path());
    let err = loader.load_all(&FunctionRegistry::new()).unwrap_err();
    assert_eq!(err.code().code(), "ATTR_SCHEMA_UNRESOLVED_CALLBACK");
}

#[test]
fn test_saved_schema_is_immutable() {
    let tmp = TempDir::new().unwrap();
    let loader = SchemaLoader::new(tmp.path());
    loader.save_schema(&users_schema()).unwrap();
    let err = loader.save_schema(&users_schema()).unwrap_err();
    assert_eq!(err.code().code(), "ATTR_SCHEMA_IMMUTABLE");
}
