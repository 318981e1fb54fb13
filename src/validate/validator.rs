//! Recursive value validator
//!
//! Composite kinds validate their children in [`ValidationMode::Deep`]. A
//! failing child collapses into the parent's failure; its own error is
//! logged at debug level under its dotted name.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use super::errors::{ValidationError, ValidationResult};
use super::operators::has_operator;
use super::scalars;
use super::ValidationMode;
use crate::config::EngineConfig;
use crate::registry::{FunctionRegistry, TypeCall};
use crate::schema::codec;
use crate::schema::{file_shape, Attr, AttrDefault, AttrType, LenRange, TemporalKind, TypeFunc};
use crate::value::{Document, Value};

/// Per-call validation context
#[derive(Debug, Clone, Copy)]
pub struct AttrValidator<'a> {
    config: &'a EngineConfig,
    registry: &'a FunctionRegistry,
    now: DateTime<Utc>,
}

impl<'a> AttrValidator<'a> {
    /// Captures the current instant for relative temporal bounds
    pub fn new(config: &'a EngineConfig, registry: &'a FunctionRegistry) -> Self {
        Self {
            config,
            registry,
            now: Utc::now(),
        }
    }

    /// Pins the instant relative bounds resolve against
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn registry(&self) -> &'a FunctionRegistry {
        self.registry
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Validates `value` against `attr`, returning its canonical form.
    ///
    /// `doc` is the enclosing document handed to default generators.
    pub fn validate(
        &self,
        mode: ValidationMode,
        name: &str,
        attr: &Attr,
        value: &Value,
        doc: &Document,
    ) -> ValidationResult<Value> {
        if value.is_null() {
            if mode == ValidationMode::Update {
                return Ok(Value::Null);
            }
            if let Some(default) = self.default_value(attr, doc) {
                return Ok(default);
            }
            if attr.allow_none() {
                return Ok(Value::Null);
            }
            return Err(ValidationError::missing(name, attr.kind()));
        }

        if mode == ValidationMode::Update {
            if let Value::Map(map) = value {
                if has_operator(map) {
                    trace!(attr = name, "update operator detected");
                    return self.validate_operator(name, attr, value, map, doc);
                }
            }
        }

        if let Some(canonical) = self.check_kind(mode, name, attr, value, doc) {
            return Ok(canonical);
        }

        if mode != ValidationMode::Update {
            if let Some(default) = self.default_value(attr, doc) {
                return Ok(default);
            }
        }
        Err(ValidationError::invalid(name, attr.kind(), value))
    }

    /// Static defaults are copied; generators run against `doc`
    pub(crate) fn default_value(&self, attr: &Attr, doc: &Document) -> Option<Value> {
        match attr.default()? {
            AttrDefault::Static(value) => Some(value.clone()),
            AttrDefault::Inline(generate) => Some(generate(doc)),
            AttrDefault::Named(generator) => match self.registry.default_fn(generator) {
                Some(generate) => Some(generate(doc)),
                None => {
                    warn!(generator = %generator, "default generator not registered");
                    None
                }
            },
        }
    }

    /// Kind-specific acceptance; `None` is a rejection
    pub(super) fn check_kind(
        &self,
        mode: ValidationMode,
        name: &str,
        attr: &Attr,
        value: &Value,
        doc: &Document,
    ) -> Option<Value> {
        match attr.ty() {
            AttrType::Any => (!value.is_null()).then(|| value.clone()),
            AttrType::Bool => scalars::check_bool(value),
            AttrType::Int { ranges } => scalars::check_int(ranges, value),
            AttrType::Float { ranges } => scalars::check_float(ranges, value),
            AttrType::Str { pattern } => scalars::check_str(pattern.as_ref(), value),
            AttrType::Bytes => scalars::check_bytes(value),
            AttrType::Date { ranges } => {
                scalars::check_temporal(TemporalKind::Date, ranges, value, self.now)
            }
            AttrType::Time { ranges } => {
                scalars::check_temporal(TemporalKind::Time, ranges, value, self.now)
            }
            AttrType::Datetime { ranges } => {
                scalars::check_temporal(TemporalKind::Datetime, ranges, value, self.now)
            }
            AttrType::Email(filter) => scalars::check_email(filter, value),
            AttrType::UriWeb(filter) => scalars::check_uri_web(filter, value),
            AttrType::UriEmail(filter) => scalars::check_uri_email(filter, value),
            AttrType::UriTel(filter) => scalars::check_uri_tel(filter, value),
            AttrType::Phone { codes } => scalars::check_phone(codes, value),
            AttrType::Ip => scalars::check_ip(value),
            AttrType::Id => scalars::check_id(name, value),
            AttrType::GeoPoint => scalars::check_geo_point(value),
            AttrType::File => self.check_file(name, value, doc),
            AttrType::Locale => self.check_locale(name, value),
            AttrType::Locales => scalars::check_locales(self.config, value),
            AttrType::Literal { literal } => scalars::check_literal(literal, value),
            AttrType::List { list, len_range } => {
                self.check_list(name, list, len_range.as_ref(), value, doc)
            }
            AttrType::Union { union } => self.first_match(name, union, value, doc),
            AttrType::KvDict {
                key,
                val,
                req,
                len_range,
            } => self.check_kv_dict(name, key, val, req, len_range.as_ref(), value, doc),
            AttrType::TypedDict { dict } => self.check_typed_dict(name, dict, value, doc),
            AttrType::Attr => {
                let decoded = codec::decode(value)
                    .map_err(|e| debug!(attr = name, error = %e, "descriptor record rejected"))
                    .ok()?;
                debug!(attr = name, kind = %decoded.kind(), "descriptor record accepted");
                Some(value.clone())
            }
            AttrType::Type { func } => self.check_type(mode, name, attr, func, value),
        }
    }

    fn deep(&self, name: &str, attr: &Attr, value: &Value, doc: &Document) -> ValidationResult<Value> {
        self.validate(ValidationMode::Deep, name, attr, value, doc)
    }

    /// First alternative accepting `value`, in declaration order
    pub(super) fn first_match(
        &self,
        name: &str,
        alternatives: &[Attr],
        value: &Value,
        doc: &Document,
    ) -> Option<Value> {
        let mut last_error = None;
        for alternative in alternatives {
            match self.deep(name, alternative, value, doc) {
                Ok(canonical) => return Some(canonical),
                Err(e) => last_error = Some(e),
            }
        }
        if let Some(e) = last_error {
            debug!(attr = name, error = %e, "no alternative accepted value");
        }
        None
    }

    fn check_list(
        &self,
        name: &str,
        list: &[Attr],
        len_range: Option<&LenRange>,
        value: &Value,
        doc: &Document,
    ) -> Option<Value> {
        let items = value.as_list()?;
        if let Some(range) = len_range {
            if !range.contains(items.len()) {
                return None;
            }
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.first_match(&format!("{}.{}", name, i), list, item, doc))
            .collect::<Option<Vec<_>>>()
            .map(Value::List)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_kv_dict(
        &self,
        name: &str,
        key: &Attr,
        val: &Attr,
        req: &[String],
        len_range: Option<&LenRange>,
        value: &Value,
        doc: &Document,
    ) -> Option<Value> {
        let map = value.as_map()?;
        if let Some(range) = len_range {
            if !range.contains(map.len()) {
                return None;
            }
        }
        if req.iter().any(|k| !map.contains_key(k)) {
            return None;
        }

        let mut out = Document::new();
        for (k, v) in map {
            let child_name = format!("{}.{}", name, k);
            let canonical_key = match self.deep(&child_name, key, &Value::Str(k.clone()), doc) {
                Ok(Value::Str(text)) => text,
                Ok(Value::Id(id)) => id.to_hex(),
                Ok(other) => {
                    debug!(attr = %child_name, observed = other.type_name(), "key is not text");
                    return None;
                }
                Err(e) => {
                    debug!(attr = %child_name, error = %e, "key rejected");
                    return None;
                }
            };
            let canonical_val = self
                .deep(&child_name, val, v, doc)
                .map_err(|e| debug!(attr = %child_name, error = %e, "value rejected"))
                .ok()?;
            out.insert(canonical_key, canonical_val);
        }
        Some(Value::Map(out))
    }

    fn check_typed_dict(
        &self,
        name: &str,
        dict: &BTreeMap<String, Attr>,
        value: &Value,
        doc: &Document,
    ) -> Option<Value> {
        let map = value.as_map()?;
        let mut out = Document::new();
        for (k, child) in dict {
            let child_name = format!("{}.{}", name, k);
            let child_value = map.get(k).unwrap_or(&Value::Null);
            let canonical = self
                .deep(&child_name, child, child_value, doc)
                .map_err(|e| debug!(attr = %child_name, error = %e, "field rejected"))
                .ok()?;
            out.insert(k.clone(), canonical);
        }
        if let Some(extra) = map.keys().find(|k| !dict.contains_key(*k)) {
            debug!(attr = name, key = %extra, "undeclared key");
            return None;
        }
        Some(Value::Map(out))
    }

    /// A one-element list is unwrapped before matching the file shape
    fn check_file(&self, name: &str, value: &Value, doc: &Document) -> Option<Value> {
        let value = match value {
            Value::List(items) if items.len() == 1 => &items[0],
            other => other,
        };
        self.deep(name, file_shape(), value, doc)
            .map_err(|e| debug!(attr = name, error = %e, "file shape rejected"))
            .ok()
    }

    fn check_type(
        &self,
        mode: ValidationMode,
        name: &str,
        attr: &Attr,
        func: &TypeFunc,
        value: &Value,
    ) -> Option<Value> {
        let validator = match func {
            TypeFunc::Inline(validator) => validator,
            TypeFunc::Named(callback) => match self.registry.validator(callback) {
                Some(validator) => validator,
                None => {
                    warn!(attr = name, callback = %callback, "type validator not registered");
                    return None;
                }
            },
        };
        let call = TypeCall {
            mode,
            attr_name: name,
            attr,
            value,
        };
        validator(call)
            .map_err(|e| debug!(attr = name, error = %e, "type validator rejected value"))
            .ok()
    }
}

/// Validates one attribute value with a freshly captured instant
pub fn validate_attr(
    mode: ValidationMode,
    name: &str,
    attr: &Attr,
    value: &Value,
    doc: &Document,
    config: &EngineConfig,
    registry: &FunctionRegistry,
) -> ValidationResult<Value> {
    AttrValidator::new(config, registry).validate(mode, name, attr, value, doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocaleStrategy;
    use crate::schema::LenRange;
    use crate::value::ObjectId;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixture() -> (EngineConfig, FunctionRegistry) {
        (EngineConfig::default(), FunctionRegistry::with_builtins())
    }

    fn v(json: serde_json::Value) -> Value {
        json.into()
    }

    fn check(attr: &Attr, value: Value) -> ValidationResult<Value> {
        let (config, registry) = fixture();
        AttrValidator::new(&config, &registry).validate(
            ValidationMode::Create,
            "field",
            attr,
            &value,
            &Document::new(),
        )
    }

    #[test]
    fn test_int_range_boundaries() {
        let attr = Attr::int_ranged(&[(0.0, 10.0)]).unwrap();
        assert!(check(&attr, Value::Int(10)).is_err());
        assert_eq!(check(&attr, Value::Int(9)), Ok(Value::Int(9)));
        assert!(check(&attr, Value::Int(-1)).is_err());
    }

    #[test]
    fn test_list_len_range() {
        let attr =
            Attr::list_with_len(vec![Attr::int()], LenRange::new(1, Some(3)).unwrap()).unwrap();
        assert!(check(&attr, v(json!([]))).is_err());
        assert!(check(&attr, v(json!([1]))).is_ok());
        assert!(check(&attr, v(json!([1, 2]))).is_ok());
        assert!(check(&attr, v(json!([1, 2, 3]))).is_err());
    }

    #[test]
    fn test_list_elements_take_first_matching_alternative() {
        let attr = Attr::list(vec![Attr::int(), Attr::string()]).unwrap();
        assert_eq!(
            check(&attr, v(json!(["7", "x"]))),
            Ok(v(json!([7, "x"])))
        );
        assert!(check(&attr, v(json!([true]))).is_err());
    }

    #[test]
    fn test_typed_dict_exact_keys() {
        let attr = Attr::typed_dict([("a", Attr::int()), ("b", Attr::string())]).unwrap();
        assert!(check(&attr, v(json!({"a": 1, "b": "x"}))).is_ok());
        assert!(check(&attr, v(json!({"a": 1, "b": "x", "c": 2}))).is_err());
        assert!(check(&attr, v(json!({"a": 1}))).is_err());
    }

    #[test]
    fn test_typed_dict_child_defaults_fire() {
        let attr = Attr::typed_dict([
            ("a", Attr::int()),
            ("b", Attr::string().with_static_default("none")),
            ("c", Attr::string().nullable()),
        ])
        .unwrap();
        assert_eq!(
            check(&attr, v(json!({"a": 1}))),
            Ok(v(json!({"a": 1, "b": "none", "c": null})))
        );
    }

    #[test]
    fn test_kv_dict_constraints() {
        let attr = Attr::kv_dict_with(
            Attr::literal(["x", "y", "z"]).unwrap(),
            Attr::int(),
            vec!["x".into()],
            Some(LenRange::new(1, Some(3)).unwrap()),
        )
        .unwrap();
        assert!(check(&attr, v(json!({"x": 1, "y": 2}))).is_ok());
        assert!(check(&attr, v(json!({"y": 2}))).is_err());
        assert!(check(&attr, v(json!({"x": 1, "q": 2}))).is_err());
        assert!(check(&attr, v(json!({"x": 1, "y": 2, "z": 3}))).is_err());
        assert!(check(&attr, v(json!({"x": "one"}))).is_err());
    }

    #[test]
    fn test_kv_dict_id_keys_are_hex_text() {
        let (config, registry) = fixture();
        let attr = Attr::kv_dict(Attr::id(), Attr::int()).unwrap();
        let input = v(json!({"507f1f77bcf86cd799439011": 1}));
        let out = AttrValidator::new(&config, &registry)
            .validate(ValidationMode::Create, "_ids", &attr, &input, &Document::new())
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_null_handling_by_mode() {
        let (config, registry) = fixture();
        let validator = AttrValidator::new(&config, &registry);
        let doc = Document::new();

        let plain = Attr::int();
        assert_eq!(
            validator.validate(ValidationMode::Update, "n", &plain, &Value::Null, &doc),
            Ok(Value::Null)
        );
        let err = validator
            .validate(ValidationMode::Create, "n", &plain, &Value::Null, &doc)
            .unwrap_err();
        assert!(err.is_missing());

        let nullable = Attr::int().nullable();
        assert_eq!(
            validator.validate(ValidationMode::Create, "n", &nullable, &Value::Null, &doc),
            Ok(Value::Null)
        );
    }

    #[test]
    fn test_default_replaces_malformed_outside_update() {
        let (config, registry) = fixture();
        let validator = AttrValidator::new(&config, &registry);
        let doc = Document::new();
        let attr = Attr::int().with_static_default(0);
        let bad = Value::from("abc");

        assert_eq!(
            validator.validate(ValidationMode::Create, "n", &attr, &bad, &doc),
            Ok(Value::Int(0))
        );
        assert!(validator
            .validate(ValidationMode::Update, "n", &attr, &bad, &doc)
            .is_err());
    }

    #[test]
    fn test_generator_receives_document() {
        let (config, mut registry) = fixture();
        registry
            .register_default("copy_name", |doc: &Document| {
                doc.get("name").cloned().unwrap_or_default()
            })
            .unwrap();
        let mut doc = Document::new();
        doc.insert("name".into(), Value::from("ada"));

        let attr = Attr::string().with_generator("copy_name");
        let result = AttrValidator::new(&config, &registry).validate(
            ValidationMode::Create,
            "slug",
            &attr,
            &Value::Null,
            &doc,
        );
        assert_eq!(result, Ok(Value::from("ada")));
    }

    #[test]
    fn test_id_generator_and_canonical_forms() {
        let attr = Attr::id().with_generator("object_id");
        let (config, registry) = fixture();
        let result = AttrValidator::new(&config, &registry).validate(
            ValidationMode::Create,
            "_id",
            &attr,
            &Value::Null,
            &Document::new(),
        );
        assert!(matches!(result, Ok(Value::Id(_))));

        let id = ObjectId::new();
        assert_eq!(check(&Attr::id(), Value::Id(id)), Ok(Value::Str(id.to_hex())));
    }

    #[test]
    fn test_union_first_match() {
        let attr = Attr::union(vec![Attr::int(), Attr::string()]).unwrap();
        assert_eq!(check(&attr, Value::from("5")), Ok(Value::Int(5)));
        assert_eq!(check(&attr, Value::from("x")), Ok(Value::from("x")));
        assert!(check(&attr, Value::Bool(true)).is_err());
    }

    #[test]
    fn test_file_shapes() {
        let stored = json!({
            "name": "a.png", "lastModified": 1, "type": "image/png", "size": 10,
            "ref": "507f1f77bcf86cd799439011"
        });
        assert!(check(&Attr::file(), v(stored.clone())).is_ok());
        assert_eq!(check(&Attr::file(), v(json!([stored.clone()]))), Ok(v(stored)));

        let mut upload = Document::new();
        upload.insert("name".into(), Value::from("a.txt"));
        upload.insert("lastModified".into(), Value::Int(1));
        upload.insert("type".into(), Value::from("text/plain"));
        upload.insert("size".into(), Value::Int(3));
        upload.insert("content".into(), Value::Bytes(b"abc".to_vec()));
        assert!(check(&Attr::file(), Value::Map(upload)).is_ok());

        assert!(check(&Attr::file(), v(json!({"name": "a"}))).is_err());
    }

    #[test]
    fn test_attr_kind_decodes_records() {
        assert!(check(&Attr::meta(), v(json!({"kind": "INT"}))).is_ok());
        assert!(check(&Attr::meta(), v(json!({"kind": "NOPE"}))).is_err());
    }

    #[test]
    fn test_attr_kind_keeps_input_record() {
        let record = v(json!({"kind": "INT"}));
        assert_eq!(check(&Attr::meta(), record.clone()), Ok(record));
    }

    #[test]
    fn test_type_validators() {
        let (config, mut registry) = fixture();
        registry
            .register_validator("even", |call: TypeCall<'_>| match call.value {
                Value::Int(i) if i % 2 == 0 => Ok(Value::Int(*i)),
                other => Err(ValidationError::invalid(
                    call.attr_name,
                    call.attr.kind(),
                    other,
                )),
            })
            .unwrap();
        let validator = AttrValidator::new(&config, &registry);
        let attr = Attr::type_named("even").unwrap();
        let doc = Document::new();

        assert!(validator
            .validate(ValidationMode::Create, "n", &attr, &Value::Int(4), &doc)
            .is_ok());
        assert!(validator
            .validate(ValidationMode::Create, "n", &attr, &Value::Int(3), &doc)
            .is_err());

        let unknown = Attr::type_named("missing").unwrap();
        assert!(validator
            .validate(ValidationMode::Create, "n", &unknown, &Value::Int(4), &doc)
            .is_err());
    }

    #[test]
    fn test_relative_bounds_use_pinned_instant() {
        let (config, registry) = fixture();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let validator = AttrValidator::new(&config, &registry).at(now);
        let attr = Attr::datetime_ranged(&[("-1h", "+1h")]).unwrap();
        let doc = Document::new();

        assert!(validator
            .validate(ValidationMode::Create, "t", &attr, &Value::from("2024-03-10T12:30"), &doc)
            .is_ok());
        assert!(validator
            .validate(ValidationMode::Create, "t", &attr, &Value::from("2024-03-10T13:30"), &doc)
            .is_err());
    }

    #[test]
    fn test_locale_strategies() {
        let registry = FunctionRegistry::with_builtins();
        let doc = Document::new();
        let input = v(json!({"en": "hello"}));

        let config = EngineConfig::with_locales(["en", "fr"]).unwrap();
        let validator = AttrValidator::new(&config, &registry);
        assert_eq!(
            validator.validate(ValidationMode::Create, "title", &Attr::locale(), &input, &doc),
            Ok(v(json!({"en": "hello", "fr": "hello"})))
        );

        let config = config.with_strategy(LocaleStrategy::NoneValue);
        let validator = AttrValidator::new(&config, &registry);
        assert_eq!(
            validator.validate(ValidationMode::Create, "title", &Attr::locale(), &input, &doc),
            Ok(v(json!({"en": "hello", "fr": null})))
        );
    }
}
