//! Update operators
//!
//! An update value may be a mapping holding exactly one operator key plus
//! that operator's auxiliary keys. The payload is validated against the
//! attribute (or its list element alternatives) and the request is
//! returned in canonical form.
//!
//! The operator keys are reserved in update mode. A mapping holding any of
//! them is an operator request, including KV_DICT data whose own keys happen
//! to collide; such data can only be written in the create modes.

use super::errors::{ValidationError, ValidationResult};
use super::validator::AttrValidator;
use super::ValidationMode;
use crate::schema::{Attr, AttrType};
use crate::value::{Document, Value};

/// Recognised operator keys
pub const OPERATOR_KEYS: [&str; 6] = [
    "$add",
    "$multiply",
    "$append",
    "$set_index",
    "$del_val",
    "$del_index",
];

/// True when any key is reserved, whether or not the request is well formed
pub(crate) fn has_operator(map: &Document) -> bool {
    map.keys().any(|k| OPERATOR_KEYS.contains(&k.as_str()))
}

/// Target of `$del_index`: a list position or a dictionary key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorIndex {
    Position(i64),
    Key(String),
}

/// Typed view of an update operator request
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperator {
    Add { value: Value, field: Option<String> },
    Multiply { value: Value, field: Option<String> },
    AppendOne { value: Value, unique: bool },
    SetIndex { value: Value, index: i64 },
    DeleteValue { values: Vec<Value> },
    DeleteIndex { index: OperatorIndex },
}

impl UpdateOperator {
    /// Parses the structure of an operator mapping without looking at the
    /// attribute it targets. Returns `None` unless exactly one operator key
    /// is present and every other key is one of its auxiliaries.
    pub fn from_map(map: &Document) -> Option<Self> {
        let mut operators = map.keys().filter(|k| OPERATOR_KEYS.contains(&k.as_str()));
        let operator = operators.next()?.as_str();
        if operators.next().is_some() {
            return None;
        }

        let auxiliaries: &[&str] = match operator {
            "$add" | "$multiply" => &["$field"],
            "$append" => &["$unique"],
            "$set_index" => &["$index"],
            _ => &[],
        };
        if map
            .keys()
            .any(|k| k != operator && !auxiliaries.contains(&k.as_str()))
        {
            return None;
        }

        let payload = map.get(operator)?.clone();
        let parsed = match operator {
            "$add" => UpdateOperator::Add {
                value: payload,
                field: field(map)?,
            },
            "$multiply" => UpdateOperator::Multiply {
                value: payload,
                field: field(map)?,
            },
            "$append" => UpdateOperator::AppendOne {
                value: payload,
                unique: match map.get("$unique") {
                    None | Some(Value::Null) => false,
                    Some(Value::Bool(unique)) => *unique,
                    Some(_) => return None,
                },
            },
            "$set_index" => UpdateOperator::SetIndex {
                value: payload,
                index: map.get("$index")?.as_i64()?,
            },
            "$del_val" => UpdateOperator::DeleteValue {
                values: payload.as_list()?.clone(),
            },
            "$del_index" => UpdateOperator::DeleteIndex {
                index: match payload {
                    Value::Int(position) => OperatorIndex::Position(position),
                    Value::Str(key) => OperatorIndex::Key(key),
                    _ => return None,
                },
            },
            _ => return None,
        };
        Some(parsed)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        Self::from_map(value.as_map()?)
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpdateOperator::Add { .. } => "$add",
            UpdateOperator::Multiply { .. } => "$multiply",
            UpdateOperator::AppendOne { .. } => "$append",
            UpdateOperator::SetIndex { .. } => "$set_index",
            UpdateOperator::DeleteValue { .. } => "$del_val",
            UpdateOperator::DeleteIndex { .. } => "$del_index",
        }
    }

    /// Canonical mapping form; auxiliary keys are always present
    pub fn to_value(&self) -> Value {
        let mut map = Document::new();
        match self {
            UpdateOperator::Add { value, field } | UpdateOperator::Multiply { value, field } => {
                map.insert(self.name().to_string(), value.clone());
                map.insert(
                    "$field".to_string(),
                    field.clone().map(Value::Str).unwrap_or(Value::Null),
                );
            }
            UpdateOperator::AppendOne { value, unique } => {
                map.insert(self.name().to_string(), value.clone());
                map.insert("$unique".to_string(), Value::Bool(*unique));
            }
            UpdateOperator::SetIndex { value, index } => {
                map.insert(self.name().to_string(), value.clone());
                map.insert("$index".to_string(), Value::Int(*index));
            }
            UpdateOperator::DeleteValue { values } => {
                map.insert(self.name().to_string(), Value::List(values.clone()));
            }
            UpdateOperator::DeleteIndex { index } => {
                let index = match index {
                    OperatorIndex::Position(position) => Value::Int(*position),
                    OperatorIndex::Key(key) => Value::Str(key.clone()),
                };
                map.insert(self.name().to_string(), index);
            }
        }
        Value::Map(map)
    }
}

/// `$field` is either absent, null or an attribute name
fn field(map: &Document) -> Option<Option<String>> {
    match map.get("$field") {
        None | Some(Value::Null) => Some(None),
        Some(Value::Str(name)) => Some(Some(name.clone())),
        Some(_) => None,
    }
}

impl AttrValidator<'_> {
    pub(super) fn validate_operator(
        &self,
        name: &str,
        attr: &Attr,
        value: &Value,
        map: &Document,
        doc: &Document,
    ) -> ValidationResult<Value> {
        let invalid = || ValidationError::invalid(name, attr.kind(), value);
        let operator = UpdateOperator::from_map(map).ok_or_else(invalid)?;

        let checked = match operator {
            UpdateOperator::Add { value: payload, field } => UpdateOperator::Add {
                value: self.operand(name, attr, &payload, doc).ok_or_else(invalid)?,
                field,
            },
            UpdateOperator::Multiply { value: payload, field } => UpdateOperator::Multiply {
                value: self.operand(name, attr, &payload, doc).ok_or_else(invalid)?,
                field,
            },
            UpdateOperator::AppendOne { value: payload, unique } => UpdateOperator::AppendOne {
                value: self.element(name, attr, &payload, doc).ok_or_else(invalid)?,
                unique,
            },
            UpdateOperator::SetIndex { value: payload, index } => UpdateOperator::SetIndex {
                value: self.element(name, attr, &payload, doc).ok_or_else(invalid)?,
                index,
            },
            UpdateOperator::DeleteValue { values } => match attr.ty() {
                AttrType::List { .. } => UpdateOperator::DeleteValue { values },
                _ => return Err(invalid()),
            },
            UpdateOperator::DeleteIndex { index } => match (attr.ty(), &index) {
                (AttrType::List { .. }, OperatorIndex::Position(_))
                | (AttrType::KvDict { .. }, OperatorIndex::Key(_)) => {
                    UpdateOperator::DeleteIndex { index }
                }
                _ => return Err(invalid()),
            },
        };
        Ok(checked.to_value())
    }

    fn operand(&self, name: &str, attr: &Attr, payload: &Value, doc: &Document) -> Option<Value> {
        self.check_kind(ValidationMode::Update, name, attr, payload, doc)
    }

    /// Matches one list element, checked as a one-element list
    fn element(&self, name: &str, attr: &Attr, payload: &Value, doc: &Document) -> Option<Value> {
        match attr.ty() {
            AttrType::List { list, len_range } => {
                if len_range.as_ref().is_some_and(|range| !range.contains(1)) {
                    return None;
                }
                self.first_match(name, list, payload, doc)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::registry::FunctionRegistry;
    use crate::schema::LenRange;
    use serde_json::json;

    fn update(attr: &Attr, request: serde_json::Value) -> ValidationResult<Value> {
        let config = EngineConfig::default();
        let registry = FunctionRegistry::new();
        AttrValidator::new(&config, &registry).validate(
            ValidationMode::Update,
            "field",
            attr,
            &Value::from(request),
            &Document::new(),
        )
    }

    #[test]
    fn test_add_canonical_form() {
        assert_eq!(
            update(&Attr::int(), json!({"$add": 5})),
            Ok(Value::from(json!({"$add": 5, "$field": null})))
        );
        assert_eq!(
            update(&Attr::int(), json!({"$add": "5", "$field": "total"})),
            Ok(Value::from(json!({"$add": 5, "$field": "total"})))
        );
        assert!(update(&Attr::int(), json!({"$add": "five"})).is_err());
        assert!(update(&Attr::int(), json!({"$add": 5, "$field": 1})).is_err());
    }

    #[test]
    fn test_one_operator_per_request() {
        assert!(update(&Attr::int(), json!({"$add": 1, "$multiply": 2})).is_err());
        assert!(update(&Attr::int(), json!({"$add": 1, "other": 2})).is_err());
    }

    #[test]
    fn test_append_checks_single_element_len() {
        let pairs =
            Attr::list_with_len(vec![Attr::int()], LenRange::new(2, Some(3)).unwrap()).unwrap();
        assert!(update(&pairs, json!({"$append": 3})).is_err());
        assert!(update(&pairs, json!({"$set_index": 3, "$index": 0})).is_err());

        let attr =
            Attr::list_with_len(vec![Attr::int()], LenRange::new(1, Some(3)).unwrap()).unwrap();
        assert_eq!(
            update(&attr, json!({"$append": "3"})),
            Ok(Value::from(json!({"$append": 3, "$unique": false})))
        );
        assert_eq!(
            update(&attr, json!({"$append": 3, "$unique": true})),
            Ok(Value::from(json!({"$append": 3, "$unique": true})))
        );
        assert!(update(&attr, json!({"$append": "x"})).is_err());
        assert!(update(&Attr::int(), json!({"$append": 3})).is_err());
    }

    #[test]
    fn test_reserved_keys_in_dict_data() {
        let attr = Attr::kv_dict(Attr::string(), Attr::int()).unwrap();
        assert!(update(&attr, json!({"$add": 1})).is_err());
        assert_eq!(
            update(&attr, json!({"$add": {"views": "2"}})),
            Ok(Value::from(json!({"$add": {"views": 2}, "$field": null})))
        );

        let config = EngineConfig::default();
        let registry = FunctionRegistry::new();
        let created = AttrValidator::new(&config, &registry).validate(
            ValidationMode::Create,
            "field",
            &attr,
            &Value::from(json!({"$add": 1})),
            &Document::new(),
        );
        assert_eq!(created, Ok(Value::from(json!({"$add": 1}))));
    }

    #[test]
    fn test_set_index_requires_int_index() {
        let attr = Attr::list(vec![Attr::string()]).unwrap();
        assert_eq!(
            update(&attr, json!({"$set_index": "x", "$index": 2})),
            Ok(Value::from(json!({"$set_index": "x", "$index": 2})))
        );
        assert!(update(&attr, json!({"$set_index": "x"})).is_err());
        assert!(update(&attr, json!({"$set_index": "x", "$index": "2"})).is_err());
    }

    #[test]
    fn test_delete_operators() {
        let list = Attr::list(vec![Attr::int()]).unwrap();
        let dict = Attr::kv_dict(Attr::string(), Attr::int()).unwrap();

        assert!(update(&list, json!({"$del_val": [1, "anything"]})).is_ok());
        assert!(update(&list, json!({"$del_val": 1})).is_err());
        assert!(update(&dict, json!({"$del_val": [1]})).is_err());

        assert!(update(&list, json!({"$del_index": 0})).is_ok());
        assert!(update(&list, json!({"$del_index": "k"})).is_err());
        assert!(update(&dict, json!({"$del_index": "k"})).is_ok());
        assert!(update(&dict, json!({"$del_index": 0})).is_err());
    }

    #[test]
    fn test_typed_view_round_trip() {
        let value = Value::from(json!({"$set_index": 1, "$index": 0}));
        let op = UpdateOperator::from_value(&value).unwrap();
        assert_eq!(op, UpdateOperator::SetIndex { value: Value::Int(1), index: 0 });
        assert_eq!(op.to_value(), value);
    }

    #[test]
    fn test_operators_only_in_update_mode() {
        let config = EngineConfig::default();
        let registry = FunctionRegistry::new();
        let result = AttrValidator::new(&config, &registry).validate(
            ValidationMode::Create,
            "field",
            &Attr::int(),
            &Value::from(json!({"$add": 1})),
            &Document::new(),
        );
        assert!(result.is_err());
    }
}
