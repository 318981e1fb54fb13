//! Portable record form of descriptors
//!
//! A record is a mapping `{kind, args, allow_none, default}`. Nested
//! descriptors are records themselves. Decoding rebuilds every descriptor
//! through its checked constructor, so a record can never produce a
//! descriptor the constructors would refuse.

use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};
use super::ranges::{LenRange, NumRange, TemporalRange};
use super::types::{Attr, AttrDefault, AttrKind, AttrType, CodeFilter, DomainFilter, TypeFunc};
use crate::value::{Document, Value};

const RECORD_KEYS: [&str; 4] = ["kind", "args", "allow_none", "default"];

static EMPTY: Document = BTreeMap::new();

/// Encodes a descriptor; fails on inline callbacks
pub fn encode(attr: &Attr) -> SchemaResult<Value> {
    let mut record = Document::new();
    record.insert("kind".into(), Value::from(attr.kind().as_str()));
    record.insert("args".into(), Value::Map(encode_args(attr.ty())?));
    record.insert("allow_none".into(), Value::Bool(attr.allow_none()));
    record.insert("default".into(), encode_default(attr.default())?);
    Ok(Value::Map(record))
}

pub fn encode_json(attr: &Attr) -> SchemaResult<serde_json::Value> {
    Ok(encode(attr)?.to_json())
}

/// Decodes a record produced by [`encode`]
pub fn decode(record: &Value) -> SchemaResult<Attr> {
    let map = record
        .as_map()
        .ok_or_else(|| SchemaError::malformed("record", "expected a mapping"))?;

    let tag = map
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::malformed("record", "missing kind tag"))?;
    let kind = AttrKind::from_tag(tag).ok_or_else(|| SchemaError::unknown_kind(tag))?;

    if let Some(key) = map.keys().find(|k| !RECORD_KEYS.contains(&k.as_str())) {
        return Err(SchemaError::malformed(kind, format!("unexpected record key '{}'", key)));
    }

    let mut attr = decode_args(kind, map.get("args"))?;

    match map.get("allow_none") {
        None | Some(Value::Null) => {}
        Some(Value::Bool(allow_none)) => attr.set_allow_none(*allow_none),
        Some(other) => {
            return Err(SchemaError::malformed(
                kind,
                format!("allow_none must be a bool, got {}", other.type_name()),
            ))
        }
    }
    attr.set_default(decode_default(kind, map.get("default"))?);
    Ok(attr)
}

pub fn decode_json(record: &serde_json::Value) -> SchemaResult<Attr> {
    decode(&Value::from(record.clone()))
}

fn encode_default(default: Option<&AttrDefault>) -> SchemaResult<Value> {
    let (key, value) = match default {
        None => return Ok(Value::Null),
        Some(AttrDefault::Static(value)) => ("value", value.clone()),
        Some(AttrDefault::Named(name)) => ("generator", Value::from(name.as_str())),
        Some(AttrDefault::Inline(_)) => {
            return Err(SchemaError::not_portable("inline default generator"))
        }
    };
    let mut map = Document::new();
    map.insert(key.into(), value);
    Ok(Value::Map(map))
}

fn decode_default(kind: AttrKind, value: Option<&Value>) -> SchemaResult<Option<AttrDefault>> {
    let map = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Map(map)) if map.len() == 1 => map,
        Some(_) => {
            return Err(SchemaError::malformed(
                kind,
                "default must be null, {value} or {generator}",
            ))
        }
    };
    match (map.get("value"), map.get("generator")) {
        (Some(value), None) => Ok(Some(AttrDefault::Static(value.clone()))),
        (None, Some(Value::Str(name))) if !name.is_empty() => {
            Ok(Some(AttrDefault::Named(name.clone())))
        }
        _ => Err(SchemaError::malformed(kind, "unrecognised default")),
    }
}

fn encode_args(ty: &AttrType) -> SchemaResult<Document> {
    let mut args = Document::new();
    match ty {
        AttrType::Any
        | AttrType::Bool
        | AttrType::Bytes
        | AttrType::Ip
        | AttrType::Id
        | AttrType::GeoPoint
        | AttrType::File
        | AttrType::Locale
        | AttrType::Locales
        | AttrType::Attr => {}
        AttrType::Int { ranges } | AttrType::Float { ranges } => {
            args.insert("ranges".into(), encode_num_ranges(ranges));
        }
        AttrType::Str { pattern } => {
            let pattern = pattern
                .as_ref()
                .map_or(Value::Null, |p| Value::from(p.source()));
            args.insert("pattern".into(), pattern);
        }
        AttrType::Date { ranges } | AttrType::Time { ranges } | AttrType::Datetime { ranges } => {
            args.insert("ranges".into(), encode_temporal_ranges(ranges));
        }
        AttrType::Email(filter) | AttrType::UriWeb(filter) => {
            encode_domains(&mut args, filter);
            args.insert("strict_matching".into(), Value::Bool(filter.strict_matching));
        }
        AttrType::UriEmail(filter) => encode_domains(&mut args, filter),
        AttrType::UriTel(filter) => {
            args.insert("allowed_codes".into(), strings(&filter.allowed_codes));
            args.insert("disallowed_codes".into(), strings(&filter.disallowed_codes));
        }
        AttrType::Phone { codes } => {
            args.insert("codes".into(), strings(codes));
        }
        AttrType::Literal { literal } => {
            args.insert("literal".into(), Value::List(literal.clone()));
        }
        AttrType::List { list, len_range } => {
            args.insert("list".into(), encode_all(list)?);
            args.insert("len_range".into(), encode_len_range(len_range.as_ref()));
        }
        AttrType::Union { union } => {
            args.insert("union".into(), encode_all(union)?);
        }
        AttrType::KvDict {
            key,
            val,
            req,
            len_range,
        } => {
            args.insert("key".into(), encode(key)?);
            args.insert("val".into(), encode(val)?);
            args.insert("req".into(), strings(req));
            args.insert("len_range".into(), encode_len_range(len_range.as_ref()));
        }
        AttrType::TypedDict { dict } => {
            let mut encoded = Document::new();
            for (name, child) in dict {
                encoded.insert(name.clone(), encode(child).map_err(|e| e.within(name))?);
            }
            args.insert("dict".into(), Value::Map(encoded));
        }
        AttrType::Type { func } => match func {
            TypeFunc::Named(name) => {
                args.insert("func".into(), Value::from(name.as_str()));
            }
            TypeFunc::Inline(_) => return Err(SchemaError::not_portable("inline TYPE callback")),
        },
    }
    Ok(args)
}

fn encode_all(attrs: &[Attr]) -> SchemaResult<Value> {
    attrs
        .iter()
        .map(encode)
        .collect::<SchemaResult<Vec<_>>>()
        .map(Value::List)
}

fn encode_bound(bound: f64) -> Value {
    if bound == f64::INFINITY {
        Value::from("inf")
    } else if bound == f64::NEG_INFINITY {
        Value::from("-inf")
    } else {
        Value::Float(bound)
    }
}

fn encode_num_ranges(ranges: &[NumRange]) -> Value {
    Value::List(
        ranges
            .iter()
            .map(|r| Value::List(vec![encode_bound(r.lo), encode_bound(r.hi)]))
            .collect(),
    )
}

fn encode_temporal_ranges(ranges: &[TemporalRange]) -> Value {
    Value::List(
        ranges
            .iter()
            .map(|r| {
                Value::List(vec![
                    Value::Str(r.lo.to_string()),
                    Value::Str(r.hi.to_string()),
                ])
            })
            .collect(),
    )
}

fn encode_len_range(len_range: Option<&LenRange>) -> Value {
    match len_range {
        None => Value::Null,
        Some(range) => Value::List(vec![
            Value::Int(range.min as i64),
            range.max.map_or(Value::Null, |max| Value::Int(max as i64)),
        ]),
    }
}

fn encode_domains(args: &mut Document, filter: &DomainFilter) {
    args.insert("allowed_domains".into(), strings(&filter.allowed_domains));
    args.insert("disallowed_domains".into(), strings(&filter.disallowed_domains));
}

fn strings(items: &[String]) -> Value {
    Value::List(items.iter().map(|s| Value::from(s.as_str())).collect())
}

/// Read access to a record's `args`, rejecting keys outside `allowed`
struct Args<'a> {
    kind: AttrKind,
    map: &'a Document,
}

impl<'a> Args<'a> {
    fn new(kind: AttrKind, value: Option<&'a Value>, allowed: &[&str]) -> SchemaResult<Self> {
        let map = match value {
            None | Some(Value::Null) => &EMPTY,
            Some(Value::Map(map)) => map,
            Some(other) => {
                return Err(SchemaError::malformed(
                    kind,
                    format!("args must be a mapping, got {}", other.type_name()),
                ))
            }
        };
        if let Some(key) = map.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(SchemaError::malformed(kind, format!("unexpected arg '{}'", key)));
        }
        Ok(Self { kind, map })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> SchemaResult<&'a Value> {
        self.get(key)
            .ok_or_else(|| SchemaError::malformed(self.kind, format!("missing arg '{}'", key)))
    }

    fn wrong(&self, key: &str, expected: &str) -> SchemaError {
        SchemaError::malformed(self.kind, format!("arg '{}' must be {}", key, expected))
    }

    fn list(&self, key: &str) -> SchemaResult<&'a [Value]> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::List(items)) => Ok(items),
            Some(_) => Err(self.wrong(key, "a list")),
        }
    }

    fn strings(&self, key: &str) -> SchemaResult<Vec<String>> {
        self.list(key)?
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(|| self.wrong(key, "a list of strings")))
            .collect()
    }

    fn bool(&self, key: &str) -> SchemaResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.wrong(key, "a bool")),
        }
    }

    fn attrs(&self, key: &str) -> SchemaResult<Vec<Attr>> {
        match self.required(key)? {
            Value::List(items) => items.iter().map(decode).collect(),
            _ => Err(self.wrong(key, "a list of records")),
        }
    }

    fn num_ranges(&self) -> SchemaResult<Vec<(f64, f64)>> {
        self.list("ranges")?
            .iter()
            .map(|range| match range.as_list().map(Vec::as_slice) {
                Some([lo, hi]) => Ok((self.bound(lo)?, self.bound(hi)?)),
                _ => Err(self.wrong("ranges", "a list of [lo, hi] pairs")),
            })
            .collect()
    }

    fn bound(&self, value: &Value) -> SchemaResult<f64> {
        match value {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Str(s) if s == "inf" => Ok(f64::INFINITY),
            Value::Str(s) if s == "-inf" => Ok(f64::NEG_INFINITY),
            _ => Err(self.wrong("ranges", "numeric or \"inf\"/\"-inf\"")),
        }
    }

    fn temporal_ranges(&self) -> SchemaResult<Vec<(&'a str, &'a str)>> {
        self.list("ranges")?
            .iter()
            .map(|range| match range.as_list().map(Vec::as_slice) {
                Some([Value::Str(lo), Value::Str(hi)]) => Ok((lo.as_str(), hi.as_str())),
                _ => Err(self.wrong("ranges", "a list of [lo, hi] text pairs")),
            })
            .collect()
    }

    fn len_range(&self) -> SchemaResult<Option<LenRange>> {
        let Some(value) = self.get("len_range") else {
            return Ok(None);
        };
        let as_len = |v: &Value| v.as_i64().and_then(|i| usize::try_from(i).ok());
        match value.as_list().map(Vec::as_slice) {
            Some([min, Value::Null]) => {
                let min = as_len(min).ok_or_else(|| self.wrong("len_range", "[min, max]"))?;
                Ok(Some(LenRange::at_least(min)))
            }
            Some([min, max]) => match (as_len(min), as_len(max)) {
                (Some(min), Some(max)) => LenRange::new(min, Some(max)).map(Some),
                _ => Err(self.wrong("len_range", "[min, max]")),
            },
            _ => Err(self.wrong("len_range", "[min, max]")),
        }
    }

    fn domains(&self) -> SchemaResult<DomainFilter> {
        Ok(DomainFilter {
            allowed_domains: self.strings("allowed_domains")?,
            disallowed_domains: self.strings("disallowed_domains")?,
            strict_matching: self.bool("strict_matching")?,
        })
    }
}

fn decode_args(kind: AttrKind, value: Option<&Value>) -> SchemaResult<Attr> {
    const DOMAIN_ARGS: [&str; 3] = ["allowed_domains", "disallowed_domains", "strict_matching"];

    let allowed: &[&str] = match kind {
        AttrKind::Int
        | AttrKind::Float
        | AttrKind::Date
        | AttrKind::Time
        | AttrKind::Datetime => &["ranges"],
        AttrKind::Str => &["pattern"],
        AttrKind::Email | AttrKind::UriWeb => &DOMAIN_ARGS,
        AttrKind::UriEmail => &DOMAIN_ARGS[..2],
        AttrKind::UriTel => &["allowed_codes", "disallowed_codes"],
        AttrKind::Phone => &["codes"],
        AttrKind::Literal => &["literal"],
        AttrKind::List => &["list", "len_range"],
        AttrKind::Union => &["union"],
        AttrKind::KvDict => &["key", "val", "req", "len_range"],
        AttrKind::TypedDict => &["dict"],
        AttrKind::Type => &["func"],
        _ => &[],
    };
    let args = Args::new(kind, value, allowed)?;

    match kind {
        AttrKind::Any => Ok(Attr::any()),
        AttrKind::Bool => Ok(Attr::bool()),
        AttrKind::Int => Attr::int_ranged(&args.num_ranges()?),
        AttrKind::Float => Attr::float_ranged(&args.num_ranges()?),
        AttrKind::Str => match args.get("pattern") {
            None => Ok(Attr::string()),
            Some(Value::Str(pattern)) => Attr::string_pattern(pattern),
            Some(_) => Err(args.wrong("pattern", "a string")),
        },
        AttrKind::Bytes => Ok(Attr::bytes()),
        AttrKind::Date => Attr::date_ranged(&args.temporal_ranges()?),
        AttrKind::Time => Attr::time_ranged(&args.temporal_ranges()?),
        AttrKind::Datetime => Attr::datetime_ranged(&args.temporal_ranges()?),
        AttrKind::Email => Attr::email_with(args.domains()?),
        AttrKind::UriWeb => Attr::uri_web_with(args.domains()?),
        AttrKind::UriEmail => Attr::uri_email_with(args.domains()?),
        AttrKind::UriTel => Attr::uri_tel_with(CodeFilter {
            allowed_codes: args.strings("allowed_codes")?,
            disallowed_codes: args.strings("disallowed_codes")?,
        }),
        AttrKind::Phone => Attr::phone_with_codes(args.strings("codes")?),
        AttrKind::Ip => Ok(Attr::ip()),
        AttrKind::Id => Ok(Attr::id()),
        AttrKind::GeoPoint => Ok(Attr::geo_point()),
        AttrKind::File => Ok(Attr::file()),
        AttrKind::Locale => Ok(Attr::locale()),
        AttrKind::Locales => Ok(Attr::locales()),
        AttrKind::Literal => Attr::literal(args.list("literal")?.iter().cloned()),
        AttrKind::List => {
            let list = args.attrs("list")?;
            match args.len_range()? {
                Some(len_range) => Attr::list_with_len(list, len_range),
                None => Attr::list(list),
            }
        }
        AttrKind::Union => Attr::union(args.attrs("union")?),
        AttrKind::KvDict => Attr::kv_dict_with(
            decode(args.required("key")?)?,
            decode(args.required("val")?)?,
            args.strings("req")?,
            args.len_range()?,
        ),
        AttrKind::TypedDict => match args.required("dict")? {
            Value::Map(dict) => {
                let mut entries = Vec::with_capacity(dict.len());
                for (name, record) in dict {
                    entries.push((name.clone(), decode(record).map_err(|e| e.within(name))?));
                }
                Attr::typed_dict(entries)
            }
            _ => Err(args.wrong("dict", "a mapping of records")),
        },
        AttrKind::Attr => Ok(Attr::meta()),
        AttrKind::Type => match args.required("func")? {
            Value::Str(name) => Attr::type_named(name.as_str()),
            _ => Err(args.wrong("func", "a callback name")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{DefaultFn, TypeCall, TypeFn};
    use crate::validate::ValidationResult;
    use serde_json::json;
    use std::sync::Arc;

    fn round_trip(attr: &Attr) -> Attr {
        decode(&encode(attr).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip_nested() {
        let attr = Attr::typed_dict([
            ("age", Attr::int_ranged(&[(0.0, f64::INFINITY)]).unwrap()),
            (
                "tags",
                Attr::list_with_len(vec![Attr::string()], LenRange::new(1, Some(5)).unwrap())
                    .unwrap(),
            ),
            ("joined", Attr::date_ranged(&[("2020-01-01", "+1d")]).unwrap()),
            (
                "scores",
                Attr::kv_dict(Attr::string(), Attr::float())
                    .unwrap()
                    .with_static_default(Value::Map(Document::new())),
            ),
            ("check", Attr::type_named("is_even").unwrap()),
        ])
        .unwrap()
        .nullable();

        assert_eq!(round_trip(&attr), attr);
    }

    #[test]
    fn test_infinite_bounds_encode_as_text() {
        let attr = Attr::float_ranged(&[(f64::NEG_INFINITY, 0.0)]).unwrap();
        let json = encode_json(&attr).unwrap();
        assert_eq!(json["args"]["ranges"], json!([["-inf", 0.0]]));
    }

    #[test]
    fn test_generator_default() {
        let attr = Attr::datetime().with_generator("utc_now.datetime");
        let json = encode_json(&attr).unwrap();
        assert_eq!(json["default"], json!({"generator": "utc_now.datetime"}));
        assert_eq!(round_trip(&attr), attr);
    }

    #[test]
    fn test_inline_callbacks_not_portable() {
        let func: TypeFn =
            Arc::new(|call: TypeCall<'_>| -> ValidationResult<Value> { Ok(call.value.clone()) });
        let err = encode(&Attr::type_inline(func)).unwrap_err();
        assert_eq!(err.code().code(), "ATTR_SCHEMA_NOT_PORTABLE");

        let generator: DefaultFn = Arc::new(|_: &Document| Value::Int(1));
        let generated = Attr::int().with_default(AttrDefault::Inline(generator));
        assert!(encode(&generated).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected_first() {
        let err = decode_json(&json!({"kind": "BLOB", "args": 5})).unwrap_err();
        assert_eq!(err.code().code(), "ATTR_SCHEMA_UNKNOWN_KIND");
    }

    #[test]
    fn test_unexpected_arg_rejected() {
        let err = decode_json(&json!({"kind": "INT", "args": {"ranges": [], "pattern": "x"}}))
            .unwrap_err();
        assert_eq!(err.code().code(), "ATTR_SCHEMA_MALFORMED");
    }

    #[test]
    fn test_decode_applies_constructor_checks() {
        assert!(decode_json(&json!({"kind": "LIST", "args": {"list": []}})).is_err());
        assert!(decode_json(&json!({
            "kind": "LIST",
            "args": {"list": [{"kind": "STR"}], "len_range": [3, 3]}
        }))
        .is_err());
        assert!(decode_json(&json!({"kind": "DATE", "args": {"ranges": [["+1h", "+2d"]]}})).is_err());
    }

    #[test]
    fn test_decode_minimal_record() {
        let attr = decode_json(&json!({"kind": "STR"})).unwrap();
        assert_eq!(attr, Attr::string());
    }
}
