//! Acceptance rules for leaf kinds
//!
//! Each check borrows the input and returns a freshly built canonical value,
//! or `None` when the value is rejected.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::schema::patterns;
use crate::schema::{CodeFilter, DomainFilter, NumRange, StrPattern, TemporalKind, TemporalRange};
use crate::value::{ObjectId, Value};

pub(crate) fn check_bool(value: &Value) -> Option<Value> {
    value.as_bool().map(Value::Bool)
}

pub(crate) fn check_int(ranges: &[NumRange], value: &Value) -> Option<Value> {
    let int = match value {
        Value::Int(i) => *i,
        Value::Str(text) if patterns::int_text().is_match(text) => text.parse().ok()?,
        _ => return None,
    };
    in_ranges(ranges, int as f64).then_some(Value::Int(int))
}

pub(crate) fn check_float(ranges: &[NumRange], value: &Value) -> Option<Value> {
    let float = match value {
        Value::Float(f) if !f.is_nan() => *f,
        Value::Int(i) => *i as f64,
        Value::Str(text) if patterns::float_text().is_match(text) => text.parse().ok()?,
        _ => return None,
    };
    in_ranges(ranges, float).then_some(Value::Float(float))
}

fn in_ranges(ranges: &[NumRange], number: f64) -> bool {
    ranges.is_empty() || ranges.iter().any(|range| range.contains(number))
}

pub(crate) fn check_str(pattern: Option<&StrPattern>, value: &Value) -> Option<Value> {
    let text = value.as_str()?;
    match pattern {
        Some(pattern) if !pattern.is_match(text) => None,
        _ => Some(Value::Str(text.to_string())),
    }
}

pub(crate) fn check_bytes(value: &Value) -> Option<Value> {
    match value {
        Value::Bytes(bytes) => Some(Value::Bytes(bytes.clone())),
        _ => None,
    }
}

pub(crate) fn check_temporal(
    kind: TemporalKind,
    ranges: &[TemporalRange],
    value: &Value,
    now: DateTime<Utc>,
) -> Option<Value> {
    let text = value.as_str().filter(|text| kind.matches(text))?;
    if ranges.is_empty() || ranges.iter().any(|range| range.contains(kind, text, now)) {
        Some(Value::Str(text.to_string()))
    } else {
        None
    }
}

/// Suffix match, or `@domain` suffix match when strict
pub(crate) fn check_email(filter: &DomainFilter, value: &Value) -> Option<Value> {
    let text = value.as_str().filter(|t| patterns::email().is_match(t))?;
    let matches = |domain: &String| {
        if filter.strict_matching {
            text.ends_with(&format!("@{}", domain))
        } else {
            text.ends_with(domain.as_str())
        }
    };
    domain_policy(filter, matches).then(|| Value::Str(text.to_string()))
}

/// Host matched exactly when strict, else by suffix
pub(crate) fn check_uri_web(filter: &DomainFilter, value: &Value) -> Option<Value> {
    let text = value.as_str().filter(|t| patterns::uri_web().is_match(t))?;
    let host = text.split('/').nth(2).unwrap_or_default();
    let matches = |domain: &String| {
        if filter.strict_matching {
            host == domain
        } else {
            host.ends_with(domain.as_str())
        }
    };
    domain_policy(filter, matches).then(|| Value::Str(text.to_string()))
}

/// Domain after `@` must equal an allowed entry exactly
pub(crate) fn check_uri_email(filter: &DomainFilter, value: &Value) -> Option<Value> {
    let text = value.as_str().filter(|t| patterns::uri_email().is_match(t))?;
    let domain = text.rsplit('@').next().unwrap_or_default();
    domain_policy(filter, |d| d == domain).then(|| Value::Str(text.to_string()))
}

fn domain_policy<F>(filter: &DomainFilter, matches: F) -> bool
where
    F: Fn(&String) -> bool,
{
    if !filter.allowed_domains.is_empty() {
        filter.allowed_domains.iter().any(&matches)
    } else {
        !filter.disallowed_domains.iter().any(&matches)
    }
}

/// Dial code lists match as prefixes of the number
pub(crate) fn check_uri_tel(filter: &CodeFilter, value: &Value) -> Option<Value> {
    let text = value.as_str().filter(|t| patterns::uri_tel().is_match(t))?;
    let digits = text.trim_start_matches("tel:+");
    let has_prefix = |code: &String| digits.len() > code.len() && digits.starts_with(code.as_str());

    if !filter.allowed_codes.is_empty() && !filter.allowed_codes.iter().any(has_prefix) {
        return None;
    }
    if filter.disallowed_codes.iter().any(has_prefix) {
        return None;
    }
    Some(Value::Str(text.to_string()))
}

pub(crate) fn check_phone(codes: &[String], value: &Value) -> Option<Value> {
    let text = value.as_str().filter(|t| patterns::phone().is_match(t))?;
    let digits = &text[1..];
    let accepted = codes.is_empty()
        || codes
            .iter()
            .any(|code| digits.len() > code.len() && digits.starts_with(code.as_str()));
    accepted.then(|| Value::Str(text.to_string()))
}

pub(crate) fn check_ip(value: &Value) -> Option<Value> {
    let text = value.as_str().filter(|t| patterns::ipv4().is_match(t))?;
    Some(Value::Str(text.to_string()))
}

/// Canonical form is an [`ObjectId`] for `_id*` attributes, hex text otherwise
pub(crate) fn check_id(attr_name: &str, value: &Value) -> Option<Value> {
    let id = match value {
        Value::Id(id) => *id,
        Value::Str(text) => ObjectId::parse_str(text).ok()?,
        Value::Map(map) => match map.get("_id")? {
            Value::Id(id) => *id,
            Value::Str(text) => ObjectId::parse_str(text).ok()?,
            _ => return None,
        },
        _ => return None,
    };
    if attr_name.starts_with("_id") {
        Some(Value::Id(id))
    } else {
        Some(Value::Str(id.to_hex()))
    }
}

/// `{type: "Point", coordinates: [lng, lat]}`
pub(crate) fn check_geo_point(value: &Value) -> Option<Value> {
    let map = value.as_map()?;
    if map.len() != 2 || map.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coordinates = map.get("coordinates")?.as_list()?;
    if coordinates.len() != 2 || coordinates.iter().any(|c| c.as_number().is_none()) {
        return None;
    }
    Some(value.clone())
}

pub(crate) fn check_locales(config: &EngineConfig, value: &Value) -> Option<Value> {
    let locale = value.as_str().filter(|l| config.is_registered(l))?;
    Some(Value::Str(locale.to_string()))
}

pub(crate) fn check_literal(literal: &[Value], value: &Value) -> Option<Value> {
    literal.iter().find(|candidate| *candidate == value).cloned()
}
