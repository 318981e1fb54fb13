//! Descriptor lookup by path
//!
//! In LIST and UNION scopes a numeric segment selects the descriptor
//! branch (`list[i]`, `union[i]`), not a runtime element.

use super::{parse_index, split_segments};
use crate::config::EngineConfig;
use crate::schema::{plain_str, Attr, AttrType, Schema, SchemaError, SchemaResult};

/// Resolves `path` from the top of `schema`; the first segment names an
/// attribute.
pub fn resolve_schema_path<'a>(
    schema: &'a Schema,
    path: &str,
    config: &EngineConfig,
) -> SchemaResult<&'a Attr> {
    let segments = split_segments(path);
    let (first, rest) = segments
        .split_first()
        .ok_or_else(|| SchemaError::path_not_found(path, ""))?;
    let attr = schema
        .get(first)
        .ok_or_else(|| SchemaError::path_not_found(path, first))?;
    resolve_segments(attr, rest, path, config)
}

/// Resolves `path` relative to `attr`. The empty path yields `attr`.
pub fn resolve_attr_path<'a>(
    attr: &'a Attr,
    path: &str,
    config: &EngineConfig,
) -> SchemaResult<&'a Attr> {
    resolve_segments(attr, &split_segments(path), path, config)
}

fn resolve_segments<'a>(
    attr: &'a Attr,
    segments: &[&str],
    path: &str,
    config: &EngineConfig,
) -> SchemaResult<&'a Attr> {
    let mut current = attr;
    for &segment in segments {
        let not_found = || SchemaError::path_not_found(path, segment);
        current = match current.ty() {
            AttrType::Any => return Ok(current),
            AttrType::TypedDict { dict } => dict.get(segment).ok_or_else(not_found)?,
            AttrType::KvDict { val, .. } => val,
            AttrType::List { list: branches, .. } | AttrType::Union { union: branches } => {
                parse_index(segment)
                    .and_then(|i| branches.get(i))
                    .ok_or_else(not_found)?
            }
            AttrType::Locale if config.is_registered(segment) => plain_str(),
            _ => return Err(not_found()),
        };
    }
    Ok(current)
}

/// Leaf descriptors reachable by an update key's remaining segments.
///
/// Unlike [`resolve_attr_path`], a LIST segment is a runtime element index
/// and every LIST alternative is explored. A UNION segment selects the
/// alternative by index, as in [`resolve_attr_path`]. Results keep
/// declaration order.
pub fn update_candidates<'a>(attr: &'a Attr, segments: &[&str], config: &EngineConfig) -> Vec<&'a Attr> {
    let mut out = Vec::new();
    collect_candidates(attr, segments, config, &mut out);
    out
}

fn collect_candidates<'a>(
    attr: &'a Attr,
    segments: &[&str],
    config: &EngineConfig,
    out: &mut Vec<&'a Attr>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(attr);
        return;
    };
    match attr.ty() {
        AttrType::Any => out.push(attr),
        AttrType::TypedDict { dict } => {
            if let Some(child) = dict.get(*segment) {
                collect_candidates(child, rest, config, out);
            }
        }
        AttrType::KvDict { val, .. } => collect_candidates(val, rest, config, out),
        AttrType::Locale => {
            if config.is_registered(segment) {
                collect_candidates(plain_str(), rest, config, out);
            }
        }
        AttrType::List { list, .. } => {
            if parse_index(segment).is_some() {
                for alternative in list {
                    collect_candidates(alternative, rest, config, out);
                }
            }
        }
        AttrType::Union { union } => {
            if let Some(alternative) = parse_index(segment).and_then(|i| union.get(i)) {
                collect_candidates(alternative, rest, config, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttrKind, SchemaBuilder};

    fn config() -> EngineConfig {
        EngineConfig::with_locales(["en", "fr"]).unwrap()
    }

    fn schema() -> Schema {
        SchemaBuilder::new("posts")
            .attr(
                "items",
                Attr::list(vec![Attr::typed_dict([("x", Attr::int())]).unwrap()]).unwrap(),
            )
            .attr("title", Attr::locale())
            .attr("meta", Attr::kv_dict(Attr::string(), Attr::bool()).unwrap())
            .attr("extra", Attr::any())
            .attr(
                "choice",
                Attr::union(vec![Attr::int(), Attr::typed_dict([("y", Attr::string())]).unwrap()])
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_path_through_list_branch() {
        let schema = schema();
        let attr = resolve_schema_path(&schema, "items.0.x", &config()).unwrap();
        assert_eq!(attr.kind(), AttrKind::Int);
        assert!(resolve_schema_path(&schema, "items.1.x", &config()).is_err());
    }

    #[test]
    fn test_path_into_locale() {
        let schema = schema();
        let attr = resolve_schema_path(&schema, "title.fr", &config()).unwrap();
        assert_eq!(attr.kind(), AttrKind::Str);
        assert!(resolve_schema_path(&schema, "title.de", &config()).is_err());
        assert!(resolve_schema_path(&schema, "title.fr.more", &config()).is_err());
    }

    #[test]
    fn test_kv_dict_and_any() {
        let schema = schema();
        let cfg = config();
        assert_eq!(
            resolve_schema_path(&schema, "meta.anything", &cfg).unwrap().kind(),
            AttrKind::Bool
        );
        assert_eq!(
            resolve_schema_path(&schema, "extra.a.b.c", &cfg).unwrap().kind(),
            AttrKind::Any
        );
    }

    #[test]
    fn test_scalar_descent_fails() {
        let schema = schema();
        let err = resolve_schema_path(&schema, "items.0.x.deeper", &config()).unwrap_err();
        assert_eq!(err.code().code(), "ATTR_SCHEMA_PATH_NOT_FOUND");
        assert!(resolve_schema_path(&schema, "missing", &config()).is_err());
    }

    #[test]
    fn test_update_candidates_fan_out() {
        let schema = schema();
        let cfg = config();

        let items = schema.get("items").unwrap();
        let found = update_candidates(items, &["7", "x"], &cfg);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind(), AttrKind::Int);
        assert!(update_candidates(items, &["x"], &cfg).is_empty());

        let choice = schema.get("choice").unwrap();
        let found = update_candidates(choice, &["1", "y"], &cfg);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind(), AttrKind::Str);
        assert!(update_candidates(choice, &["y"], &cfg).is_empty());
        assert!(update_candidates(choice, &["0", "y"], &cfg).is_empty());
    }

    #[test]
    fn test_update_candidates_agree_with_resolution() {
        let schema = schema();
        let cfg = config();
        for path in ["choice.1.y", "items.0.x", "title.fr", "meta.k"] {
            let (root, rest) = path.split_once('.').unwrap();
            let segments: Vec<&str> = rest.split('.').collect();
            let found = update_candidates(schema.get(root).unwrap(), &segments, &cfg);
            let resolved = resolve_schema_path(&schema, path, &cfg).unwrap();
            assert_eq!(found, vec![resolved]);
        }
    }
}
