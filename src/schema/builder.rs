//! Schema assembly and publication
//!
//! A [`SchemaBuilder`] is the only place a descriptor may change after
//! construction (wiring defaults in post-hoc). [`SchemaBuilder::build`]
//! consumes the builder and publishes an immutable, shareable [`Schema`].

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::types::{check_attr_name, Attr, AttrDefault, AttrType};

/// Published attribute map of one document type
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    attrs: Arc<BTreeMap<String, Attr>>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, attr_name: &str) -> Option<&Attr> {
        self.attrs.get(attr_name)
    }

    pub fn contains(&self, attr_name: &str) -> bool {
        self.attrs.contains_key(attr_name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Attr> {
        &self.attrs
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Attr> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// Collects attributes before a schema is published
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    attrs: BTreeMap<String, Attr>,
    error: Option<SchemaError>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
            error: None,
        }
    }

    /// Declares an attribute. Invalid or duplicate names surface from `build`.
    pub fn attr(mut self, name: impl Into<String>, attr: Attr) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        if let Err(e) = check_attr_name("schema", &name) {
            self.error = Some(e);
        } else if self.attrs.insert(name.clone(), attr).is_some() {
            self.error = Some(SchemaError::malformed(
                "schema",
                format!("attribute '{}' declared twice", name),
            ));
        }
        self
    }

    /// Replaces the default of the attribute at `path`, tunnelling through
    /// TYPED_DICT children.
    pub fn set_default(&mut self, path: &str, default: Option<AttrDefault>) -> SchemaResult<()> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut attr = self
            .attrs
            .get_mut(first)
            .ok_or_else(|| SchemaError::path_not_found(path, first))?;

        for segment in segments {
            attr = match attr.ty_mut() {
                AttrType::TypedDict { dict } => dict
                    .get_mut(segment)
                    .ok_or_else(|| SchemaError::path_not_found(path, segment))?,
                _ => return Err(SchemaError::path_not_found(path, segment)),
            };
        }

        attr.set_default(default);
        Ok(())
    }

    pub fn build(self) -> SchemaResult<Schema> {
        if let Some(e) = self.error {
            return Err(e.within(&self.name));
        }
        if self.name.is_empty() {
            return Err(SchemaError::malformed("schema", "empty schema name"));
        }
        Ok(Schema {
            name: self.name,
            attrs: Arc::new(self.attrs),
        })
    }
}
