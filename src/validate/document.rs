//! Whole-document validation
//!
//! Every declared attribute is validated independently and all failures
//! are collected. Keys the schema does not declare pass through untouched,
//! except dotted update keys whose first segment is declared: those are
//! resolved against the attribute's descriptor tree.

use tracing::debug;

use super::errors::{DocumentError, ValidationError, ValidationResult};
use super::validator::AttrValidator;
use super::ValidationMode;
use crate::config::EngineConfig;
use crate::path::{split_segments, update_candidates};
use crate::registry::FunctionRegistry;
use crate::schema::{Attr, Schema};
use crate::value::{Document, Value};

impl AttrValidator<'_> {
    /// Validates `doc` against `schema`, returning the canonical document
    pub fn validate_document(
        &self,
        mode: ValidationMode,
        doc: &Document,
        schema: &Schema,
    ) -> Result<Document, DocumentError> {
        let mut out = Document::new();
        let mut errors = Vec::new();

        for (name, attr) in schema.iter() {
            let value = match doc.get(name) {
                Some(value) => value,
                None if mode == ValidationMode::Create => &Value::Null,
                None => continue,
            };
            match self.validate(mode, name, attr, value, doc) {
                Ok(canonical) => {
                    out.insert(name.clone(), canonical);
                }
                Err(e) => errors.push(e),
            }
        }

        for (key, value) in doc {
            if schema.contains(key) {
                continue;
            }
            let declared = key
                .split_once('.')
                .and_then(|(root, rest)| schema.get(root).map(|attr| (attr, rest)));
            let Some((attr, rest)) = declared else {
                out.insert(key.clone(), value.clone());
                continue;
            };
            let result = if mode == ValidationMode::Update {
                self.validate_dotted(key, attr, rest, value, doc)
            } else {
                Err(ValidationError::invalid(key.as_str(), attr.kind(), value))
            };
            match result {
                Ok(canonical) => {
                    out.insert(key.clone(), canonical);
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(out)
        } else {
            debug!(schema = schema.name(), mode = %mode, errors = errors.len(), "document rejected");
            Err(DocumentError::new(errors))
        }
    }

    /// First descriptor reachable through `rest` that accepts the value
    fn validate_dotted(
        &self,
        key: &str,
        root: &Attr,
        rest: &str,
        value: &Value,
        doc: &Document,
    ) -> ValidationResult<Value> {
        let segments = split_segments(rest);
        for candidate in update_candidates(root, &segments, self.config()) {
            match self.validate(ValidationMode::Update, key, candidate, value, doc) {
                Ok(canonical) => return Ok(canonical),
                Err(e) => debug!(attr = key, error = %e, "candidate rejected update"),
            }
        }
        Err(ValidationError::invalid(key, root.kind(), value))
    }
}

/// Validates a document with a freshly captured instant
pub fn validate_document(
    mode: ValidationMode,
    doc: &Document,
    schema: &Schema,
    config: &EngineConfig,
    registry: &FunctionRegistry,
) -> Result<Document, DocumentError> {
    AttrValidator::new(config, registry).validate_document(mode, doc, schema)
}
