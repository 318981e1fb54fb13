//! Per-document validation failures
//!
//! Unlike [`SchemaError`](crate::schema::SchemaError), these are produced
//! for caller data and never indicate a broken schema.

use std::fmt;

use thiserror::Error;

use crate::schema::AttrKind;
use crate::value::Value;

/// Result type for value validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failure of a single attribute
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing attribute '{name}' of kind {kind}")]
    Missing {
        name: String,
        kind: AttrKind,
        observed: &'static str,
    },

    #[error("Invalid attribute '{name}': expected {kind}, got {observed}")]
    Invalid {
        name: String,
        kind: AttrKind,
        observed: &'static str,
    },
}

impl ValidationError {
    pub fn missing(name: impl Into<String>, kind: AttrKind) -> Self {
        ValidationError::Missing {
            name: name.into(),
            kind,
            observed: Value::Null.type_name(),
        }
    }

    pub fn invalid(name: impl Into<String>, kind: AttrKind, value: &Value) -> Self {
        ValidationError::Invalid {
            name: name.into(),
            kind,
            observed: value.type_name(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ValidationError::Missing { name, .. } | ValidationError::Invalid { name, .. } => name,
        }
    }

    pub fn kind(&self) -> AttrKind {
        match self {
            ValidationError::Missing { kind, .. } | ValidationError::Invalid { kind, .. } => *kind,
        }
    }

    /// Runtime type of the offending value
    pub fn observed(&self) -> &'static str {
        match self {
            ValidationError::Missing { observed, .. }
            | ValidationError::Invalid { observed, .. } => observed,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ValidationError::Missing { .. })
    }

    /// Stable code for wire responses
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Missing { .. } => "ATTR_MISSING",
            ValidationError::Invalid { .. } => "ATTR_INVALID",
        }
    }
}

/// Every attribute failure of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentError {
    errors: Vec<ValidationError>,
}

impl DocumentError {
    pub(crate) fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn missing(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_missing())
    }

    pub fn invalid(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| !e.is_missing())
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Code of the first failure; missing attributes take precedence
    pub fn code(&self) -> &'static str {
        self.missing()
            .next()
            .or_else(|| self.errors.first())
            .map_or("ATTR_INVALID", ValidationError::code)
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attribute(s) failed validation", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DocumentError {}

impl From<ValidationError> for DocumentError {
    fn from(error: ValidationError) -> Self {
        Self::new(vec![error])
    }
}
