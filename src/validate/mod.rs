//! Value and document validation
//!
//! Validation checks a value against its descriptor and returns a freshly
//! built canonical value. Defaults fire for absent or malformed values
//! outside update mode; update mode additionally accepts the update
//! operators (`$add`, `$append`, ...).
//!
//! All state a call needs is carried by an [`AttrValidator`]: the engine
//! configuration, the function registry and the instant against which
//! relative temporal bounds resolve.

mod document;
mod errors;
mod locale;
mod operators;
mod scalars;
mod validator;

use std::fmt;

pub use document::validate_document;
pub use errors::{DocumentError, ValidationError, ValidationResult};
pub use operators::{OperatorIndex, UpdateOperator, OPERATOR_KEYS};
pub use validator::{validate_attr, AttrValidator};

/// Validation mode of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    /// Full document; absent attributes are validated as null
    Create,
    /// Only attributes present in the document
    CreateDraft,
    /// Partial update; null is a no-op and operators are accepted
    Update,
    /// Children of composite values
    Deep,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Create => "create",
            ValidationMode::CreateDraft => "create_draft",
            ValidationMode::Update => "update",
            ValidationMode::Deep => "deep",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
