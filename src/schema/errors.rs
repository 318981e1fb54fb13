//! Schema definition error types
//!
//! Error codes:
//! - ATTR_SCHEMA_MALFORMED (FATAL)
//! - ATTR_SCHEMA_UNKNOWN_KIND (FATAL)
//! - ATTR_SCHEMA_NOT_PORTABLE (FATAL)
//! - ATTR_SCHEMA_UNRESOLVED_CALLBACK (FATAL)
//! - ATTR_SCHEMA_DUPLICATE_CALLBACK (FATAL)
//! - ATTR_SCHEMA_IMMUTABLE (FATAL)
//! - ATTR_SCHEMA_FILE_MALFORMED (FATAL)
//! - ATTR_SCHEMA_PATH_NOT_FOUND (REJECT)
//! - ATTR_SCHEMA_UNKNOWN (REJECT)
//!
//! Fatal errors indicate a programming error in a schema definition and are
//! raised while schemas load. They are never produced by document validation.

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller request rejected
    Reject,
    /// Schema load must abort
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Descriptor constructed with structurally invalid args
    AttrSchemaMalformed,
    /// Portable record names a kind outside the known set
    AttrSchemaUnknownKind,
    /// Descriptor carries an inline callback and cannot be encoded
    AttrSchemaNotPortable,
    /// Named callback is not present in the function registry
    AttrSchemaUnresolvedCallback,
    /// Callback name registered twice
    AttrSchemaDuplicateCallback,
    /// Schema name already registered
    AttrSchemaImmutable,
    /// Schema file unreadable or malformed
    AttrSchemaFileMalformed,
    /// Path segment does not exist in the current scope
    AttrSchemaPathNotFound,
    /// Schema name not registered
    AttrSchemaUnknown,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::AttrSchemaMalformed => "ATTR_SCHEMA_MALFORMED",
            SchemaErrorCode::AttrSchemaUnknownKind => "ATTR_SCHEMA_UNKNOWN_KIND",
            SchemaErrorCode::AttrSchemaNotPortable => "ATTR_SCHEMA_NOT_PORTABLE",
            SchemaErrorCode::AttrSchemaUnresolvedCallback => "ATTR_SCHEMA_UNRESOLVED_CALLBACK",
            SchemaErrorCode::AttrSchemaDuplicateCallback => "ATTR_SCHEMA_DUPLICATE_CALLBACK",
            SchemaErrorCode::AttrSchemaImmutable => "ATTR_SCHEMA_IMMUTABLE",
            SchemaErrorCode::AttrSchemaFileMalformed => "ATTR_SCHEMA_FILE_MALFORMED",
            SchemaErrorCode::AttrSchemaPathNotFound => "ATTR_SCHEMA_PATH_NOT_FOUND",
            SchemaErrorCode::AttrSchemaUnknown => "ATTR_SCHEMA_UNKNOWN",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::AttrSchemaPathNotFound | SchemaErrorCode::AttrSchemaUnknown => {
                Severity::Reject
            }
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error code
    code: SchemaErrorCode,
    /// Human-readable message
    message: String,
    /// Path or attribute the error refers to, if any
    path: Option<String>,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, message: String, path: Option<String>) -> Self {
        Self {
            code,
            message,
            path,
        }
    }

    /// Create an error for a descriptor with invalid args
    pub fn malformed(kind: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::AttrSchemaMalformed,
            format!("Malformed {} descriptor: {}", kind, reason.into()),
            None,
        )
    }

    /// Create an unknown kind error
    pub fn unknown_kind(tag: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::AttrSchemaUnknownKind,
            format!("Unknown attr kind '{}'", tag.into()),
            None,
        )
    }

    /// Create a non-portable descriptor error
    pub fn not_portable(reason: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::AttrSchemaNotPortable,
            format!("Descriptor cannot be encoded: {}", reason.into()),
            None,
        )
    }

    /// Create an unresolved callback error
    pub fn unresolved_callback(role: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            SchemaErrorCode::AttrSchemaUnresolvedCallback,
            format!("No {} registered under '{}'", role, name),
            Some(name),
        )
    }

    /// Create a duplicate callback error
    pub fn duplicate_callback(role: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            SchemaErrorCode::AttrSchemaDuplicateCallback,
            format!("A {} is already registered under '{}'", role, name),
            Some(name),
        )
    }

    /// Create a schema immutable error
    pub fn schema_immutable(schema_name: impl Into<String>) -> Self {
        let name = schema_name.into();
        Self::new(
            SchemaErrorCode::AttrSchemaImmutable,
            format!("Schema '{}' is already registered and immutable", name),
            Some(name),
        )
    }

    /// Create an error for a malformed schema file
    pub fn malformed_schema_file(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            SchemaErrorCode::AttrSchemaFileMalformed,
            format!("Malformed schema file '{}': {}", path, reason.into()),
            Some(path),
        )
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>, segment: &str) -> Self {
        let path = path.into();
        Self::new(
            SchemaErrorCode::AttrSchemaPathNotFound,
            format!("Segment '{}' of path '{}' does not exist", segment, path),
            Some(path),
        )
    }

    /// Create an unknown schema error
    pub fn unknown_schema(schema_name: impl Into<String>) -> Self {
        let name = schema_name.into();
        Self::new(
            SchemaErrorCode::AttrSchemaUnknown,
            format!("Schema '{}' not found", name),
            Some(name),
        )
    }

    /// Prefixes the message with the attribute being built or decoded
    pub fn within(mut self, attr_name: &str) -> Self {
        self.message = format!("{}: {}", attr_name, self.message);
        if self.path.is_none() {
            self.path = Some(attr_name.to_string());
        }
        self
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the path or name this error refers to
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
