//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status after its JSON
//! error response has been written.

use std::fmt;
use std::io;

use serde_json::json;

use crate::config::ConfigError;
use crate::schema::SchemaError;
use crate::validate::DocumentError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Request on stdin is not a JSON object
    BadInput,
    /// Schema loading, lookup or path resolution failed
    Schema(crate::schema::SchemaErrorCode),
    /// Document rejected; carries `ATTR_MISSING` or `ATTR_INVALID`
    Rejected(&'static str),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ATTRSCHEMA_CLI_CONFIG_ERROR",
            Self::IoError => "ATTRSCHEMA_CLI_IO_ERROR",
            Self::BadInput => "ATTRSCHEMA_CLI_BAD_INPUT",
            Self::Schema(code) => code.code(),
            Self::Rejected(code) => code,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    details: Option<serde_json::Value>,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn bad_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BadInput, msg)
    }

    /// Rejected document, listing every attribute failure
    pub fn rejected(err: &DocumentError) -> Self {
        let errors = err
            .errors()
            .iter()
            .map(|e| {
                json!({
                    "attr": e.name(),
                    "code": e.code(),
                    "kind": e.kind().as_str(),
                    "observed": e.observed(),
                })
            })
            .collect();
        Self {
            code: CliErrorCode::Rejected(err.code()),
            message: err.to_string(),
            details: Some(serde_json::Value::Array(errors)),
        }
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        Self::new(CliErrorCode::Schema(e.code()), e.message())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
