//! CLI module for attrschema
//!
//! Provides command-line interface for:
//! - validate: Validate a JSON document read from stdin
//! - resolve: Print the descriptor at a schema path
//! - check: Load and verify a schema directory

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ModeArg};
pub use commands::{check, resolve, run, run_command, validate, validate_request, Engine};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, read_request_from, write_error, write_response};
