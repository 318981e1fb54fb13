//! CLI argument definitions using clap
//!
//! Commands:
//! - attrschema validate --schema-dir <dir> --schema <name> --mode <mode>
//! - attrschema resolve --schema-dir <dir> --schema <name> --path <path>
//! - attrschema check --schema-dir <dir>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::validate::ValidationMode;

/// attrschema - declarative attribute validation and coercion
#[derive(Parser, Debug)]
#[command(name = "attrschema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate one JSON document read from stdin
    Validate {
        /// Directory holding schema files
        #[arg(long, default_value = "./schemas")]
        schema_dir: PathBuf,

        /// Schema to validate against
        #[arg(long)]
        schema: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Create)]
        mode: ModeArg,

        /// Path to engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the encoded descriptor at a schema path
    Resolve {
        #[arg(long, default_value = "./schemas")]
        schema_dir: PathBuf,

        #[arg(long)]
        schema: String,

        /// Dot-separated path, first segment naming the attribute
        #[arg(long)]
        path: String,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load and verify every schema in a directory
    Check {
        #[arg(long, default_value = "./schemas")]
        schema_dir: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Validation modes selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Create,
    CreateDraft,
    Update,
}

impl From<ModeArg> for ValidationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Create => ValidationMode::Create,
            ModeArg::CreateDraft => ValidationMode::CreateDraft,
            ModeArg::Update => ValidationMode::Update,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from([
            "attrschema",
            "validate",
            "--schema",
            "users",
            "--mode",
            "create-draft",
        ])
        .unwrap();
        match cli.command {
            Command::Validate { schema, mode, config, .. } => {
                assert_eq!(schema, "users");
                assert_eq!(mode, ModeArg::CreateDraft);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_resolve_requires_path() {
        assert!(Cli::try_parse_from(["attrschema", "resolve", "--schema", "users"]).is_err());
    }
}
