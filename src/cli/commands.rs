//! CLI command implementations
//!
//! Each command boots the same way: load the engine configuration, build
//! the function registry, load every schema from the schema directory.

use std::path::Path;

use serde_json::json;
use tracing::info;

use crate::config::EngineConfig;
use crate::path::resolve_schema_path;
use crate::registry::FunctionRegistry;
use crate::schema::{codec, SchemaLoader};
use crate::validate::{validate_document, ValidationMode};
use crate::value::Value;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

/// Everything a command needs once booted
#[derive(Debug)]
pub struct Engine {
    pub config: EngineConfig,
    pub registry: FunctionRegistry,
    pub loader: SchemaLoader,
}

impl Engine {
    /// Loads configuration (defaults when no file is given) and schemas
    pub fn boot(schema_dir: &Path, config_path: Option<&Path>) -> CliResult<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        let registry = FunctionRegistry::with_builtins();
        registry.verify_config(&config)?;

        let mut loader = SchemaLoader::new(schema_dir);
        loader.load_all(&registry)?;
        info!(
            schemas = loader.schema_count(),
            locales = ?config.locales,
            "engine booted"
        );

        Ok(Self {
            config,
            registry,
            loader,
        })
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command. Failures are
/// reported as a JSON error response before being returned.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message(), e.details())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Validate {
            schema_dir,
            schema,
            mode,
            config,
        } => validate(&schema_dir, &schema, mode.into(), config.as_deref()),
        Command::Resolve {
            schema_dir,
            schema,
            path,
            config,
        } => resolve(&schema_dir, &schema, &path, config.as_deref()),
        Command::Check { schema_dir, config } => check(&schema_dir, config.as_deref()),
    }
}

/// Validate the JSON object on stdin and print its canonical form
pub fn validate(
    schema_dir: &Path,
    schema_name: &str,
    mode: ValidationMode,
    config_path: Option<&Path>,
) -> CliResult<()> {
    let engine = Engine::boot(schema_dir, config_path)?;
    let request = read_request()?;
    let data = validate_request(&engine, schema_name, mode, request)?;
    write_response(data)
}

/// Validates one request against a loaded schema
pub fn validate_request(
    engine: &Engine,
    schema_name: &str,
    mode: ValidationMode,
    request: serde_json::Value,
) -> CliResult<serde_json::Value> {
    let schema = engine.loader.require(schema_name)?;
    let doc = match Value::from(request) {
        Value::Map(doc) => doc,
        other => {
            return Err(CliError::bad_input(format!(
                "Expected a JSON object, got {}",
                other.type_name()
            )))
        }
    };

    let canonical = validate_document(mode, &doc, schema, &engine.config, &engine.registry)
        .map_err(|e| CliError::rejected(&e))?;
    Ok(Value::Map(canonical).to_json())
}

/// Print the encoded descriptor found at `path`
pub fn resolve(
    schema_dir: &Path,
    schema_name: &str,
    path: &str,
    config_path: Option<&Path>,
) -> CliResult<()> {
    let engine = Engine::boot(schema_dir, config_path)?;
    let schema = engine.loader.require(schema_name)?;
    let attr = resolve_schema_path(schema, path, &engine.config)?;
    write_response(codec::encode_json(attr)?)
}

/// Load and verify every schema, listing their names
pub fn check(schema_dir: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let engine = Engine::boot(schema_dir, config_path)?;
    let mut names: Vec<&str> = engine.loader.all_schemas().map(|s| s.name()).collect();
    names.sort_unstable();
    write_response(json!({ "schemas": names }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attr, SchemaBuilder};
    use tempfile::TempDir;

    fn engine() -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(dir.path());
        let schema = SchemaBuilder::new("users")
            .attr("name", Attr::string())
            .attr("age", Attr::int().with_static_default(0))
            .build()
            .unwrap();
        loader.save_schema(&schema).unwrap();

        let engine = Engine::boot(dir.path(), None).unwrap();
        (dir, engine)
    }

    #[test]
    fn test_boot_loads_saved_schemas() {
        let (_dir, engine) = engine();
        assert!(engine.loader.exists("users"));
    }

    #[test]
    fn test_validate_request_canonical_output() {
        let (_dir, engine) = engine();
        let out = validate_request(
            &engine,
            "users",
            ValidationMode::Create,
            json!({"name": "ada", "age": "36"}),
        )
        .unwrap();
        assert_eq!(out, json!({"name": "ada", "age": 36}));
    }

    #[test]
    fn test_validate_request_rejections() {
        let (_dir, engine) = engine();

        let err = validate_request(&engine, "users", ValidationMode::Create, json!({})).unwrap_err();
        assert_eq!(err.code_str(), "ATTR_MISSING");
        assert_eq!(err.details().unwrap()[0]["attr"], "name");

        let err = validate_request(&engine, "users", ValidationMode::Create, json!([1])).unwrap_err();
        assert_eq!(err.code_str(), "ATTRSCHEMA_CLI_BAD_INPUT");

        let err = validate_request(&engine, "posts", ValidationMode::Create, json!({})).unwrap_err();
        assert_eq!(err.code_str(), "ATTR_SCHEMA_UNKNOWN");
    }

    #[test]
    fn test_boot_with_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        let err = Engine::boot(dir.path(), Some(&missing)).unwrap_err();
        assert_eq!(err.code_str(), "ATTRSCHEMA_CLI_CONFIG_ERROR");
    }
}
