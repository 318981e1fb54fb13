//! Schema loader for loading schemas from disk at startup
//!
//! - Schemas stored at `<schema_dir>/<name>.json`
//! - One file per schema: `{"name": ..., "attrs": {attr: record}}`
//! - Malformed files or unresolved callbacks abort loading (FATAL)

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::builder::{Schema, SchemaBuilder};
use super::codec;
use super::errors::{SchemaError, SchemaResult};
use crate::registry::FunctionRegistry;

/// On-disk layout of one schema
#[derive(Debug, Serialize, Deserialize)]
struct SchemaFile {
    name: String,
    attrs: BTreeMap<String, serde_json::Value>,
}

/// Reads schema files from disk and keeps the published schemas by name.
#[derive(Debug)]
pub struct SchemaLoader {
    /// Directory containing schema files
    schema_dir: PathBuf,
    /// Loaded schemas indexed by name
    schemas: HashMap<String, Schema>,
}

impl SchemaLoader {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            schemas: HashMap::new(),
        }
    }

    /// Returns the schema directory path.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every `*.json` file in the schema directory, verifying named
    /// callbacks against `registry`. A missing directory holds no schemas.
    pub fn load_all(&mut self, registry: &FunctionRegistry) -> SchemaResult<()> {
        if !self.schema_dir.exists() {
            debug!(dir = %self.schema_dir.display(), "schema directory absent");
            return Ok(());
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaError::malformed_schema_file(
                self.schema_dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed_schema_file(
                    self.schema_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();

            // Skip non-JSON files
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        for path in &paths {
            self.load_schema_file(path, registry)?;
        }

        info!(
            dir = %self.schema_dir.display(),
            count = self.schemas.len(),
            "schemas loaded"
        );
        Ok(())
    }

    /// Loads a single schema file.
    fn load_schema_file(&mut self, path: &Path, registry: &FunctionRegistry) -> SchemaResult<()> {
        let shown = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed_schema_file(&shown, format!("Failed to read file: {}", e))
        })?;

        let file: SchemaFile = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed_schema_file(&shown, format!("Invalid JSON: {}", e))
        })?;

        let mut builder = SchemaBuilder::new(&file.name);
        for (name, record) in &file.attrs {
            let attr = codec::decode_json(record).map_err(|e| e.within(name).within(&shown))?;
            builder = builder.attr(name, attr);
        }
        let schema = builder.build().map_err(|e| e.within(&shown))?;

        registry
            .verify_schema(&schema)
            .map_err(|e| e.within(&shown))?;

        debug!(schema = schema.name(), file = %shown, "schema decoded");
        self.register(schema)
    }

    /// Registers a published schema; names are immutable once taken.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<()> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::schema_immutable(schema.name()));
        }
        self.schemas.insert(schema.name().to_string(), schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Like [`get`](Self::get), failing with `ATTR_SCHEMA_UNKNOWN`
    pub fn require(&self, name: &str) -> SchemaResult<&Schema> {
        self.get(name)
            .ok_or_else(|| SchemaError::unknown_schema(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Returns all loaded schemas.
    pub fn all_schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Writes the encoded schema to `<schema_dir>/<name>.json`. Existing
    /// files are never overwritten.
    pub fn save_schema(&self, schema: &Schema) -> SchemaResult<PathBuf> {
        let path = self.schema_dir.join(format!("{}.json", schema.name()));
        let shown = path.display().to_string();

        if path.exists() {
            return Err(SchemaError::schema_immutable(schema.name()));
        }

        let mut attrs = BTreeMap::new();
        for (name, attr) in schema.iter() {
            attrs.insert(name.clone(), codec::encode_json(attr).map_err(|e| e.within(name))?);
        }
        let file = SchemaFile {
            name: schema.name().to_string(),
            attrs,
        };

        if !self.schema_dir.exists() {
            fs::create_dir_all(&self.schema_dir).map_err(|e| {
                SchemaError::malformed_schema_file(
                    self.schema_dir.display().to_string(),
                    format!("Failed to create schema directory: {}", e),
                )
            })?;
        }

        let content = serde_json::to_string_pretty(&file).map_err(|e| {
            SchemaError::malformed_schema_file(&shown, format!("Failed to serialize schema: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            SchemaError::malformed_schema_file(&shown, format!("Failed to write file: {}", e))
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attr;
    use tempfile::TempDir;

    fn sample_schema() -> Schema {
        SchemaBuilder::new("users")
            .attr("_id", Attr::id().with_generator("object_id"))
            .attr("name", Attr::string())
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(temp_dir.path());

        loader.register(sample_schema()).unwrap();

        let schema = loader.get("users");
        assert!(schema.is_some());
        assert_eq!(schema.unwrap().name(), "users");
    }

    #[test]
    fn test_schema_immutability() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(temp_dir.path());

        loader.register(sample_schema()).unwrap();

        // Attempt to register again should fail
        let result = loader.register(sample_schema());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code().code(), "ATTR_SCHEMA_IMMUTABLE");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());

        let schema = sample_schema();
        loader.save_schema(&schema).unwrap();
        assert!(loader.save_schema(&schema).is_err());

        // Load from disk
        let mut loader2 = SchemaLoader::new(temp_dir.path());
        loader2.load_all(&FunctionRegistry::with_builtins()).unwrap();

        assert_eq!(loader2.get("users"), Some(&schema));
    }

    #[test]
    fn test_unresolved_generator_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());
        loader.save_schema(&sample_schema()).unwrap();

        let mut loader2 = SchemaLoader::new(temp_dir.path());
        let err = loader2.load_all(&FunctionRegistry::new()).unwrap_err();
        assert_eq!(err.code().code(), "ATTR_SCHEMA_UNRESOLVED_CALLBACK");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{not json").unwrap();

        let mut loader = SchemaLoader::new(temp_dir.path());
        let err = loader.load_all(&FunctionRegistry::new()).unwrap_err();
        assert_eq!(err.code().code(), "ATTR_SCHEMA_FILE_MALFORMED");
    }

    #[test]
    fn test_unknown_schema() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path());

        assert!(loader.get("nonexistent").is_none());
        assert_eq!(
            loader.require("nonexistent").unwrap_err().code().code(),
            "ATTR_SCHEMA_UNKNOWN"
        );
    }

    #[test]
    fn test_load_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(&temp_dir.path().join("absent"));

        let result = loader.load_all(&FunctionRegistry::new());
        assert!(result.is_ok());
        assert_eq!(loader.schema_count(), 0);
    }
}
