//! Named callbacks referenced by descriptors
//!
//! Descriptors refer to default generators, TYPE validators and locale
//! fallbacks by stable names so that encoded schemas stay portable. The
//! registry maps those names back to executable functions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::config::{EngineConfig, LocaleStrategy};
use crate::schema::{Attr, AttrDefault, AttrType, Schema, SchemaError, SchemaResult, TypeFunc};
use crate::validate::{ValidationMode, ValidationResult};
use crate::value::{Document, ObjectId, Value};

/// Produces a default from the document being validated
pub type DefaultFn = Arc<dyn Fn(&Document) -> Value + Send + Sync>;

/// Validates a TYPE attribute; the returned value is taken as canonical
pub type TypeFn = Arc<dyn Fn(TypeCall<'_>) -> ValidationResult<Value> + Send + Sync>;

/// Produces the value of a locale missing from a LOCALE attribute
pub type LocaleFallbackFn = Arc<dyn Fn(&Document, &str) -> Value + Send + Sync>;

/// Arguments handed to a TYPE validator
#[derive(Debug, Clone, Copy)]
pub struct TypeCall<'a> {
    pub mode: ValidationMode,
    pub attr_name: &'a str,
    pub attr: &'a Attr,
    pub value: &'a Value,
}

/// Name → function tables
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    defaults: HashMap<String, DefaultFn>,
    validators: HashMap<String, TypeFn>,
    locale_fallbacks: HashMap<String, LocaleFallbackFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in generators:
    /// `utc_now.datetime`, `utc_now.date` and `object_id`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.defaults.insert(
            "utc_now.datetime".to_string(),
            Arc::new(|_: &Document| {
                Value::Str(Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
            }),
        );
        registry.defaults.insert(
            "utc_now.date".to_string(),
            Arc::new(|_: &Document| Value::Str(Utc::now().format("%Y-%m-%d").to_string())),
        );
        registry.defaults.insert(
            "object_id".to_string(),
            Arc::new(|_: &Document| Value::Id(ObjectId::new())),
        );
        registry
    }

    pub fn register_default<F>(&mut self, name: impl Into<String>, func: F) -> SchemaResult<()>
    where
        F: Fn(&Document) -> Value + Send + Sync + 'static,
    {
        let func: DefaultFn = Arc::new(func);
        insert_unique(&mut self.defaults, "default generator", name.into(), func)
    }

    pub fn register_validator<F>(&mut self, name: impl Into<String>, func: F) -> SchemaResult<()>
    where
        F: Fn(TypeCall<'_>) -> ValidationResult<Value> + Send + Sync + 'static,
    {
        let func: TypeFn = Arc::new(func);
        insert_unique(&mut self.validators, "type validator", name.into(), func)
    }

    pub fn register_locale_fallback<F>(
        &mut self,
        name: impl Into<String>,
        func: F,
    ) -> SchemaResult<()>
    where
        F: Fn(&Document, &str) -> Value + Send + Sync + 'static,
    {
        let func: LocaleFallbackFn = Arc::new(func);
        insert_unique(&mut self.locale_fallbacks, "locale fallback", name.into(), func)
    }

    pub fn default_fn(&self, name: &str) -> Option<&DefaultFn> {
        self.defaults.get(name)
    }

    pub fn validator(&self, name: &str) -> Option<&TypeFn> {
        self.validators.get(name)
    }

    pub fn locale_fallback(&self, name: &str) -> Option<&LocaleFallbackFn> {
        self.locale_fallbacks.get(name)
    }

    /// Checks that every named callback reachable from `attr` is registered.
    pub fn verify(&self, attr: &Attr) -> SchemaResult<()> {
        if let Some(AttrDefault::Named(name)) = attr.default() {
            if !self.defaults.contains_key(name) {
                return Err(SchemaError::unresolved_callback("default generator", name));
            }
        }
        if let AttrType::Type {
            func: TypeFunc::Named(name),
        } = attr.ty()
        {
            if !self.validators.contains_key(name) {
                return Err(SchemaError::unresolved_callback("type validator", name));
            }
        }
        attr.children().into_iter().try_for_each(|child| self.verify(child))
    }

    pub fn verify_schema(&self, schema: &Schema) -> SchemaResult<()> {
        for (name, attr) in schema.iter() {
            self.verify(attr).map_err(|e| e.within(name))?;
        }
        Ok(())
    }

    pub fn verify_config(&self, config: &EngineConfig) -> SchemaResult<()> {
        if let LocaleStrategy::Fallback(name) = &config.locale_strategy {
            if !self.locale_fallbacks.contains_key(name) {
                return Err(SchemaError::unresolved_callback("locale fallback", name));
            }
        }
        Ok(())
    }
}

fn insert_unique<F>(
    table: &mut HashMap<String, F>,
    role: &str,
    name: String,
    func: F,
) -> SchemaResult<()> {
    if table.contains_key(&name) {
        return Err(SchemaError::duplicate_callback(role, name));
    }
    table.insert(name, func);
    Ok(())
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut defaults: Vec<_> = self.defaults.keys().collect();
        let mut validators: Vec<_> = self.validators.keys().collect();
        let mut fallbacks: Vec<_> = self.locale_fallbacks.keys().collect();
        defaults.sort();
        validators.sort();
        fallbacks.sort();
        f.debug_struct("FunctionRegistry")
            .field("defaults", &defaults)
            .field("validators", &validators)
            .field("locale_fallbacks", &fallbacks)
            .finish()
    }
}
