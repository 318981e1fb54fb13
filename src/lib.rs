//! attrschema - declarative attribute-type validation and coercion
//!
//! Schemas map attribute names to descriptors ([`schema::Attr`]). Documents
//! are validated against a schema to produce canonical values, with
//! defaults, locale filling and update operators handled along the way.

pub mod cli;
pub mod config;
pub mod path;
pub mod registry;
pub mod schema;
pub mod validate;
pub mod value;

pub use config::{EngineConfig, LocaleStrategy};
pub use registry::FunctionRegistry;
pub use schema::{Attr, Schema, SchemaBuilder};
pub use validate::{validate_attr, validate_document, AttrValidator, ValidationMode};
pub use value::{Document, Value};
