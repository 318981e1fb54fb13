//! Attr Type descriptor subsystem
//!
//! Descriptors describe every attribute of every document. They are built
//! through checked constructors, assembled into a [`Schema`] by a
//! [`SchemaBuilder`], and may be encoded to a portable record and decoded
//! back through the codec.
//!
//! # Design Principles
//!
//! - Descriptors are immutable once a schema is published
//! - Malformed descriptors fail at construction, never at validation
//! - Callbacks are referenced by name so encoded schemas stay portable

mod builder;
pub mod codec;
mod errors;
mod loader;
pub mod patterns;
mod ranges;
mod types;

pub use builder::{Schema, SchemaBuilder};
pub use codec::{decode, decode_json, encode, encode_json};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::SchemaLoader;
pub use ranges::{DeltaUnit, LenRange, NumRange, RangeBound, TemporalKind, TemporalRange};
pub use types::{
    file_shape, plain_str, Attr, AttrDefault, AttrKind, AttrType, CodeFilter, DomainFilter,
    StrPattern, TypeFunc,
};
