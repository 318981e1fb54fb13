//! Attr Type descriptors
//!
//! Every attribute of every document is described by an [`Attr`]: a kind
//! with kind-specific arguments, an optional default and a nullability flag.
//! Constructors check their arguments and fail with a fatal [`SchemaError`]
//! on a structurally invalid descriptor.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::errors::{SchemaError, SchemaResult};
use super::patterns;
use super::ranges::{LenRange, NumRange, TemporalKind, TemporalRange};
use crate::registry::{DefaultFn, TypeFn};
use crate::value::Value;

/// Tag naming one of the recognised kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKind {
    Any,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Date,
    Time,
    Datetime,
    Email,
    UriWeb,
    UriEmail,
    UriTel,
    Phone,
    Ip,
    Id,
    GeoPoint,
    File,
    Locale,
    Locales,
    Literal,
    List,
    Union,
    KvDict,
    TypedDict,
    Attr,
    Type,
}

impl AttrKind {
    pub const ALL: [AttrKind; 27] = [
        AttrKind::Any,
        AttrKind::Bool,
        AttrKind::Int,
        AttrKind::Float,
        AttrKind::Str,
        AttrKind::Bytes,
        AttrKind::Date,
        AttrKind::Time,
        AttrKind::Datetime,
        AttrKind::Email,
        AttrKind::UriWeb,
        AttrKind::UriEmail,
        AttrKind::UriTel,
        AttrKind::Phone,
        AttrKind::Ip,
        AttrKind::Id,
        AttrKind::GeoPoint,
        AttrKind::File,
        AttrKind::Locale,
        AttrKind::Locales,
        AttrKind::Literal,
        AttrKind::List,
        AttrKind::Union,
        AttrKind::KvDict,
        AttrKind::TypedDict,
        AttrKind::Attr,
        AttrKind::Type,
    ];

    /// Returns the portable tag
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrKind::Any => "ANY",
            AttrKind::Bool => "BOOL",
            AttrKind::Int => "INT",
            AttrKind::Float => "FLOAT",
            AttrKind::Str => "STR",
            AttrKind::Bytes => "BYTES",
            AttrKind::Date => "DATE",
            AttrKind::Time => "TIME",
            AttrKind::Datetime => "DATETIME",
            AttrKind::Email => "EMAIL",
            AttrKind::UriWeb => "URI_WEB",
            AttrKind::UriEmail => "URI_EMAIL",
            AttrKind::UriTel => "URI_TEL",
            AttrKind::Phone => "PHONE",
            AttrKind::Ip => "IP",
            AttrKind::Id => "ID",
            AttrKind::GeoPoint => "GEO_POINT",
            AttrKind::File => "FILE",
            AttrKind::Locale => "LOCALE",
            AttrKind::Locales => "LOCALES",
            AttrKind::Literal => "LITERAL",
            AttrKind::List => "LIST",
            AttrKind::Union => "UNION",
            AttrKind::KvDict => "KV_DICT",
            AttrKind::TypedDict => "TYPED_DICT",
            AttrKind::Attr => "ATTR",
            AttrKind::Type => "TYPE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compiled STR pattern, compared by source text
#[derive(Clone)]
pub struct StrPattern {
    source: String,
    regex: Regex,
}

impl StrPattern {
    /// Compiles `source` as a full-match pattern
    pub fn new(source: &str) -> SchemaResult<Self> {
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            SchemaError::malformed(AttrKind::Str, format!("invalid pattern '{}': {}", source, e))
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for StrPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for StrPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrPattern").field(&self.source).finish()
    }
}

/// Allow/deny domain lists for EMAIL, URI_WEB and URI_EMAIL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainFilter {
    pub allowed_domains: Vec<String>,
    pub disallowed_domains: Vec<String>,
    /// Exact host (or `@domain`) match instead of suffix match
    pub strict_matching: bool,
}

impl DomainFilter {
    pub fn allow<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_domains: domains.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn deny<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disallowed_domains: domains.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict_matching = true;
        self
    }

    fn check(&self, kind: AttrKind) -> SchemaResult<()> {
        if !self.allowed_domains.is_empty() && !self.disallowed_domains.is_empty() {
            return Err(SchemaError::malformed(
                kind,
                "allowed_domains and disallowed_domains are mutually exclusive",
            ));
        }
        if self
            .allowed_domains
            .iter()
            .chain(&self.disallowed_domains)
            .any(|d| d.is_empty())
        {
            return Err(SchemaError::malformed(kind, "empty domain"));
        }
        Ok(())
    }
}

/// Allow/deny dial code lists for URI_TEL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeFilter {
    pub allowed_codes: Vec<String>,
    pub disallowed_codes: Vec<String>,
}

impl CodeFilter {
    fn check(&self) -> SchemaResult<()> {
        match self
            .allowed_codes
            .iter()
            .chain(&self.disallowed_codes)
            .find(|code| !patterns::is_dial_code(code))
        {
            Some(code) => Err(SchemaError::malformed(
                AttrKind::UriTel,
                format!("dial code '{}' is not numeric", code),
            )),
            None => Ok(()),
        }
    }
}

/// Validator callback of a TYPE descriptor
#[derive(Clone)]
pub enum TypeFunc {
    /// Resolved through the function registry; portable
    Named(String),
    /// Closure bound at definition time; not portable
    Inline(TypeFn),
}

impl PartialEq for TypeFunc {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeFunc::Named(a), TypeFunc::Named(b)) => a == b,
            (TypeFunc::Inline(a), TypeFunc::Inline(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for TypeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFunc::Named(name) => f.debug_tuple("Named").field(name).finish(),
            TypeFunc::Inline(_) => f.write_str("Inline(<fn>)"),
        }
    }
}

/// Default used when an attribute is absent or malformed outside update mode
#[derive(Clone)]
pub enum AttrDefault {
    /// Copied on every use
    Static(Value),
    /// Generator resolved through the function registry
    Named(String),
    /// Generator closure; not portable
    Inline(DefaultFn),
}

impl PartialEq for AttrDefault {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrDefault::Static(a), AttrDefault::Static(b)) => a == b,
            (AttrDefault::Named(a), AttrDefault::Named(b)) => a == b,
            (AttrDefault::Inline(a), AttrDefault::Inline(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttrDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrDefault::Static(value) => f.debug_tuple("Static").field(value).finish(),
            AttrDefault::Named(name) => f.debug_tuple("Named").field(name).finish(),
            AttrDefault::Inline(_) => f.write_str("Inline(<fn>)"),
        }
    }
}

/// Kind-specific configuration
#[derive(Debug, Clone, PartialEq)]
pub enum AttrType {
    Any,
    Bool,
    Int { ranges: Vec<NumRange> },
    Float { ranges: Vec<NumRange> },
    Str { pattern: Option<StrPattern> },
    Bytes,
    Date { ranges: Vec<TemporalRange> },
    Time { ranges: Vec<TemporalRange> },
    Datetime { ranges: Vec<TemporalRange> },
    Email(DomainFilter),
    UriWeb(DomainFilter),
    UriEmail(DomainFilter),
    UriTel(CodeFilter),
    Phone { codes: Vec<String> },
    Ip,
    Id,
    GeoPoint,
    File,
    Locale,
    Locales,
    Literal { literal: Vec<Value> },
    List {
        list: Vec<Attr>,
        len_range: Option<LenRange>,
    },
    Union { union: Vec<Attr> },
    KvDict {
        key: Box<Attr>,
        val: Box<Attr>,
        req: Vec<String>,
        len_range: Option<LenRange>,
    },
    TypedDict { dict: BTreeMap<String, Attr> },
    Attr,
    Type { func: TypeFunc },
}

impl AttrType {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrType::Any => AttrKind::Any,
            AttrType::Bool => AttrKind::Bool,
            AttrType::Int { .. } => AttrKind::Int,
            AttrType::Float { .. } => AttrKind::Float,
            AttrType::Str { .. } => AttrKind::Str,
            AttrType::Bytes => AttrKind::Bytes,
            AttrType::Date { .. } => AttrKind::Date,
            AttrType::Time { .. } => AttrKind::Time,
            AttrType::Datetime { .. } => AttrKind::Datetime,
            AttrType::Email(_) => AttrKind::Email,
            AttrType::UriWeb(_) => AttrKind::UriWeb,
            AttrType::UriEmail(_) => AttrKind::UriEmail,
            AttrType::UriTel(_) => AttrKind::UriTel,
            AttrType::Phone { .. } => AttrKind::Phone,
            AttrType::Ip => AttrKind::Ip,
            AttrType::Id => AttrKind::Id,
            AttrType::GeoPoint => AttrKind::GeoPoint,
            AttrType::File => AttrKind::File,
            AttrType::Locale => AttrKind::Locale,
            AttrType::Locales => AttrKind::Locales,
            AttrType::Literal { .. } => AttrKind::Literal,
            AttrType::List { .. } => AttrKind::List,
            AttrType::Union { .. } => AttrKind::Union,
            AttrType::KvDict { .. } => AttrKind::KvDict,
            AttrType::TypedDict { .. } => AttrKind::TypedDict,
            AttrType::Attr => AttrKind::Attr,
            AttrType::Type { .. } => AttrKind::Type,
        }
    }
}

/// A schema descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    ty: AttrType,
    default: Option<AttrDefault>,
    allow_none: bool,
}

impl From<AttrType> for Attr {
    fn from(ty: AttrType) -> Self {
        Self {
            ty,
            default: None,
            allow_none: false,
        }
    }
}

impl Attr {
    pub fn ty(&self) -> &AttrType {
        &self.ty
    }

    pub fn kind(&self) -> AttrKind {
        self.ty.kind()
    }

    pub fn default(&self) -> Option<&AttrDefault> {
        self.default.as_ref()
    }

    pub fn allow_none(&self) -> bool {
        self.allow_none
    }

    /// Attaches a default
    pub fn with_default(mut self, default: AttrDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Attaches a static default value
    pub fn with_static_default(self, value: impl Into<Value>) -> Self {
        self.with_default(AttrDefault::Static(value.into()))
    }

    /// Attaches a named default generator
    pub fn with_generator(self, name: impl Into<String>) -> Self {
        self.with_default(AttrDefault::Named(name.into()))
    }

    /// Accepts explicit null when no default applies
    pub fn nullable(mut self) -> Self {
        self.allow_none = true;
        self
    }

    pub(crate) fn ty_mut(&mut self) -> &mut AttrType {
        &mut self.ty
    }

    pub(crate) fn set_default(&mut self, default: Option<AttrDefault>) {
        self.default = default;
    }

    pub(crate) fn set_allow_none(&mut self, allow_none: bool) {
        self.allow_none = allow_none;
    }

    /// Direct child descriptors of a composite kind
    pub fn children(&self) -> Vec<&Attr> {
        match &self.ty {
            AttrType::List { list, .. } => list.iter().collect(),
            AttrType::Union { union } => union.iter().collect(),
            AttrType::KvDict { key, val, .. } => vec![key.as_ref(), val.as_ref()],
            AttrType::TypedDict { dict } => dict.values().collect(),
            _ => Vec::new(),
        }
    }

    // Scalars

    pub fn any() -> Self {
        AttrType::Any.into()
    }

    pub fn bool() -> Self {
        AttrType::Bool.into()
    }

    pub fn int() -> Self {
        AttrType::Int { ranges: Vec::new() }.into()
    }

    pub fn int_ranged(ranges: &[(f64, f64)]) -> SchemaResult<Self> {
        Ok(AttrType::Int {
            ranges: num_ranges(ranges)?,
        }
        .into())
    }

    pub fn float() -> Self {
        AttrType::Float { ranges: Vec::new() }.into()
    }

    pub fn float_ranged(ranges: &[(f64, f64)]) -> SchemaResult<Self> {
        Ok(AttrType::Float {
            ranges: num_ranges(ranges)?,
        }
        .into())
    }

    pub fn string() -> Self {
        AttrType::Str { pattern: None }.into()
    }

    pub fn string_pattern(pattern: &str) -> SchemaResult<Self> {
        Ok(AttrType::Str {
            pattern: Some(StrPattern::new(pattern)?),
        }
        .into())
    }

    pub fn bytes() -> Self {
        AttrType::Bytes.into()
    }

    pub fn date() -> Self {
        AttrType::Date { ranges: Vec::new() }.into()
    }

    pub fn date_ranged(ranges: &[(&str, &str)]) -> SchemaResult<Self> {
        Ok(AttrType::Date {
            ranges: temporal_ranges(TemporalKind::Date, ranges)?,
        }
        .into())
    }

    pub fn time() -> Self {
        AttrType::Time { ranges: Vec::new() }.into()
    }

    pub fn time_ranged(ranges: &[(&str, &str)]) -> SchemaResult<Self> {
        Ok(AttrType::Time {
            ranges: temporal_ranges(TemporalKind::Time, ranges)?,
        }
        .into())
    }

    pub fn datetime() -> Self {
        AttrType::Datetime { ranges: Vec::new() }.into()
    }

    pub fn datetime_ranged(ranges: &[(&str, &str)]) -> SchemaResult<Self> {
        Ok(AttrType::Datetime {
            ranges: temporal_ranges(TemporalKind::Datetime, ranges)?,
        }
        .into())
    }

    pub fn email() -> Self {
        AttrType::Email(DomainFilter::default()).into()
    }

    pub fn email_with(filter: DomainFilter) -> SchemaResult<Self> {
        filter.check(AttrKind::Email)?;
        Ok(AttrType::Email(filter).into())
    }

    pub fn uri_web() -> Self {
        AttrType::UriWeb(DomainFilter::default()).into()
    }

    pub fn uri_web_with(filter: DomainFilter) -> SchemaResult<Self> {
        filter.check(AttrKind::UriWeb)?;
        Ok(AttrType::UriWeb(filter).into())
    }

    pub fn uri_email() -> Self {
        AttrType::UriEmail(DomainFilter::default()).into()
    }

    /// Domains always match exactly for URI_EMAIL
    pub fn uri_email_with(mut filter: DomainFilter) -> SchemaResult<Self> {
        filter.check(AttrKind::UriEmail)?;
        filter.strict_matching = false;
        Ok(AttrType::UriEmail(filter).into())
    }

    pub fn uri_tel() -> Self {
        AttrType::UriTel(CodeFilter::default()).into()
    }

    pub fn uri_tel_with(filter: CodeFilter) -> SchemaResult<Self> {
        filter.check()?;
        Ok(AttrType::UriTel(filter).into())
    }

    pub fn phone() -> Self {
        AttrType::Phone { codes: Vec::new() }.into()
    }

    pub fn phone_with_codes<I, S>(codes: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        if let Some(code) = codes.iter().find(|code| !patterns::is_dial_code(code)) {
            return Err(SchemaError::malformed(
                AttrKind::Phone,
                format!("dial code '{}' is not numeric", code),
            ));
        }
        Ok(AttrType::Phone { codes }.into())
    }

    pub fn ip() -> Self {
        AttrType::Ip.into()
    }

    pub fn id() -> Self {
        AttrType::Id.into()
    }

    pub fn geo_point() -> Self {
        AttrType::GeoPoint.into()
    }

    pub fn file() -> Self {
        AttrType::File.into()
    }

    pub fn locale() -> Self {
        AttrType::Locale.into()
    }

    pub fn locales() -> Self {
        AttrType::Locales.into()
    }

    /// Descriptor whose values are themselves encoded descriptors
    pub fn meta() -> Self {
        AttrType::Attr.into()
    }

    pub fn literal<I, V>(values: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let literal: Vec<Value> = values.into_iter().map(Into::into).collect();
        if literal.is_empty() {
            return Err(SchemaError::malformed(AttrKind::Literal, "empty literal set"));
        }
        Ok(AttrType::Literal { literal }.into())
    }

    // Composites

    pub fn list(list: Vec<Attr>) -> SchemaResult<Self> {
        Self::build_list(list, None)
    }

    pub fn list_with_len(list: Vec<Attr>, len_range: LenRange) -> SchemaResult<Self> {
        Self::build_list(list, Some(len_range))
    }

    fn build_list(list: Vec<Attr>, len_range: Option<LenRange>) -> SchemaResult<Self> {
        if list.is_empty() {
            return Err(SchemaError::malformed(AttrKind::List, "no element types"));
        }
        Ok(AttrType::List { list, len_range }.into())
    }

    pub fn union(union: Vec<Attr>) -> SchemaResult<Self> {
        if union.is_empty() {
            return Err(SchemaError::malformed(AttrKind::Union, "no alternatives"));
        }
        Ok(AttrType::Union { union }.into())
    }

    pub fn kv_dict(key: Attr, val: Attr) -> SchemaResult<Self> {
        Self::kv_dict_with(key, val, Vec::new(), None)
    }

    pub fn kv_dict_with(
        key: Attr,
        val: Attr,
        req: Vec<String>,
        len_range: Option<LenRange>,
    ) -> SchemaResult<Self> {
        if !key.yields_text_key() {
            return Err(SchemaError::malformed(
                AttrKind::KvDict,
                format!("{} cannot describe a dictionary key", key.kind()),
            ));
        }
        Ok(AttrType::KvDict {
            key: Box::new(key),
            val: Box::new(val),
            req,
            len_range,
        }
        .into())
    }

    pub fn typed_dict<I, K>(entries: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (K, Attr)>,
        K: Into<String>,
    {
        let mut dict = BTreeMap::new();
        for (name, attr) in entries {
            let name = name.into();
            check_attr_name(AttrKind::TypedDict, &name)?;
            if dict.insert(name.clone(), attr).is_some() {
                return Err(SchemaError::malformed(
                    AttrKind::TypedDict,
                    format!("duplicate key '{}'", name),
                ));
            }
        }
        Ok(AttrType::TypedDict { dict }.into())
    }

    pub fn type_named(name: impl Into<String>) -> SchemaResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::malformed(AttrKind::Type, "empty callback name"));
        }
        Ok(AttrType::Type {
            func: TypeFunc::Named(name),
        }
        .into())
    }

    pub fn type_inline(func: TypeFn) -> Self {
        AttrType::Type {
            func: TypeFunc::Inline(func),
        }
        .into()
    }

    fn yields_text_key(&self) -> bool {
        match &self.ty {
            AttrType::Any
            | AttrType::Str { .. }
            | AttrType::Date { .. }
            | AttrType::Time { .. }
            | AttrType::Datetime { .. }
            | AttrType::Email(_)
            | AttrType::UriWeb(_)
            | AttrType::UriEmail(_)
            | AttrType::UriTel(_)
            | AttrType::Phone { .. }
            | AttrType::Ip
            | AttrType::Id
            | AttrType::Locales
            | AttrType::Literal { .. }
            | AttrType::Type { .. } => true,
            AttrType::Union { union } => union.iter().all(Attr::yields_text_key),
            _ => false,
        }
    }
}

/// Attribute and dictionary key names must be non-empty and dot-free
pub(crate) fn check_attr_name(kind: impl fmt::Display, name: &str) -> SchemaResult<()> {
    if name.is_empty() || name.contains('.') {
        return Err(SchemaError::malformed(
            kind,
            format!("key '{}' must be non-empty and contain no '.'", name),
        ));
    }
    Ok(())
}

fn num_ranges(ranges: &[(f64, f64)]) -> SchemaResult<Vec<NumRange>> {
    ranges.iter().map(|&(lo, hi)| NumRange::new(lo, hi)).collect()
}

fn temporal_ranges(kind: TemporalKind, ranges: &[(&str, &str)]) -> SchemaResult<Vec<TemporalRange>> {
    ranges
        .iter()
        .map(|(lo, hi)| TemporalRange::parse(kind, lo, hi))
        .collect()
}

/// Fixed shape accepted by FILE: a stored reference or an inline upload
pub fn file_shape() -> &'static Attr {
    static SHAPE: OnceLock<Attr> = OnceLock::new();
    SHAPE.get_or_init(|| {
        let variant = |extra: (&str, Attr)| {
            let mut dict = BTreeMap::new();
            dict.insert("name".to_string(), Attr::string());
            dict.insert("lastModified".to_string(), Attr::int());
            dict.insert("type".to_string(), Attr::string());
            dict.insert("size".to_string(), Attr::int());
            dict.insert(extra.0.to_string(), extra.1);
            Attr::from(AttrType::TypedDict { dict })
        };
        Attr::from(AttrType::Union {
            union: vec![variant(("ref", Attr::id())), variant(("content", Attr::bytes()))],
        })
    })
}

/// Unconstrained STR, the child of every LOCALE entry
pub fn plain_str() -> &'static Attr {
    static PLAIN: OnceLock<Attr> = OnceLock::new();
    PLAIN.get_or_init(Attr::string)
}
