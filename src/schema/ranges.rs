//! Range constraints carried by descriptors
//!
//! All ranges are half-open: `lo <= value < hi`. Temporal bounds are either
//! absolute text in the kind's own format or relative offsets such as `+3d`
//! that resolve against the instant captured for a validation call.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use super::errors::{SchemaError, SchemaResult};
use super::patterns;

/// Numeric range for INT and FLOAT descriptors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumRange {
    pub lo: f64,
    pub hi: f64,
}

impl NumRange {
    /// Creates a range; bounds may be infinite but not NaN, and `lo <= hi`.
    pub fn new(lo: f64, hi: f64) -> SchemaResult<Self> {
        if lo.is_nan() || hi.is_nan() {
            return Err(SchemaError::malformed("numeric range", "bound is NaN"));
        }
        if lo > hi {
            return Err(SchemaError::malformed(
                "numeric range",
                format!("lower bound {} exceeds upper bound {}", lo, hi),
            ));
        }
        Ok(Self { lo, hi })
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lo <= value && value < self.hi
    }
}

/// Length range for LIST and KV_DICT descriptors; `max: None` is unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl LenRange {
    pub fn new(min: usize, max: Option<usize>) -> SchemaResult<Self> {
        if let Some(max) = max {
            if min >= max {
                return Err(SchemaError::malformed(
                    "length range",
                    format!("[{}, {}) admits no length", min, max),
                ));
            }
        }
        Ok(Self { min, max })
    }

    /// Unbounded above
    pub fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, len: usize) -> bool {
        len >= self.min && self.max.map_or(true, |max| len < max)
    }
}

/// The three temporal scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    Datetime,
}

impl TemporalKind {
    pub fn name(&self) -> &'static str {
        match self {
            TemporalKind::Date => "DATE",
            TemporalKind::Time => "TIME",
            TemporalKind::Datetime => "DATETIME",
        }
    }

    /// Returns true if `text` is in this kind's canonical format
    pub fn matches(&self, text: &str) -> bool {
        match self {
            TemporalKind::Date => patterns::date().is_match(text),
            TemporalKind::Time => patterns::time().is_match(text),
            TemporalKind::Datetime => patterns::datetime().is_match(text),
        }
    }

    fn permits(&self, unit: DeltaUnit) -> bool {
        match self {
            TemporalKind::Date => matches!(unit, DeltaUnit::Days | DeltaUnit::Weeks),
            TemporalKind::Time => {
                matches!(unit, DeltaUnit::Seconds | DeltaUnit::Minutes | DeltaUnit::Hours)
            }
            TemporalKind::Datetime => true,
        }
    }

    fn format_instant(&self, instant: DateTime<Utc>) -> String {
        match self {
            TemporalKind::Date => instant.format("%Y-%m-%d").to_string(),
            TemporalKind::Time => instant.format("%H:%M:%S%.6f").to_string(),
            TemporalKind::Datetime => instant.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }
}

/// Unit suffix of a relative bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl DeltaUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "s" => Some(DeltaUnit::Seconds),
            "m" => Some(DeltaUnit::Minutes),
            "h" => Some(DeltaUnit::Hours),
            "d" => Some(DeltaUnit::Days),
            "w" => Some(DeltaUnit::Weeks),
            _ => None,
        }
    }

    pub fn suffix(&self) -> char {
        match self {
            DeltaUnit::Seconds => 's',
            DeltaUnit::Minutes => 'm',
            DeltaUnit::Hours => 'h',
            DeltaUnit::Days => 'd',
            DeltaUnit::Weeks => 'w',
        }
    }

    fn seconds(&self) -> i64 {
        match self {
            DeltaUnit::Seconds => 1,
            DeltaUnit::Minutes => 60,
            DeltaUnit::Hours => 3_600,
            DeltaUnit::Days => 86_400,
            DeltaUnit::Weeks => 604_800,
        }
    }

    fn duration(&self, amount: i64) -> Option<Duration> {
        let secs = amount.checked_mul(self.seconds())?;
        if secs.checked_abs()? > i64::MAX / 1_000 {
            return None;
        }
        Some(Duration::seconds(secs))
    }
}

/// One end of a temporal range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBound {
    /// Literal text in the kind's format
    Absolute(String),
    /// Offset from the validation instant
    Relative { amount: i64, unit: DeltaUnit },
}

impl RangeBound {
    /// Parses a bound for the given kind
    pub fn parse(kind: TemporalKind, text: &str) -> SchemaResult<Self> {
        if text.starts_with('+') || text.starts_with('-') {
            let caps = patterns::relative_bound().captures(text).ok_or_else(|| {
                SchemaError::malformed(kind.name(), format!("bad relative bound '{}'", text))
            })?;
            let amount: i64 = caps[1].trim_start_matches('+').parse().map_err(|_| {
                SchemaError::malformed(kind.name(), format!("bound '{}' overflows", text))
            })?;
            let unit = DeltaUnit::from_suffix(&caps[2]).ok_or_else(|| {
                SchemaError::malformed(kind.name(), format!("bad unit in '{}'", text))
            })?;
            if !kind.permits(unit) {
                return Err(SchemaError::malformed(
                    kind.name(),
                    format!("unit '{}' not permitted in '{}'", unit.suffix(), text),
                ));
            }
            return Ok(RangeBound::Relative { amount, unit });
        }

        if !kind.matches(text) {
            return Err(SchemaError::malformed(
                kind.name(),
                format!("bound '{}' is not in {} format", text, kind.name()),
            ));
        }
        Ok(RangeBound::Absolute(text.to_string()))
    }

    /// Resolves to comparable text; `None` when the offset leaves the
    /// representable calendar.
    pub fn resolve(&self, kind: TemporalKind, now: DateTime<Utc>) -> Option<String> {
        match self {
            RangeBound::Absolute(text) => Some(text.clone()),
            RangeBound::Relative { amount, unit } => {
                let instant = now.checked_add_signed(unit.duration(*amount)?)?;
                Some(kind.format_instant(instant))
            }
        }
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeBound::Absolute(text) => write!(f, "{}", text),
            RangeBound::Relative { amount, unit } => {
                write!(f, "{:+}{}", amount, unit.suffix())
            }
        }
    }
}

/// Range for DATE, TIME and DATETIME descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalRange {
    pub lo: RangeBound,
    pub hi: RangeBound,
}

impl TemporalRange {
    pub fn parse(kind: TemporalKind, lo: &str, hi: &str) -> SchemaResult<Self> {
        Ok(Self {
            lo: RangeBound::parse(kind, lo)?,
            hi: RangeBound::parse(kind, hi)?,
        })
    }

    /// Compares ISO text lexicographically, which orders it chronologically
    pub fn contains(&self, kind: TemporalKind, value: &str, now: DateTime<Utc>) -> bool {
        match (self.lo.resolve(kind, now), self.hi.resolve(kind, now)) {
            (Some(lo), Some(hi)) => lo.as_str() <= value && value < hi.as_str(),
            _ => false,
        }
    }
}
