//! Cell-level parsing helpers shared by the profiler, sanitizer and noise filters.
//!
//! Values stay strings end to end; these helpers only answer "does this text
//! parse as X" and produce canonical renderings.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Literals that mean "no value" even though a cell holds text.
const MISSING_LIKE: &[&str] = &["nan", "none", "null", "n/a"];

/// Date-only formats, tried in order before [`TIMESTAMP_FORMATS`].
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%m-%d-%Y",
];

pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Extra layouts accepted only by the lenient fallback used during sanitizing.
const FLEXIBLE_DATE_FORMATS: &[&str] = &[
    "%d %b %Y", "%d %B %Y", "%b %d, %Y", "%B %d, %Y", "%b %d %Y", "%B %d %Y", "%d-%b-%Y",
    "%d-%b-%y", "%d.%m.%Y", "%Y.%m.%d", "%Y%m%d", "%m/%d/%y",
];

const FLEXIBLE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// `true` for absent cells, whitespace-only text and missing-like literals.
pub fn is_blank(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(raw) => {
            let trimmed = raw.trim();
            trimmed.is_empty() || is_missing_like(trimmed)
        }
    }
}

/// `true` when the cell holds any non-whitespace text.
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|raw| !raw.trim().is_empty())
}

pub fn is_missing_like(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    MISSING_LIKE.contains(&lowered.as_str())
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalMatch {
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl TemporalMatch {
    pub fn has_time(&self) -> bool {
        matches!(self, TemporalMatch::Timestamp(_))
    }

    pub fn to_datetime(self) -> NaiveDateTime {
        match self {
            TemporalMatch::Date(date) => date.and_time(NaiveTime::MIN),
            TemporalMatch::Timestamp(ts) => ts,
        }
    }
}

/// Strict match against the ordered date-only then timestamp format lists.
pub fn match_temporal(value: &str) -> Option<TemporalMatch> {
    let trimmed = value.trim();
    if let Ok(date) = parse_naive_date(trimmed) {
        return Some(TemporalMatch::Date(date));
    }
    parse_naive_datetime(trimmed)
        .ok()
        .map(TemporalMatch::Timestamp)
}

/// Strict formats first, then RFC 3339 / RFC 2822 and a set of common
/// human-written layouts.
pub fn parse_flexible_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if let Some(matched) = match_temporal(trimmed) {
        return Some(matched.to_datetime());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(parsed.naive_local());
    }
    for fmt in FLEXIBLE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in FLEXIBLE_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

pub fn parse_integer(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// Finite floats only; `NaN` and `inf` spellings are rejected.
pub fn parse_float(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// Removes thousands separators, currency and percent symbols, and whitespace.
pub fn strip_numeric_formatting(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ',' | '%') && !CURRENCY_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect()
}

/// Loose numeric test used by the header and total-row heuristics.
pub fn looks_numeric(value: &str) -> bool {
    let cleaned = strip_numeric_formatting(value);
    !cleaned.is_empty() && parse_float(&cleaned).is_some()
}

/// Canonical text for a finite float; integral values keep one decimal place.
pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
