//! Advisory per-column SQL type recommendations.
//!
//! Values are counted as integer, else float, else date/timestamp (strict
//! formats only); the recommendation never rewrites the table.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    config::TypeThresholds,
    data::{is_blank, match_temporal, parse_float, parse_integer},
    table::Table,
};

const SAMPLE_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    Integer,
    Float,
    Date,
    TimestampNtz,
    Varchar,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Float => "FLOAT",
            SqlType::Date => "DATE",
            SqlType::TimestampNtz => "TIMESTAMP_NTZ",
            SqlType::Varchar => "VARCHAR",
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, SqlType::Date | SqlType::TimestampNtz)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Integer | SqlType::Float)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTypeProfile {
    pub column: String,
    pub non_blank: usize,
    pub pct_int: f64,
    pub pct_float: f64,
    pub pct_date: f64,
    pub recommended: SqlType,
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct TypeCounts {
    total: usize,
    integer: usize,
    float: usize,
    temporal: usize,
    saw_time: bool,
    samples: Vec<String>,
}

impl TypeCounts {
    fn observe(&mut self, value: &str) {
        let trimmed = value.trim();
        self.total += 1;
        if self.samples.len() < SAMPLE_LIMIT {
            self.samples.push(value.to_string());
        }
        if parse_integer(trimmed).is_some() {
            self.integer += 1;
        } else if parse_float(trimmed).is_some() {
            self.float += 1;
        } else if let Some(matched) = match_temporal(trimmed) {
            self.temporal += 1;
            self.saw_time |= matched.has_time();
        }
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        count as f64 * 100.0 / self.total as f64
    }

    fn decide(&self, thresholds: &TypeThresholds) -> SqlType {
        if self.total == 0 {
            return SqlType::Varchar;
        }
        if self.percent(self.temporal) >= thresholds.date_percent {
            if self.saw_time {
                SqlType::TimestampNtz
            } else {
                SqlType::Date
            }
        } else if self.percent(self.integer) >= thresholds.integer_percent {
            SqlType::Integer
        } else if self.percent(self.float) >= thresholds.float_percent {
            SqlType::Float
        } else {
            SqlType::Varchar
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn profile_column<'a, I>(name: &str, values: I, thresholds: &TypeThresholds) -> ColumnTypeProfile
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = TypeCounts::default();
    for value in values {
        if is_blank(value) {
            continue;
        }
        if let Some(v) = value {
            counts.observe(v);
        }
    }
    ColumnTypeProfile {
        column: name.to_string(),
        non_blank: counts.total,
        pct_int: round_tenth(counts.percent(counts.integer)),
        pct_float: round_tenth(counts.percent(counts.float)),
        pct_date: round_tenth(counts.percent(counts.temporal)),
        recommended: counts.decide(thresholds),
        sample_values: counts.samples,
    }
}

/// One profile per column, in column order.
pub fn profile_table(table: &Table, thresholds: &TypeThresholds) -> Vec<ColumnTypeProfile> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| profile_column(name, table.column_values(idx), thresholds))
        .collect()
}

/// `TYPE(count)` pairs sorted by type name, or `N/A` without columns.
pub fn type_summary(profiles: &[ColumnTypeProfile]) -> String {
    if profiles.is_empty() {
        return "N/A".to_string();
    }
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for profile in profiles {
        *counts.entry(profile.recommended.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(ty, n)| format!("{ty}({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}
