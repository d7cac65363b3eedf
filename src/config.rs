//! Tunable thresholds for every stage of the normalization pipeline.
//!
//! Each component reads its own section so the heuristics can be adjusted
//! (and tested) independently. All sections deserialize with `#[serde(default)]`,
//! which lets a YAML file override a single threshold without restating the rest.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizeConfig {
    pub regions: RegionConfig,
    pub headers: HeaderConfig,
    pub repeated_headers: RepeatedHeaderConfig,
    pub totals: TotalsPolicy,
    pub context: ContextConfig,
    pub types: TypeThresholds,
    pub quality: QualityConfig,
    pub keys: KeyConfig,
    pub reader: ReaderLimits,
    pub parallel: bool,
}

impl NormalizeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing config YAML")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    pub min_density: f64,
    pub min_rows: usize,
    pub min_cols: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_density: 0.30,
            min_rows: 2,
            min_cols: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaderConfig {
    /// Fraction of the region width a row must fill to count as a header row.
    pub min_density: f64,
    /// Absolute floor for the non-empty cell count of a header row.
    pub min_non_empty: usize,
    pub max_depth: usize,
    /// Continuation rows at or above this numeric share are treated as data.
    pub max_numeric_ratio: f64,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            min_density: 0.30,
            min_non_empty: 2,
            max_depth: 3,
            max_numeric_ratio: 0.50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepeatedHeaderConfig {
    pub overlap_ratio: f64,
    pub positional_ratio: f64,
    /// With a positional match, the overlap count must reach this share of the header set.
    pub min_overlap_fraction: f64,
}

impl Default for RepeatedHeaderConfig {
    fn default() -> Self {
        Self {
            overlap_ratio: 0.70,
            positional_ratio: 0.70,
            min_overlap_fraction: 0.35,
        }
    }
}

/// When a total-looking row is confident enough to be removed.
///
/// A row is flagged when its text contains any of `keywords`; it is dropped only
/// when it also contains one of `specific_keywords` and is either mostly numeric
/// or sits in the trailing `tail_fraction` of the table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TotalsPolicy {
    pub keywords: Vec<String>,
    pub specific_keywords: Vec<String>,
    pub numeric_ratio: f64,
    pub tail_fraction: f64,
    pub drop_high_confidence: bool,
}

impl Default for TotalsPolicy {
    fn default() -> Self {
        let keywords = [
            "total",
            "subtotal",
            "grand total",
            "grand_total",
            "sum",
            "summary",
            "totals",
            "subtotals",
            "合计",
            "总计",
            "小计",
        ];
        let specific = ["grand total", "subtotal", "grand_total"];
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            specific_keywords: specific.iter().map(|k| k.to_string()).collect(),
            numeric_ratio: 0.70,
            tail_fraction: 0.10,
            drop_high_confidence: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub sparse_blank_ratio: f64,
    pub sparse_cardinality_ratio: f64,
    pub low_cardinality_ratio: f64,
    pub keyword_blank_ratio: f64,
    pub keyword_cardinality_ratio: f64,
    pub category_keywords: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        let keywords = [
            "category",
            "group",
            "section",
            "region",
            "department",
            "division",
            "type",
            "class",
            "level",
            "hierarchy",
        ];
        Self {
            sparse_blank_ratio: 0.30,
            sparse_cardinality_ratio: 0.20,
            low_cardinality_ratio: 0.10,
            keyword_blank_ratio: 0.20,
            keyword_cardinality_ratio: 0.30,
            category_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Minimum parse percentages (0-100) for a type recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TypeThresholds {
    pub date_percent: f64,
    pub integer_percent: f64,
    pub float_percent: f64,
}

impl Default for TypeThresholds {
    fn default() -> Self {
        Self {
            date_percent: 80.0,
            integer_percent: 90.0,
            float_percent: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub duplicate_review_rows: usize,
    pub row_reduction_warning_ratio: f64,
    pub large_value_warning_bytes: usize,
    pub max_value_bytes: usize,
    pub invalid_temporal_warning_ratio: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            duplicate_review_rows: 100,
            row_reduction_warning_ratio: 0.5,
            large_value_warning_bytes: 100_000,
            max_value_bytes: 16_777_216,
            invalid_temporal_warning_ratio: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyConfig {
    pub min_fill_ratio: f64,
    pub min_uniqueness_ratio: f64,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            min_fill_ratio: 0.7,
            min_uniqueness_ratio: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderLimits {
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            max_rows: 1_000_000,
            max_cols: 16_384,
        }
    }
}
