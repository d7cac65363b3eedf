//! Per-table run metadata, quality flags and the run-level result.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::QualityConfig,
    profile::{ColumnTypeProfile, SqlType},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityFlag {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "REVIEW - Warnings present")]
    ReviewWarnings,
    #[serde(rename = "REVIEW - High duplicate count")]
    ReviewDuplicates,
    #[serde(rename = "REVIEW - Totals removed")]
    ReviewTotals,
    #[serde(rename = "REVIEW - Repeated headers removed")]
    ReviewRepeatedHeaders,
    #[serde(rename = "ERROR - Check tab")]
    Error,
}

impl QualityFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityFlag::Ok => "OK",
            QualityFlag::ReviewWarnings => "REVIEW - Warnings present",
            QualityFlag::ReviewDuplicates => "REVIEW - High duplicate count",
            QualityFlag::ReviewTotals => "REVIEW - Totals removed",
            QualityFlag::ReviewRepeatedHeaders => "REVIEW - Repeated headers removed",
            QualityFlag::Error => "ERROR - Check tab",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the sheet could be read at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CleanStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Error => "error",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub table_name: String,
    pub source_tab: String,
    pub source_table_id: String,
    pub clean_status: CleanStatus,
    pub table_bounds: String,
    pub header_row_index: usize,
    pub header_depth_used: usize,
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_after_clean: usize,
    pub columns_after_clean: usize,
    pub duplicate_column_names_fixed: usize,
    pub repeated_header_rows_dropped: usize,
    pub totals_rows_flagged: usize,
    pub totals_rows_dropped: usize,
    pub exact_duplicate_rows: usize,
    pub context_columns_filled: Vec<String>,
    pub candidate_keys: Vec<String>,
    pub type_summary: String,
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub comment: String,
    pub quality_flag: QualityFlag,
}

impl RunMetadata {
    pub fn new(table_name: &str, source_tab: &str, source_table_id: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            source_tab: source_tab.to_string(),
            source_table_id: source_table_id.to_string(),
            clean_status: CleanStatus::Ok,
            table_bounds: String::new(),
            header_row_index: 0,
            header_depth_used: 1,
            rows_in: 0,
            rows_out: 0,
            rows_after_clean: 0,
            columns_after_clean: 0,
            duplicate_column_names_fixed: 0,
            repeated_header_rows_dropped: 0,
            totals_rows_flagged: 0,
            totals_rows_dropped: 0,
            exact_duplicate_rows: 0,
            context_columns_filled: Vec::new(),
            candidate_keys: Vec::new(),
            type_summary: String::new(),
            info: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            comment: String::new(),
            quality_flag: QualityFlag::Ok,
        }
    }

    /// Record for a sheet that could not be read as a grid.
    pub fn sheet_failure(sheet: &str, message: &str) -> Self {
        let mut meta = Self::new(sheet, sheet, "");
        meta.clean_status = CleanStatus::Error;
        meta.header_depth_used = 0;
        meta.errors.push(message.to_string());
        meta.comment = message.to_string();
        meta.quality_flag = QualityFlag::Error;
        meta
    }

    pub fn has_failed(&self) -> bool {
        self.clean_status == CleanStatus::Error || !self.errors.is_empty()
    }

    pub fn quality_flag(&self, cfg: &QualityConfig) -> QualityFlag {
        if self.has_failed() {
            QualityFlag::Error
        } else if !self.warnings.is_empty() {
            QualityFlag::ReviewWarnings
        } else if self.exact_duplicate_rows >= cfg.duplicate_review_rows {
            QualityFlag::ReviewDuplicates
        } else if self.totals_rows_dropped > 0 {
            QualityFlag::ReviewTotals
        } else if self.repeated_header_rows_dropped > 0 {
            QualityFlag::ReviewRepeatedHeaders
        } else {
            QualityFlag::Ok
        }
    }

    pub fn finalize(&mut self, cfg: &QualityConfig) {
        self.quality_flag = self.quality_flag(cfg);
    }
}

const REGION_SPLIT_PREFIX: &str = "Sheet split into ";

/// Warning carried by every table of a sheet that holds several regions.
/// It stays on the tables and is left out of the run-level warning list.
pub fn region_split_warning(count: usize) -> String {
    format!("{REGION_SPLIT_PREFIX}{count} table region(s).")
}

fn is_region_split_warning(message: &str) -> bool {
    message.starts_with(REGION_SPLIT_PREFIX)
}

/// Header of the type report, in field order of [`TypeReportRecord`].
pub const TYPE_REPORT_COLUMNS: [&str; 7] = [
    "table",
    "column",
    "recommended_type",
    "pct_int",
    "pct_float",
    "pct_date",
    "sample_values",
];

/// One row of the advisory type report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeReportRecord {
    pub table: String,
    pub column: String,
    pub recommended_type: SqlType,
    pub pct_int: f64,
    pub pct_float: f64,
    pub pct_date: f64,
    pub sample_values: String,
}

/// A cleaned table with everything the pipeline learned about it.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub metadata: RunMetadata,
    pub table: Table,
    pub profiles: Vec<ColumnTypeProfile>,
}

impl NormalizedTable {
    pub fn name(&self) -> &str {
        &self.metadata.table_name
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub job_id: String,
    pub status: RunStatus,
    pub info: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub tables: Vec<NormalizedTable>,
}

impl RunResult {
    /// Collects per-table messages as `"<table>: <text>"` and derives the status.
    pub fn from_tables(tables: Vec<NormalizedTable>) -> Self {
        let mut info = Vec::new();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        for entry in &tables {
            let name = entry.name();
            let meta = &entry.metadata;
            info.extend(meta.info.iter().map(|m| format!("{name}: {m}")));
            warnings.extend(
                meta.warnings
                    .iter()
                    .filter(|m| !is_region_split_warning(m))
                    .map(|m| format!("{name}: {m}")),
            );
            errors.extend(meta.errors.iter().map(|m| format!("{name}: {m}")));
        }
        let status = if tables.iter().any(|t| t.metadata.has_failed()) {
            RunStatus::Error
        } else if !warnings.is_empty() {
            RunStatus::Partial
        } else {
            RunStatus::Success
        };
        Self {
            job_id: generate_job_id(),
            status,
            info,
            warnings,
            errors,
            tables,
        }
    }

    pub fn table(&self, name: &str) -> Option<&NormalizedTable> {
        self.tables.iter().find(|t| t.name() == name)
    }

    pub fn metadata(&self) -> impl Iterator<Item = &RunMetadata> {
        self.tables.iter().map(|t| &t.metadata)
    }

    pub fn type_report(&self) -> Vec<TypeReportRecord> {
        self.tables
            .iter()
            .flat_map(|entry| {
                entry.profiles.iter().map(move |p| TypeReportRecord {
                    table: entry.name().to_string(),
                    column: p.column.clone(),
                    recommended_type: p.recommended,
                    pct_int: p.pct_int,
                    pct_float: p.pct_float,
                    pct_date: p.pct_date,
                    sample_values: p.sample_values.join(", "),
                })
            })
            .collect()
    }
}

/// Eight hex characters of a random v4 UUID.
pub fn generate_job_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
