//! Rewrites cell values into SQL-safe text and validates them against the
//! recommended column types.

use crate::{
    config::QualityConfig,
    data::{
        format_float, is_blank, match_temporal, parse_flexible_datetime, parse_float,
        parse_integer, strip_numeric_formatting,
    },
    profile::{ColumnTypeProfile, SqlType},
    table::Table,
};

const DATE_OUTPUT: &str = "%Y-%m-%d";
const TIMESTAMP_OUTPUT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

fn recommended_for(profiles: &[ColumnTypeProfile], column: &str) -> SqlType {
    profiles
        .iter()
        .find(|p| p.column == column)
        .map(|p| p.recommended)
        .unwrap_or(SqlType::Varchar)
}

fn strip_control_chars(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || !(c < ' ' || c == '\u{7f}'))
        .collect();
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn canonical_temporal(value: &str, ty: SqlType) -> Option<String> {
    let parsed = match_temporal(value)
        .map(|m| m.to_datetime())
        .or_else(|| parse_flexible_datetime(value))?;
    let layout = if ty == SqlType::TimestampNtz {
        TIMESTAMP_OUTPUT
    } else {
        DATE_OUTPUT
    };
    Some(parsed.format(layout).to_string())
}

fn canonical_integer(value: &str) -> Option<String> {
    let cleaned = strip_numeric_formatting(value);
    if let Some(parsed) = parse_integer(&cleaned) {
        return Some(parsed.to_string());
    }
    // Decimal text such as "12.0" truncates toward zero.
    let parsed = parse_float(&cleaned)?.trunc();
    if parsed < i64::MIN as f64 || parsed > i64::MAX as f64 {
        return None;
    }
    Some((parsed as i64).to_string())
}

fn canonical_float(value: &str) -> Option<String> {
    parse_float(&strip_numeric_formatting(value)).map(format_float)
}

/// Canonical text for one non-blank value under `ty`, or `None` for null.
pub fn sanitize_value(value: &str, ty: SqlType) -> Option<String> {
    match ty {
        SqlType::Varchar => strip_control_chars(value),
        SqlType::Date | SqlType::TimestampNtz => canonical_temporal(value.trim(), ty),
        SqlType::Integer => canonical_integer(value),
        SqlType::Float => canonical_float(value),
    }
}

/// Applies [`sanitize_value`] to every cell; missing-like literals become null
/// in every column.
pub fn sanitize_table(table: &mut Table, profiles: &[ColumnTypeProfile]) {
    let columns: Vec<(usize, SqlType)> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| (idx, recommended_for(profiles, name)))
        .collect();
    for (idx, ty) in columns {
        for cell in table.column_cells_mut(idx) {
            let next = match cell.as_deref() {
                value if is_blank(value) => None,
                Some(value) => sanitize_value(value, ty),
                None => None,
            };
            *cell = next;
        }
    }
}

/// Checks the pre-sanitized values against their recommended types.
pub fn validate_for_sql(
    table: &Table,
    profiles: &[ColumnTypeProfile],
    cfg: &QualityConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    if table.is_empty() {
        return report;
    }
    for (idx, name) in table.columns().iter().enumerate() {
        let ty = recommended_for(profiles, name);
        let values: Vec<&str> = table
            .column_values(idx)
            .filter(|v| !is_blank(*v))
            .flatten()
            .collect();
        if values.is_empty() {
            continue;
        }
        match ty {
            SqlType::Varchar => {
                let oversized = values
                    .iter()
                    .filter(|v| v.len() > cfg.max_value_bytes)
                    .count();
                let largest = values.iter().map(|v| v.len()).max().unwrap_or(0);
                if oversized > 0 {
                    report.errors.push(format!(
                        "Column '{name}': {oversized} value(s) exceed VARCHAR max ({} bytes)",
                        cfg.max_value_bytes
                    ));
                } else if largest > cfg.large_value_warning_bytes {
                    report.warnings.push(format!(
                        "Column '{name}': Contains very large values (max {largest} bytes)"
                    ));
                }
            }
            SqlType::Integer | SqlType::Float => {
                let invalid = values
                    .iter()
                    .filter(|v| sanitize_value(v, ty).is_none())
                    .count();
                if invalid > 0 {
                    report.warnings.push(format!(
                        "Column '{name}': {invalid} value(s) cannot be converted to {ty}"
                    ));
                }
            }
            SqlType::Date | SqlType::TimestampNtz => {
                let invalid = values
                    .iter()
                    .filter(|v| canonical_temporal(v.trim(), ty).is_none())
                    .count();
                let ratio = invalid as f64 / values.len() as f64;
                if invalid > 0 && ratio > cfg.invalid_temporal_warning_ratio {
                    report.warnings.push(format!(
                        "Column '{name}': {invalid} of {} value(s) ({:.1}%) may not be valid {ty} format",
                        values.len(),
                        ratio * 100.0
                    ));
                }
            }
        }
    }
    report
}
