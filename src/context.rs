//! Hierarchical "context" columns: labels written once and implied for the
//! rows below them until the next label.

use std::collections::HashSet;

use crate::{config::ContextConfig, data::is_blank, table::Table};

#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnShape {
    blank_ratio: f64,
    cardinality_ratio: f64,
}

fn column_shape(table: &Table, idx: usize) -> ColumnShape {
    let total = table.row_count();
    let mut blanks = 0usize;
    let mut distinct: HashSet<&str> = HashSet::new();
    let mut non_blank = 0usize;
    for value in table.column_values(idx) {
        if is_blank(value) {
            blanks += 1;
        } else if let Some(v) = value {
            non_blank += 1;
            distinct.insert(v.trim());
        }
    }
    let blank_ratio = if total == 0 {
        0.0
    } else {
        blanks as f64 / total as f64
    };
    // An all-blank column has nothing to fill from; treat it as fully distinct.
    let cardinality_ratio = if non_blank == 0 {
        1.0
    } else {
        distinct.len() as f64 / non_blank as f64
    };
    ColumnShape {
        blank_ratio,
        cardinality_ratio,
    }
}

fn is_context_column(name: &str, shape: ColumnShape, cfg: &ContextConfig) -> bool {
    let lowered = name.to_lowercase();
    let has_keyword = cfg
        .category_keywords
        .iter()
        .any(|kw| lowered.contains(&kw.to_lowercase()));
    (shape.blank_ratio >= cfg.sparse_blank_ratio
        && shape.cardinality_ratio < cfg.sparse_cardinality_ratio)
        || shape.cardinality_ratio < cfg.low_cardinality_ratio
        || (has_keyword
            && (shape.blank_ratio >= cfg.keyword_blank_ratio
                || shape.cardinality_ratio < cfg.keyword_cardinality_ratio))
}

/// Names of the columns that qualify for fill-down, in column order.
pub fn detect_context_columns(table: &Table, cfg: &ContextConfig) -> Vec<String> {
    if table.is_empty() {
        return Vec::new();
    }
    table
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, name)| is_context_column(name, column_shape(table, *idx), cfg))
        .map(|(_, name)| name.clone())
        .collect()
}

/// Replaces blank cells with the closest non-blank value above them.
/// Non-blank cells are rewritten trimmed; leading blanks stay blank.
pub fn fill_down(table: &mut Table, columns: &[String]) {
    for name in columns {
        let Some(idx) = table.column_index(name) else {
            continue;
        };
        let mut last: Option<String> = None;
        for cell in table.column_cells_mut(idx) {
            if is_blank(cell.as_deref()) {
                if let Some(previous) = &last {
                    *cell = Some(previous.clone());
                }
            } else if let Some(value) = cell.as_mut() {
                let trimmed = value.trim().to_string();
                *value = trimmed.clone();
                last = Some(trimmed);
            }
        }
    }
}
