use std::collections::{HashMap, HashSet};

use crate::{
    config::KeyConfig,
    data::is_blank,
    error::{NormalizeError, NormalizeResult},
};

pub type Row = Vec<Option<String>>;

/// Body rows of one region under its normalized column identifiers.
///
/// The two tag vectors always have one entry per row; every row mutation goes
/// through [`Table::retain_rows`] so they stay aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
    possible_duplicate: Vec<bool>,
    total_row: Vec<bool>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> NormalizeResult<Self> {
        if columns.is_empty() && !rows.is_empty() {
            return Err(NormalizeError::MissingColumns { rows: rows.len() });
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(NormalizeError::RowWidthMismatch {
                row: idx,
                expected: columns.len(),
                found: row.len(),
            });
        }
        let len = rows.len();
        Ok(Self {
            columns,
            rows,
            possible_duplicate: vec![false; len],
            total_row: vec![false; len],
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(idx).and_then(|cell| cell.as_deref()))
    }

    /// Mutable access to one column's cells, top to bottom.
    pub fn column_cells_mut(&mut self, idx: usize) -> impl Iterator<Item = &mut Option<String>> + '_ {
        self.rows.iter_mut().filter_map(move |row| row.get_mut(idx))
    }

    pub fn possible_duplicate(&self) -> &[bool] {
        &self.possible_duplicate
    }

    pub fn total_row(&self) -> &[bool] {
        &self.total_row
    }

    pub fn set_total_row(&mut self, row: usize, flagged: bool) {
        if let Some(tag) = self.total_row.get_mut(row) {
            *tag = flagged;
        }
    }

    /// Keeps the rows whose `keep` entry is `true`; returns how many were removed.
    pub fn retain_rows(&mut self, keep: &[bool]) -> usize {
        let before = self.rows.len();
        let mut cursor = 0usize;
        let mut rows = std::mem::take(&mut self.rows).into_iter();
        let mut dup = std::mem::take(&mut self.possible_duplicate).into_iter();
        let mut total = std::mem::take(&mut self.total_row).into_iter();
        while let (Some(row), Some(d), Some(t)) = (rows.next(), dup.next(), total.next()) {
            if keep.get(cursor).copied().unwrap_or(true) {
                self.rows.push(row);
                self.possible_duplicate.push(d);
                self.total_row.push(t);
            }
            cursor += 1;
        }
        before - self.rows.len()
    }

    /// Drops rows with no non-blank cell.
    pub fn drop_blank_rows(&mut self) -> usize {
        let keep: Vec<bool> = self
            .rows
            .iter()
            .map(|row| row.iter().any(|cell| !is_blank(cell.as_deref())))
            .collect();
        self.retain_rows(&keep)
    }

    /// Marks every row that has an identical twin elsewhere in the table.
    /// Returns the number of marked rows.
    pub fn mark_duplicates(&mut self) -> usize {
        let mut counts: HashMap<&[Option<String>], usize> = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            *counts.entry(row.as_slice()).or_default() += 1;
        }
        let flags: Vec<bool> = self
            .rows
            .iter()
            .map(|row| counts.get(row.as_slice()).copied().unwrap_or(0) > 1)
            .collect();
        let marked = flags.iter().filter(|&&f| f).count();
        self.possible_duplicate = flags;
        marked
    }

    /// Columns that look like identifiers: mostly filled and mostly distinct.
    pub fn candidate_keys(&self, cfg: &KeyConfig) -> Vec<String> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        let total = self.rows.len() as f64;
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                let values: Vec<&str> = self
                    .column_values(idx)
                    .filter(|v| !is_blank(*v))
                    .flatten()
                    .collect();
                if values.is_empty() {
                    return None;
                }
                let distinct: HashSet<&str> = values.iter().copied().collect();
                let fill_ratio = values.len() as f64 / total;
                let uniqueness = distinct.len() as f64 / values.len() as f64;
                (fill_ratio >= cfg.min_fill_ratio && uniqueness >= cfg.min_uniqueness_ratio)
                    .then(|| name.clone())
            })
            .collect()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }
}
