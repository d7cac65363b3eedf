//! Structural noise inside a table body: header rows repeated mid-table and
//! total/subtotal rows.

use std::collections::HashSet;

use log::debug;

use crate::{
    config::{RepeatedHeaderConfig, TotalsPolicy},
    data::{has_text, looks_numeric},
    table::Table,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalsOutcome {
    pub flagged: usize,
    pub dropped: usize,
}

impl TotalsOutcome {
    /// Flagged rows kept in the table for review.
    pub fn retained(&self) -> usize {
        self.flagged - self.dropped
    }
}

/// Header text a body row is compared against: the normalized identifiers and
/// the lowercased flattened header strings they were built from.
struct HeaderShape {
    by_position: Vec<(String, String)>,
    values: HashSet<String>,
}

impl HeaderShape {
    fn new(columns: &[String], raw_headers: &[String]) -> Self {
        let by_position: Vec<(String, String)> = columns
            .iter()
            .enumerate()
            .map(|(idx, ident)| {
                let raw = raw_headers
                    .get(idx)
                    .map(|h| h.trim().to_lowercase())
                    .unwrap_or_default();
                (ident.to_lowercase(), raw)
            })
            .collect();
        let values = by_position
            .iter()
            .flat_map(|(ident, raw)| [ident.clone(), raw.clone()])
            .filter(|v| !v.is_empty())
            .collect();
        Self {
            by_position,
            values,
        }
    }

    fn size(&self) -> usize {
        self.by_position.len()
    }

    fn matches_at(&self, idx: usize, value: &str) -> bool {
        self.by_position
            .get(idx)
            .is_some_and(|(ident, raw)| value == ident || (!raw.is_empty() && value == raw))
    }
}

fn is_repeated_header(row: &[Option<String>], shape: &HeaderShape, cfg: &RepeatedHeaderConfig) -> bool {
    let lowered: Vec<Option<String>> = row
        .iter()
        .map(|cell| {
            cell.as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        })
        .collect();
    let row_set: HashSet<&str> = lowered.iter().flatten().map(String::as_str).collect();
    if row_set.is_empty() {
        return false;
    }

    let overlap = row_set
        .iter()
        .filter(|v| shape.values.contains(**v))
        .count();
    let overlap_ratio = overlap as f64 / row_set.len() as f64;
    if overlap_ratio >= cfg.overlap_ratio {
        return true;
    }

    let positional = lowered
        .iter()
        .enumerate()
        .filter(|(idx, v)| v.as_deref().is_some_and(|v| shape.matches_at(*idx, v)))
        .count();
    let positional_ratio = positional as f64 / shape.size() as f64;
    positional_ratio >= cfg.positional_ratio
        && overlap as f64 >= cfg.min_overlap_fraction * shape.size() as f64
}

/// Drops body rows that restate the header. Returns the number removed.
pub fn remove_repeated_headers(
    table: &mut Table,
    raw_headers: &[String],
    cfg: &RepeatedHeaderConfig,
) -> usize {
    if table.is_empty() || table.column_count() == 0 {
        return 0;
    }
    let shape = HeaderShape::new(table.columns(), raw_headers);
    let keep: Vec<bool> = table
        .rows()
        .iter()
        .map(|row| !is_repeated_header(row, &shape, cfg))
        .collect();
    let removed = table.retain_rows(&keep);
    if removed > 0 {
        debug!("Dropped {removed} repeated header row(s)");
    }
    removed
}

fn joined_text(row: &[Option<String>]) -> String {
    row.iter()
        .filter_map(|cell| cell.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn numeric_share(row: &[Option<String>]) -> f64 {
    let values: Vec<&str> = row
        .iter()
        .map(|cell| cell.as_deref())
        .filter(|cell| has_text(*cell))
        .flatten()
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    let numeric = values.iter().filter(|v| looks_numeric(v.trim())).count();
    numeric as f64 / values.len() as f64
}

/// Whether row `idx` of an `n`-row table lies in its final `tail_fraction`.
fn in_tail(idx: usize, n: usize, tail_fraction: f64) -> bool {
    idx as f64 >= n as f64 * (1.0 - tail_fraction)
}

/// Tags rows mentioning a total keyword and removes the high-confidence ones.
///
/// A tagged row is removed only when it names a specific keyword and is either
/// mostly numeric or sits in the tail of the table. Everything else stays,
/// carrying `total_row = true`.
pub fn filter_total_rows(table: &mut Table, policy: &TotalsPolicy) -> TotalsOutcome {
    if table.is_empty() {
        return TotalsOutcome::default();
    }
    let keywords: Vec<String> = policy.keywords.iter().map(|k| k.to_lowercase()).collect();
    let specific: Vec<String> = policy
        .specific_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();
    let row_count = table.row_count();

    let mut outcome = TotalsOutcome::default();
    let mut keep = vec![true; table.row_count()];
    let mut flagged_rows = Vec::new();
    for (idx, row) in table.rows().iter().enumerate() {
        let text = joined_text(row);
        if !keywords.iter().any(|k| text.contains(k.as_str())) {
            continue;
        }
        outcome.flagged += 1;
        let has_specific = specific.iter().any(|k| text.contains(k.as_str()));
        let mostly_numeric = numeric_share(row) >= policy.numeric_ratio;
        let near_end = in_tail(idx, row_count, policy.tail_fraction);
        if policy.drop_high_confidence && has_specific && (mostly_numeric || near_end) {
            keep[idx] = false;
            outcome.dropped += 1;
        } else {
            flagged_rows.push(idx);
        }
    }

    for idx in flagged_rows {
        table.set_total_row(idx, true);
    }
    table.retain_rows(&keep);
    debug!(
        "Total rows: {} flagged, {} dropped",
        outcome.flagged, outcome.dropped
    );
    outcome
}
