//! Header band detection and multi-row header flattening.
//!
//! The band starts at the first row dense enough to be a header. Up to
//! `max_depth - 1` following rows join it while each stays dense and mostly
//! textual; the band is then collapsed column by column into one row.

use crate::{config::HeaderConfig, data::looks_numeric, grid::Grid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBand {
    pub start_row: usize,
    pub depth: usize,
}

impl HeaderBand {
    /// First body row after the band.
    pub fn body_start(&self) -> usize {
        self.start_row + self.depth
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub band: HeaderBand,
    pub raw_headers: Vec<String>,
}

pub fn analyze_header(grid: &Grid, cfg: &HeaderConfig) -> HeaderLayout {
    let band = detect_header_band(grid, cfg);
    let raw_headers = flatten_header(grid, band);
    HeaderLayout { band, raw_headers }
}

fn min_non_empty(width: usize, cfg: &HeaderConfig) -> usize {
    cfg.min_non_empty
        .max((width as f64 * cfg.min_density).floor() as usize)
}

pub fn detect_header_band(grid: &Grid, cfg: &HeaderConfig) -> HeaderBand {
    let fallback = HeaderBand {
        start_row: 0,
        depth: 1,
    };
    if grid.is_empty() {
        return fallback;
    }

    let width = grid.width();
    let threshold = min_non_empty(width, cfg);
    let Some(start_row) = (0..grid.height()).find(|&r| grid.non_blank_in_row(r) >= threshold)
    else {
        return fallback;
    };

    let max_depth = cfg.max_depth.max(1).min(grid.height() - start_row);
    let mut depth = 1;
    for candidate in 2..=max_depth {
        let row = start_row + candidate - 1;
        if !continues_header(grid, row, threshold, cfg) {
            break;
        }
        depth = candidate;
    }
    HeaderBand { start_row, depth }
}

fn continues_header(grid: &Grid, row: usize, threshold: usize, cfg: &HeaderConfig) -> bool {
    let non_empty = grid.non_blank_in_row(row);
    let ratio = non_empty as f64 / grid.width() as f64;
    if non_empty < threshold || ratio < cfg.min_density {
        return false;
    }
    let numeric = grid
        .row(row)
        .iter()
        .flatten()
        .filter(|cell| !cell.trim().is_empty() && looks_numeric(cell.trim()))
        .count();
    (numeric as f64 / non_empty as f64) < cfg.max_numeric_ratio
}

/// Collapses the band into a single row of raw header strings.
///
/// A one-row band is returned verbatim. Deeper bands join the trimmed,
/// non-blank parts of each column with `_`, skipping a part equal to the one
/// before it; columns with no text become `unnamed_col_<n>` (1-based).
pub fn flatten_header(grid: &Grid, band: HeaderBand) -> Vec<String> {
    if band.depth <= 1 {
        return grid
            .row(band.start_row)
            .iter()
            .map(|cell| cell.clone().unwrap_or_default())
            .collect();
    }

    let last_row = (band.start_row + band.depth).min(grid.height());
    (0..grid.width())
        .map(|col| {
            let mut parts: Vec<&str> = Vec::new();
            for row in band.start_row..last_row {
                let Some(text) = grid.get(row, col).map(str::trim) else {
                    continue;
                };
                if text.is_empty() || parts.last() == Some(&text) {
                    continue;
                }
                parts.push(text);
            }
            if parts.is_empty() {
                format!("unnamed_col_{}", col + 1)
            } else {
                parts.join("_")
            }
        })
        .collect()
}
