//! Splits a sheet into independent rectangular table regions.
//!
//! Fully blank rows and fully blank columns act as separators. The maximal runs
//! of non-separator rows and columns are crossed to produce candidate
//! rectangles; a candidate survives only if it is large and dense enough.

use serde::Serialize;

use crate::{config::RegionConfig, grid::Grid};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRegion {
    pub min_row: usize,
    pub max_row: usize,
    pub min_col: usize,
    pub max_col: usize,
    /// 1-based `R<row>C<col>:R<row>C<col>` form of the bounds.
    pub bounds: String,
}

impl TableRegion {
    pub fn new(min_row: usize, max_row: usize, min_col: usize, max_col: usize) -> Self {
        let bounds = format!(
            "R{}C{}:R{}C{}",
            min_row + 1,
            min_col + 1,
            max_row + 1,
            max_col + 1
        );
        Self {
            min_row,
            max_row,
            min_col,
            max_col,
            bounds,
        }
    }

    fn whole(grid: &Grid) -> Self {
        Self::new(
            0,
            grid.height().saturating_sub(1),
            0,
            grid.width().saturating_sub(1),
        )
    }

    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    pub fn extract(&self, grid: &Grid) -> Grid {
        grid.slice(self.min_row, self.max_row, self.min_col, self.max_col)
    }

    fn density(&self, grid: &Grid) -> f64 {
        let total = self.height() * self.width();
        if total == 0 {
            return 0.0;
        }
        let filled = (self.min_row..=self.max_row)
            .flat_map(|r| (self.min_col..=self.max_col).map(move |c| (r, c)))
            .filter(|&(r, c)| grid.cell_has_text(r, c))
            .count();
        filled as f64 / total as f64
    }
}

/// Returns the regions of `grid` in row-major order. Never empty for a
/// non-empty grid: when nothing qualifies the whole grid is one region.
pub fn detect_regions(grid: &Grid, cfg: &RegionConfig) -> Vec<TableRegion> {
    if grid.is_empty() {
        return Vec::new();
    }

    let blank_rows: Vec<bool> = (0..grid.height()).map(|r| grid.row_is_blank(r)).collect();
    let blank_cols: Vec<bool> = (0..grid.width()).map(|c| grid.col_is_blank(c)).collect();

    if !blank_rows.iter().any(|&b| b) && !blank_cols.iter().any(|&b| b) {
        return vec![TableRegion::whole(grid)];
    }

    let row_runs = contiguous_runs(&blank_rows);
    let col_runs = contiguous_runs(&blank_cols);

    let mut regions = Vec::new();
    for &(r0, r1) in &row_runs {
        for &(c0, c1) in &col_runs {
            let candidate = TableRegion::new(r0, r1, c0, c1);
            if candidate.height() >= cfg.min_rows
                && candidate.width() >= cfg.min_cols
                && candidate.density(grid) >= cfg.min_density
            {
                regions.push(candidate);
            }
        }
    }

    if regions.is_empty() {
        regions.push(TableRegion::whole(grid));
    }
    regions
}

/// Inclusive `(start, end)` runs of `false` entries between separators.
fn contiguous_runs(separators: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (idx, &is_separator) in separators.iter().enumerate() {
        match (is_separator, start) {
            (false, None) => start = Some(idx),
            (true, Some(s)) => {
                runs.push((s, idx - 1));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, separators.len() - 1));
    }
    runs
}
