//! Raw sheet contents as a rectangular array of optional strings.

use crate::data::has_text;

/// One raw sheet. Always rectangular: ragged input rows are padded with `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Vec<Option<String>>>,
    width: usize,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let cells = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { cells, width }
    }

    /// Builds a grid from plain strings, treating empty strings as absent cells.
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell: String = cell.into();
                        if cell.is_empty() { None } else { Some(cell) }
                    })
                    .collect()
            })
            .collect();
        Self::from_rows(rows)
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|cell| cell.as_deref())
    }

    pub fn row(&self, row: usize) -> &[Option<String>] {
        self.cells.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.cells.iter().map(Vec::as_slice)
    }

    pub fn cell_has_text(&self, row: usize, col: usize) -> bool {
        has_text(self.get(row, col))
    }

    pub fn row_is_blank(&self, row: usize) -> bool {
        (0..self.width).all(|col| !self.cell_has_text(row, col))
    }

    pub fn col_is_blank(&self, col: usize) -> bool {
        (0..self.height()).all(|row| !self.cell_has_text(row, col))
    }

    pub fn non_blank_in_row(&self, row: usize) -> usize {
        (0..self.width)
            .filter(|&col| self.cell_has_text(row, col))
            .count()
    }

    /// Copies the inclusive rectangle `[min_row..=max_row] x [min_col..=max_col]`,
    /// clamped to the grid. A rectangle entirely outside the grid is empty.
    pub fn slice(&self, min_row: usize, max_row: usize, min_col: usize, max_col: usize) -> Grid {
        if self.is_empty() || min_row >= self.height() || min_col >= self.width {
            return Grid::default();
        }
        let max_row = max_row.min(self.height() - 1);
        let max_col = max_col.min(self.width - 1);
        if min_row > max_row || min_col > max_col {
            return Grid::default();
        }
        let rows = (min_row..=max_row)
            .map(|r| self.cells[r][min_col..=max_col].to_vec())
            .collect();
        Grid::from_rows(rows)
    }

    /// Drops rows and columns without any text.
    pub fn without_blank_lines(&self) -> Grid {
        let keep_cols: Vec<usize> = (0..self.width)
            .filter(|&col| !self.col_is_blank(col))
            .collect();
        let rows = (0..self.height())
            .filter(|&row| !self.row_is_blank(row))
            .map(|row| {
                keep_cols
                    .iter()
                    .map(|&col| self.cells[row][col].clone())
                    .collect()
            })
            .collect();
        Grid::from_rows(rows)
    }

    pub fn into_rows(self) -> Vec<Vec<Option<String>>> {
        self.cells
    }
}
