use thiserror::Error;

/// Failures raised inside the normalization engine.
///
/// None of these abort a run: the orchestrator turns them into error-tagged
/// metadata for the table or sheet that produced them.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("row {row} has {found} cell(s) but the table has {expected} column(s)")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("table body has {rows} row(s) but no columns")]
    MissingColumns { rows: usize },
    #[error("region R{min_row}C{min_col}:R{max_row}C{max_col} lies outside a {height}x{width} grid")]
    RegionOutOfBounds {
        min_row: usize,
        max_row: usize,
        min_col: usize,
        max_col: usize,
        height: usize,
        width: usize,
    },
    #[error("sheet '{sheet}' could not be read: {reason}")]
    SheetUnreadable { sheet: String, reason: String },
}

pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;
