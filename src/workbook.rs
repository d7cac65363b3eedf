//! Spreadsheet workbooks (xlsx, xlsm, xlsb, xls, ods) read through `calamine`.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    config::ReaderLimits,
    error::{NormalizeError, NormalizeResult},
    grid::Grid,
    pipeline::{SheetGrid, SheetSource},
};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "xla", "xlam", "ods"];

pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// Renders an Excel serial date-time; whole days print without a time part.
pub fn excel_serial_to_iso(serial: f64) -> String {
    let days = serial.floor() as i64;
    let secs = ((serial - serial.floor()) * 86_400.0).round() as i64;
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30) else {
        return serial.to_string();
    };
    let Some(mut date) = u64::try_from(days)
        .ok()
        .and_then(|d| epoch.checked_add_days(Days::new(d)))
    else {
        return serial.to_string();
    };
    // Serial 60 is the phantom 1900-02-29.
    if (1..60).contains(&days) {
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    }
    let secs = secs.clamp(0, 86_399) as u32;
    if secs == 0 {
        return date.format("%Y-%m-%d").to_string();
    }
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, 0) {
        Some(time) => NaiveDateTime::new(date, time)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
        None => date.format("%Y-%m-%d").to_string(),
    }
}

/// Raw text of one cell; `None` for empty cells.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_992.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(serial) => excel_serial_to_iso(serial.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR:{e:?}"),
    };
    (!text.is_empty()).then_some(text)
}

/// Copies a calamine range into a grid anchored at A1, applying the caps.
pub fn range_to_grid(range: &Range<Data>, limits: &ReaderLimits) -> SheetGrid {
    let Some((start_row, start_col)) = range.start() else {
        return SheetGrid::default();
    };
    let (height, width) = range.get_size();
    let (start_row, start_col) = (start_row as usize, start_col as usize);
    let full_height = start_row + height;
    let full_width = start_col + width;
    let capped_height = full_height.min(limits.max_rows);
    let capped_width = full_width.min(limits.max_cols);
    let truncated = capped_height < full_height || capped_width < full_width;

    let mut rows: Vec<Vec<Option<String>>> = vec![vec![None; capped_width]; capped_height];
    for (offset, row) in range.rows().enumerate() {
        let r = start_row + offset;
        if r >= capped_height {
            break;
        }
        for (c_offset, cell) in row.iter().enumerate() {
            let c = start_col + c_offset;
            if c >= capped_width {
                break;
            }
            rows[r][c] = cell_text(cell);
        }
    }
    SheetGrid {
        grid: Grid::from_rows(rows),
        truncated,
    }
}

pub struct WorkbookSource {
    workbook: Sheets<BufReader<File>>,
    limits: ReaderLimits,
}

impl WorkbookSource {
    pub fn open(path: &Path, limits: ReaderLimits) -> Result<Self> {
        let workbook = open_workbook_auto(path)
            .with_context(|| format!("Opening workbook {path:?}"))?;
        Ok(Self { workbook, limits })
    }
}

impl SheetSource for WorkbookSource {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> NormalizeResult<SheetGrid> {
        let range = self
            .workbook
            .worksheet_range(name)
            .map_err(|err| NormalizeError::SheetUnreadable {
                sheet: name.to_string(),
                reason: err.to_string(),
            })?;
        Ok(range_to_grid(&range, &self.limits))
    }
}
