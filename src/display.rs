//! Aligned plain-text tables for terminal summaries.

use std::{borrow::Cow, fmt::Write as _};

use crate::{
    metadata::{RunResult, TypeReportRecord},
    region::TableRegion,
};

const COLUMN_GAP: &str = "  ";

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_width(h).max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_width(&flatten_whitespace(cell)));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    let cells: Vec<String> = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let text = flatten_whitespace(value);
            let pad = width.saturating_sub(visible_width(&text));
            format!("{text}{}", " ".repeat(pad))
        })
        .collect();
    cells.join(COLUMN_GAP).trim_end().to_string()
}

/// Character count, skipping ANSI colour sequences.
fn visible_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            chars.by_ref().find(|&next| next == 'm');
        } else {
            width += 1;
        }
    }
    width
}

fn flatten_whitespace(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Table name, row counts and quality flag per table.
pub fn summary_table(result: &RunResult) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = result
        .metadata()
        .map(|meta| {
            vec![
                meta.table_name.clone(),
                meta.table_bounds.clone(),
                meta.rows_in.to_string(),
                meta.rows_out.to_string(),
                meta.columns_after_clean.to_string(),
                meta.quality_flag.to_string(),
            ]
        })
        .collect();
    (
        headers(&["table", "bounds", "rows_in", "rows_out", "columns", "flag"]),
        rows,
    )
}

pub fn type_report_table(records: &[TypeReportRecord]) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.table.clone(),
                r.column.clone(),
                r.recommended_type.to_string(),
                format!("{:.1}", r.pct_int),
                format!("{:.1}", r.pct_float),
                format!("{:.1}", r.pct_date),
                r.sample_values.clone(),
            ]
        })
        .collect();
    (
        headers(&["table", "column", "type", "%int", "%float", "%date", "samples"]),
        rows,
    )
}

/// One line per detected region of a sheet.
pub fn region_row(sheet: &str, region: &TableRegion, depth: usize, columns: &[String]) -> Vec<String> {
    vec![
        sheet.to_string(),
        region.bounds.clone(),
        depth.to_string(),
        columns.join(", "),
    ]
}

pub fn region_headers() -> Vec<String> {
    headers(&["sheet", "bounds", "header_depth", "columns"])
}
