//! Writes a finished run to disk: one CSV per table, an optional combined CSV,
//! the metadata document and the type report.

use std::{
    collections::HashSet,
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    identifier::table_identifier,
    io_utils::{open_csv_writer, write_table},
    metadata::{NormalizedTable, RunMetadata, RunResult, RunStatus, TYPE_REPORT_COLUMNS},
};

pub const DUPLICATE_FLAG_COLUMN: &str = "__possible_duplicate";
pub const TOTAL_FLAG_COLUMN: &str = "__is_total_row";
pub const SOURCE_TAB_COLUMN: &str = "source_tab";
pub const SOURCE_TABLE_ID_COLUMN: &str = "source_table_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub per_table: bool,
    pub combined: bool,
    pub row_flags: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            per_table: true,
            combined: false,
            row_flags: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct MetaDocument<'a> {
    job_id: &'a str,
    status: RunStatus,
    source_file: &'a str,
    generated_at: String,
    info: &'a [String],
    warnings: &'a [String],
    errors: &'a [String],
    tables: Vec<&'a RunMetadata>,
}

fn flag_text(flag: bool) -> String {
    if flag { "true" } else { "false" }.to_string()
}

fn table_rows(entry: &NormalizedTable, row_flags: bool) -> Vec<Vec<Option<String>>> {
    let table = &entry.table;
    table
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut out = row.clone();
            if row_flags {
                out.push(Some(flag_text(table.possible_duplicate()[idx])));
                out.push(Some(flag_text(table.total_row()[idx])));
            }
            out
        })
        .collect()
}

fn table_headers(entry: &NormalizedTable, row_flags: bool) -> Vec<String> {
    let mut headers = entry.table.columns().to_vec();
    if row_flags {
        headers.push(DUPLICATE_FLAG_COLUMN.to_string());
        headers.push(TOTAL_FLAG_COLUMN.to_string());
    }
    headers
}

/// File stem for each table, unique within the run.
fn table_file_stems(result: &RunResult) -> Vec<String> {
    let mut used = HashSet::new();
    result
        .tables
        .iter()
        .map(|entry| {
            let base = table_identifier(entry.name());
            let mut candidate = base.clone();
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

fn write_per_table(result: &RunResult, out_dir: &Path, row_flags: bool) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (entry, stem) in result.tables.iter().zip(table_file_stems(result)) {
        if entry.table.column_count() == 0 {
            continue;
        }
        let path = out_dir.join(format!("{stem}.csv"));
        let mut writer = open_csv_writer(&path)?;
        write_table(
            &mut writer,
            &table_headers(entry, row_flags),
            table_rows(entry, row_flags),
        )
        .with_context(|| format!("Writing table '{}' to {path:?}", entry.name()))?;
        written.push(path);
    }
    Ok(written)
}

/// Every non-empty table stacked under the union of their columns.
pub fn combined_rows(result: &RunResult, row_flags: bool) -> (Vec<String>, Vec<Vec<Option<String>>>) {
    let tables: Vec<&NormalizedTable> = result.tables.iter().filter(|t| !t.table.is_empty()).collect();
    let with_ids = tables
        .iter()
        .any(|t| !t.metadata.source_table_id.is_empty());

    let columns: Vec<String> = tables
        .iter()
        .flat_map(|entry| table_headers(entry, row_flags))
        .unique()
        .collect();

    let mut headers = vec![SOURCE_TAB_COLUMN.to_string()];
    if with_ids {
        headers.push(SOURCE_TABLE_ID_COLUMN.to_string());
    }
    let reserved = headers.clone();
    let mut taken: HashSet<String> = columns.iter().chain(&reserved).cloned().collect();
    for name in &columns {
        if reserved.contains(name) {
            let mut n = 2;
            let mut renamed = format!("{name}_{n}");
            while taken.contains(&renamed) {
                n += 1;
                renamed = format!("{name}_{n}");
            }
            taken.insert(renamed.clone());
            headers.push(renamed);
        } else {
            headers.push(name.clone());
        }
    }

    let mut rows = Vec::new();
    for entry in &tables {
        let own = table_headers(entry, row_flags);
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|name| own.iter().position(|c| c == name))
            .collect();
        for row in table_rows(entry, row_flags) {
            let mut out = vec![Some(entry.metadata.source_tab.clone())];
            if with_ids {
                let id = &entry.metadata.source_table_id;
                out.push((!id.is_empty()).then(|| id.clone()));
            }
            out.extend(
                positions
                    .iter()
                    .map(|pos| pos.and_then(|p| row.get(p).cloned().flatten())),
            );
            rows.push(out);
        }
    }
    (headers, rows)
}

fn write_combined(result: &RunResult, path: &Path, row_flags: bool) -> Result<()> {
    let (headers, rows) = combined_rows(result, row_flags);
    let mut writer = open_csv_writer(path)?;
    write_table(&mut writer, &headers, rows)
        .with_context(|| format!("Writing combined output {path:?}"))
}

pub fn write_metadata_json(result: &RunResult, source_file: &str, path: &Path) -> Result<()> {
    let document = MetaDocument {
        job_id: &result.job_id,
        status: result.status,
        source_file,
        generated_at: Utc::now().to_rfc3339(),
        info: &result.info,
        warnings: &result.warnings,
        errors: &result.errors,
        tables: result.metadata().collect(),
    };
    let file = File::create(path).with_context(|| format!("Creating metadata file {path:?}"))?;
    serde_json::to_writer_pretty(file, &document).context("Writing metadata JSON")
}

pub fn write_type_report(result: &RunResult, path: &Path) -> Result<()> {
    let mut writer = open_csv_writer(path)?;
    let records = result.type_report();
    if records.is_empty() {
        // `serialize` only emits the header alongside the first record.
        writer
            .write_record(TYPE_REPORT_COLUMNS)
            .with_context(|| format!("Writing type report {path:?}"))?;
    }
    for record in records {
        writer
            .serialize(&record)
            .with_context(|| format!("Writing type report {path:?}"))?;
    }
    writer.flush().context("Flushing type report")?;
    Ok(())
}

/// Writes every artefact for `result` under `out_dir`; returns the paths written.
pub fn export_run(
    result: &RunResult,
    source_file: &str,
    stem: &str,
    out_dir: &Path,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Creating output directory {out_dir:?}"))?;

    let mut written = Vec::new();
    if options.per_table {
        written.extend(write_per_table(result, out_dir, options.row_flags)?);
    }
    if options.combined {
        let path = out_dir.join(format!("clean_{stem}_ALL.csv"));
        write_combined(result, &path, options.row_flags)?;
        written.push(path);
    }
    let meta_path = out_dir.join(format!("clean_{stem}_META.json"));
    write_metadata_json(result, source_file, &meta_path)?;
    written.push(meta_path);

    let types_path = out_dir.join(format!("clean_{stem}_TYPE_ANALYSIS.csv"));
    write_type_report(result, &types_path)?;
    written.push(types_path);

    info!("Wrote {} file(s) to {:?}", written.len(), out_dir);
    Ok(written)
}
