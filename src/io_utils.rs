//! CSV plumbing: reading delimited files as raw grids and writing cleaned
//! tables back out.
//!
//! - **Delimiters**: `.tsv` inputs default to tab, everything else to comma,
//!   unless one is given explicitly.
//! - **Encoding**: input bytes are decoded through `encoding_rs` (UTF-8 by
//!   default); output is always UTF-8.
//! - **Quoting**: output uses `QuoteStyle::Necessary` with `\n` line endings
//!   and an empty field for null.
//! - **stdin**: the `-` path reads standard input.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::{QuoteStyle, Terminator};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    config::ReaderLimits,
    error::{NormalizeError, NormalizeResult},
    grid::Grid,
    pipeline::{SheetGrid, SheetSource},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Name used for the single sheet of a delimited file.
pub fn sheet_name_for(path: &Path) -> String {
    if is_dash(path) {
        return "stdin".to_string();
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("sheet")
        .to_string()
}

/// Parses delimited text into a grid, honouring the row and column caps.
///
/// Empty lines are kept as blank rows so that stacked tables stay apart.
pub fn parse_delimited(text: &str, delimiter: u8, limits: &ReaderLimits) -> Result<SheetGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut truncated = false;
    let mut record = csv::StringRecord::new();
    // Newlines consumed up to the end of the previous record.
    let mut consumed = 0u64;
    loop {
        let more = reader
            .read_record(&mut record)
            .with_context(|| format!("Reading record {}", rows.len() + 1))?;
        if !more {
            break;
        }
        let lines_now = reader.position().line().saturating_sub(1);
        let embedded: u64 = record
            .iter()
            .map(|field| field.matches('\n').count() as u64)
            .sum();
        let skipped = lines_now.saturating_sub(consumed + embedded + 1);
        consumed = lines_now;

        for _ in 0..skipped {
            if rows.len() >= limits.max_rows {
                break;
            }
            rows.push(Vec::new());
        }
        if rows.len() >= limits.max_rows {
            truncated = true;
            break;
        }
        if record.len() > limits.max_cols {
            truncated = true;
        }
        let row = record
            .iter()
            .take(limits.max_cols)
            .map(|field| (!field.is_empty()).then(|| field.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(SheetGrid {
        grid: Grid::from_rows(rows),
        truncated,
    })
}

/// A CSV or TSV file exposed as a one-sheet source.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    sheet: String,
    delimiter: u8,
    encoding: &'static Encoding,
    limits: ReaderLimits,
}

impl CsvSource {
    pub fn new(
        path: &Path,
        delimiter: Option<u8>,
        encoding: Option<&str>,
        limits: ReaderLimits,
    ) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            sheet: sheet_name_for(path),
            delimiter: resolve_input_delimiter(path, delimiter),
            encoding: resolve_encoding(encoding)?,
            limits,
        })
    }

    fn load(&self) -> Result<SheetGrid> {
        let mut bytes = Vec::new();
        if is_dash(&self.path) {
            std::io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Reading standard input")?;
        } else {
            File::open(&self.path)
                .with_context(|| format!("Opening input file {:?}", self.path))?
                .read_to_end(&mut bytes)
                .with_context(|| format!("Reading input file {:?}", self.path))?;
        }
        let text = decode_bytes(&bytes, self.encoding)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        debug!(
            "Parsing {:?} with delimiter '{}'",
            self.path,
            crate::printable_delimiter(self.delimiter)
        );
        parse_delimited(text, self.delimiter, &self.limits)
    }
}

impl SheetSource for CsvSource {
    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet.clone()]
    }

    fn read_sheet(&mut self, name: &str) -> NormalizeResult<SheetGrid> {
        if name != self.sheet {
            return Err(NormalizeError::SheetUnreadable {
                sheet: name.to_string(),
                reason: "no such sheet".to_string(),
            });
        }
        self.load().map_err(|err| NormalizeError::SheetUnreadable {
            sheet: name.to_string(),
            reason: format!("{err:#}"),
        })
    }
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = if is_dash(path) {
        Box::new(std::io::stdout())
    } else {
        Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
        ))
    };
    Ok(csv::WriterBuilder::new()
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .double_quote(true)
        .from_writer(sink))
}

/// Writes a header record followed by rows; `None` cells become empty fields.
pub fn write_table<W, I>(writer: &mut csv::Writer<W>, headers: &[String], rows: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    writer
        .write_record(headers)
        .context("Writing header record")?;
    for row in rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .context("Writing data record")?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}
