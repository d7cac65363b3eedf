use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize messy spreadsheets into SQL-ready tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean every table in a workbook or CSV file and write the results
    Normalize(NormalizeArgs),
    /// Print recommended SQL types per column without writing files
    Profile(SourceArgs),
    /// List the table regions detected on each sheet
    Regions(SourceArgs),
    /// Write the default configuration as YAML
    Config(ConfigArgs),
}

/// Input selection shared by every subcommand that reads a source.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Workbook (xlsx, xls, ods, ...) or delimited file; `-` reads CSV from stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML file overriding the default heuristic thresholds
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Only process these sheets (repeatable)
    #[arg(long = "sheet", action = clap::ArgAction::Append)]
    pub sheets: Vec<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a delimited input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Stop reading each sheet after this many rows
    #[arg(long = "max-rows")]
    pub max_rows: Option<usize>,
    /// Clean the regions of a sheet in parallel
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Directory receiving the cleaned files (defaults to the current directory)
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,
    /// Which table files to write
    #[arg(long, value_enum, default_value_t = OutputFormat::Tables)]
    pub format: OutputFormat,
    /// Omit the __possible_duplicate and __is_total_row columns
    #[arg(long = "no-row-flags")]
    pub no_row_flags: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Destination YAML file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One CSV per table
    #[default]
    Tables,
    /// A single CSV stacking every table
    Combined,
    Both,
}

impl OutputFormat {
    pub fn per_table(self) -> bool {
        matches!(self, OutputFormat::Tables | OutputFormat::Both)
    }

    pub fn combined(self) -> bool {
        matches!(self, OutputFormat::Combined | OutputFormat::Both)
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
