pub mod cli;
pub mod config;
pub mod context;
pub mod data;
pub mod display;
pub mod error;
pub mod export;
pub mod grid;
pub mod header;
pub mod identifier;
pub mod io_utils;
pub mod metadata;
pub mod noise;
pub mod pipeline;
pub mod profile;
pub mod region;
pub mod sanitize;
pub mod table;
pub mod workbook;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, ConfigArgs, NormalizeArgs, SourceArgs},
    config::{NormalizeConfig, ReaderLimits},
    display::{print_table, region_headers, region_row, summary_table, type_report_table},
    export::{ExportOptions, export_run},
    header::analyze_header,
    identifier::normalize_headers,
    io_utils::{CsvSource, is_dash, sheet_name_for},
    metadata::RunResult,
    pipeline::{Normalizer, SheetSource},
    region::detect_regions,
    workbook::{WorkbookSource, is_workbook_path},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_normalizer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Profile(args) => handle_profile(&args),
        Commands::Regions(args) => handle_regions(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

/// Opens `path` as a workbook when its extension says so, otherwise as CSV.
pub fn open_source(
    path: &Path,
    delimiter: Option<u8>,
    encoding: Option<&str>,
    limits: ReaderLimits,
) -> Result<Box<dyn SheetSource>> {
    if !is_dash(path) && !path.exists() {
        bail!("Input file {path:?} does not exist");
    }
    if !is_dash(path) && is_workbook_path(path) {
        debug!("Reading {path:?} as a workbook");
        Ok(Box::new(WorkbookSource::open(path, limits)?))
    } else {
        debug!("Reading {path:?} as delimited text");
        Ok(Box::new(CsvSource::new(path, delimiter, encoding, limits)?))
    }
}

fn load_config(args: &SourceArgs) -> Result<NormalizeConfig> {
    let mut config = match &args.config {
        Some(path) => NormalizeConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => NormalizeConfig::default(),
    };
    if let Some(max_rows) = args.max_rows {
        config.reader.max_rows = max_rows;
    }
    if args.parallel {
        config.parallel = true;
    }
    Ok(config)
}

fn normalize_source(args: &SourceArgs) -> Result<RunResult> {
    let config = load_config(args)?;
    info!("Normalizing '{}'", args.input.display());
    let mut source = open_source(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        config.reader,
    )?;
    Normalizer::new(config)
        .run(source.as_mut(), &args.sheets)
        .with_context(|| format!("Normalizing {:?}", args.input))
}

fn handle_normalize(args: &NormalizeArgs) -> Result<()> {
    let result = normalize_source(&args.source)?;
    let options = ExportOptions {
        per_table: args.format.per_table(),
        combined: args.format.combined(),
        row_flags: !args.no_row_flags,
    };
    let stem = sheet_name_for(&args.source.input);
    let source_file = args.source.input.display().to_string();
    export_run(&result, &source_file, &stem, &args.output_dir, &options)?;

    let (headers, rows) = summary_table(&result);
    print_table(&headers, &rows);
    println!("job {}: {}", result.job_id, result.status);
    for message in &result.warnings {
        warn!("{message}");
    }
    Ok(())
}

fn handle_profile(args: &SourceArgs) -> Result<()> {
    let result = normalize_source(args)?;
    let (headers, rows) = type_report_table(&result.type_report());
    print_table(&headers, &rows);
    Ok(())
}

fn handle_regions(args: &SourceArgs) -> Result<()> {
    let config = load_config(args)?;
    let mut source = open_source(
        &args.input,
        args.delimiter,
        args.input_encoding.as_deref(),
        config.reader,
    )?;
    let names: Vec<String> = source
        .sheet_names()
        .into_iter()
        .filter(|name| args.sheets.is_empty() || args.sheets.contains(name))
        .collect();

    let mut rows = Vec::new();
    for sheet in &names {
        let sheet_grid = match source.read_sheet(sheet) {
            Ok(sheet_grid) => sheet_grid,
            Err(err) => {
                warn!("Skipping sheet '{sheet}': {err}");
                continue;
            }
        };
        for region in detect_regions(&sheet_grid.grid, &config.regions) {
            let body = region.extract(&sheet_grid.grid).without_blank_lines();
            let (depth, columns) = if body.is_empty() {
                (0, Vec::new())
            } else {
                let layout = analyze_header(&body, &config.headers);
                (
                    layout.band.depth,
                    normalize_headers(&layout.raw_headers).columns,
                )
            };
            rows.push(region_row(sheet, &region, depth, &columns));
        }
    }
    print_table(&region_headers(), &rows);
    Ok(())
}

fn handle_config(args: &ConfigArgs) -> Result<()> {
    NormalizeConfig::default()
        .save(&args.output)
        .with_context(|| format!("Writing configuration to {:?}", args.output))?;
    info!("Default configuration written to {:?}", args.output);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
