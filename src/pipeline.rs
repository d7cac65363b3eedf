//! Drives the engine per sheet, per region and per table.

use anyhow::{Result, bail};
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    config::NormalizeConfig,
    context::{detect_context_columns, fill_down},
    error::{NormalizeError, NormalizeResult},
    grid::Grid,
    header::analyze_header,
    identifier::normalize_headers,
    metadata::{NormalizedTable, RunMetadata, RunResult, region_split_warning},
    noise::{filter_total_rows, remove_repeated_headers},
    profile::{ColumnTypeProfile, profile_table, type_summary},
    region::{TableRegion, detect_regions},
    sanitize::{sanitize_table, validate_for_sql},
    table::Table,
};

/// One sheet as returned by a reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetGrid {
    pub grid: Grid,
    /// Set when the reader's row or column cap cut the sheet short.
    pub truncated: bool,
}

impl SheetGrid {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            truncated: false,
        }
    }
}

/// Anything that can hand out named raw sheets.
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;
    fn read_sheet(&mut self, name: &str) -> NormalizeResult<SheetGrid>;
}

/// Sheets already held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sheets: Vec<(String, SheetGrid)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, grid: Grid) -> Self {
        self.sheets.push((name.to_string(), SheetGrid::new(grid)));
        self
    }
}

impl SheetSource for MemorySource {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> NormalizeResult<SheetGrid> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| NormalizeError::SheetUnreadable {
                sheet: name.to_string(),
                reason: "no such sheet".to_string(),
            })
    }
}

/// Table name and source table id for region `index` (1-based) of `count`.
pub fn region_names(sheet: &str, index: usize, count: usize) -> (String, String) {
    if count > 1 {
        (format!("{sheet}__table{index:02}"), format!("table{index:02}"))
    } else {
        (sheet.to_string(), String::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Normalizes every selected sheet of `source`. An empty `only` selects all
    /// sheets. Fails only when nothing is left to process.
    pub fn run<S>(&self, source: &mut S, only: &[String]) -> Result<RunResult>
    where
        S: SheetSource + ?Sized,
    {
        let available = source.sheet_names();
        let selected: Vec<String> = if only.is_empty() {
            available
        } else {
            if let Some(missing) = only.iter().find(|name| !available.contains(name)) {
                bail!("Sheet '{missing}' not found; available: {}", available.join(", "));
            }
            available
                .into_iter()
                .filter(|name| only.contains(name))
                .collect()
        };
        if selected.is_empty() {
            bail!("Input contains no sheets to process");
        }

        let mut tables = Vec::new();
        for sheet in &selected {
            match source.read_sheet(sheet) {
                Ok(sheet_grid) => tables.extend(self.normalize_sheet(sheet, &sheet_grid)),
                Err(err) => {
                    warn!("Skipping sheet '{sheet}': {err}");
                    let mut meta = RunMetadata::sheet_failure(sheet, &err.to_string());
                    meta.finalize(&self.config.quality);
                    tables.push(NormalizedTable {
                        metadata: meta,
                        table: Table::empty(),
                        profiles: Vec::new(),
                    });
                }
            }
        }

        let result = RunResult::from_tables(tables);
        info!(
            "Job {} finished with status '{}' across {} table(s)",
            result.job_id,
            result.status,
            result.tables.len()
        );
        Ok(result)
    }

    /// Splits one sheet into regions and cleans each into its own table.
    pub fn normalize_sheet(&self, sheet: &str, sheet_grid: &SheetGrid) -> Vec<NormalizedTable> {
        let regions = detect_regions(&sheet_grid.grid, &self.config.regions);
        info!("Sheet '{sheet}': {} table region(s)", regions.len());
        if regions.is_empty() {
            // Nothing on the sheet; still report it as one empty table.
            let (name, id) = region_names(sheet, 1, 1);
            let mut meta = RunMetadata::new(&name, sheet, &id);
            meta.type_summary = type_summary(&[]);
            meta.finalize(&self.config.quality);
            return vec![NormalizedTable {
                metadata: meta,
                table: Table::empty(),
                profiles: Vec::new(),
            }];
        }

        let count = regions.len();
        let clean = |(idx, region): (usize, &TableRegion)| {
            let mut entry = self.clean_region(&sheet_grid.grid, region, sheet, idx + 1, count);
            if sheet_grid.truncated {
                entry.metadata.warnings.push(format!(
                    "Sheet truncated to {} rows x {} columns.",
                    self.config.reader.max_rows, self.config.reader.max_cols
                ));
                entry.metadata.finalize(&self.config.quality);
            }
            entry
        };
        if self.config.parallel {
            regions.par_iter().enumerate().map(clean).collect()
        } else {
            regions.iter().enumerate().map(clean).collect()
        }
    }

    /// Cleans one region; a structural failure yields an error-tagged empty table.
    pub fn clean_region(
        &self,
        grid: &Grid,
        region: &TableRegion,
        sheet: &str,
        index: usize,
        count: usize,
    ) -> NormalizedTable {
        let (name, id) = region_names(sheet, index, count);
        let mut meta = RunMetadata::new(&name, sheet, &id);
        meta.table_bounds = region.bounds.clone();
        if count > 1 {
            meta.warnings.push(region_split_warning(count));
        }

        let (table, profiles) = match self.clean_table(grid, region, &mut meta) {
            Ok(cleaned) => cleaned,
            Err(err) => {
                warn!("Table '{name}' failed: {err}");
                meta.errors.push(format!("Data structure issue: {err}"));
                meta.rows_out = 0;
                (Table::empty(), Vec::new())
            }
        };
        meta.rows_after_clean = table.row_count();
        meta.columns_after_clean = table.column_count();
        meta.finalize(&self.config.quality);
        info!(
            "Table '{name}': {} -> {} row(s), {}",
            meta.rows_in, meta.rows_out, meta.quality_flag
        );
        NormalizedTable {
            metadata: meta,
            table,
            profiles,
        }
    }

    fn clean_table(
        &self,
        grid: &Grid,
        region: &TableRegion,
        meta: &mut RunMetadata,
    ) -> NormalizeResult<(Table, Vec<ColumnTypeProfile>)> {
        let cfg = &self.config;
        if region.max_row >= grid.height() || region.max_col >= grid.width() {
            return Err(NormalizeError::RegionOutOfBounds {
                min_row: region.min_row,
                max_row: region.max_row,
                min_col: region.min_col,
                max_col: region.max_col,
                height: grid.height(),
                width: grid.width(),
            });
        }
        let body_grid = region.extract(grid).without_blank_lines();
        meta.rows_in = body_grid.height();
        if body_grid.is_empty() {
            meta.type_summary = type_summary(&[]);
            return Ok((Table::empty(), Vec::new()));
        }

        let layout = analyze_header(&body_grid, &cfg.headers);
        meta.header_row_index = layout.band.start_row;
        meta.header_depth_used = layout.band.depth;
        debug!(
            "{}: header at row {} with depth {}",
            meta.table_name, layout.band.start_row, layout.band.depth
        );
        if layout.band.depth > 1 {
            meta.warnings.push(format!(
                "Multi-row header detected (depth={}). Verify header structure.",
                layout.band.depth
            ));
        }

        let normalized = normalize_headers(&layout.raw_headers);
        meta.duplicate_column_names_fixed = normalized.duplicates_fixed;
        if normalized.duplicates_fixed > 0 {
            meta.info.push(format!(
                "Fixed {} duplicate column name(s).",
                normalized.duplicates_fixed
            ));
        }

        let body: Vec<_> = body_grid
            .into_rows()
            .into_iter()
            .skip(layout.band.body_start())
            .collect();
        let mut table = Table::new(normalized.columns, body)?;

        let repeated =
            remove_repeated_headers(&mut table, &layout.raw_headers, &cfg.repeated_headers);
        meta.repeated_header_rows_dropped = repeated;
        if repeated > 0 {
            meta.info
                .push(format!("Removed {repeated} repeated header row(s)."));
        }
        table.drop_blank_rows();

        let totals = filter_total_rows(&mut table, &cfg.totals);
        meta.totals_rows_flagged = totals.flagged;
        meta.totals_rows_dropped = totals.dropped;
        if totals.dropped > 0 {
            meta.info
                .push(format!("Removed {} total row(s).", totals.dropped));
        }
        if totals.retained() > 0 {
            meta.warnings.push(format!(
                "{} potential total row(s) flagged for review.",
                totals.retained()
            ));
        }

        let context = detect_context_columns(&table, &cfg.context);
        if !context.is_empty() {
            fill_down(&mut table, &context);
            let shown = context.iter().take(3).join(", ");
            let more = if context.len() > 3 { "..." } else { "" };
            meta.info.push(format!(
                "Applied fill-down to {} context column(s): {shown}{more}",
                context.len()
            ));
            debug!("{}: context columns {:?}", meta.table_name, context);
        }
        meta.context_columns_filled = context;

        meta.exact_duplicate_rows = table.mark_duplicates();
        meta.rows_out = table.row_count();
        if meta.rows_in > 0 {
            let reduction = (meta.rows_in - meta.rows_out) as f64 / meta.rows_in as f64;
            if reduction > cfg.quality.row_reduction_warning_ratio {
                meta.warnings.push(format!(
                    "Significant row reduction: {} → {} rows ({:.1}% reduction).",
                    meta.rows_in,
                    meta.rows_out,
                    reduction * 100.0
                ));
            }
        }
        meta.candidate_keys = table.candidate_keys(&cfg.keys);

        let profiles = profile_table(&table, &cfg.types);
        meta.type_summary = type_summary(&profiles);
        let validation = validate_for_sql(&table, &profiles, &cfg.quality);
        meta.warnings.extend(validation.warnings);
        meta.errors.extend(validation.errors);

        sanitize_table(&mut table, &profiles);
        Ok((table, profiles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{QualityFlag, RunStatus};

    fn grid(rows: Vec<Vec<&str>>) -> Grid {
        Grid::from_strings(rows)
    }

    #[test]
    fn region_names_depend_on_region_count() {
        assert_eq!(region_names("Sales", 1, 1), ("Sales".into(), String::new()));
        assert_eq!(
            region_names("Sales", 2, 3),
            ("Sales__table02".into(), "table02".into())
        );
    }

    #[test]
    fn simple_sheet_is_clean() {
        let mut source = MemorySource::new().with_sheet(
            "Orders",
            grid(vec![
                vec!["Order ID", "Amount"],
                vec!["1", "10.5"],
                vec!["2", "12.50"],
            ]),
        );
        let result = Normalizer::default().run(&mut source, &[]).expect("run");
        assert_eq!(result.status, RunStatus::Success);
        let entry = result.table("Orders").expect("table");
        assert_eq!(entry.table.columns(), &["order_id", "amount"]);
        assert_eq!(entry.metadata.rows_in, 3);
        assert_eq!(entry.metadata.rows_out, 2);
        assert_eq!(entry.metadata.quality_flag, QualityFlag::Ok);
        assert_eq!(entry.metadata.type_summary, "FLOAT(1), INTEGER(1)");
        assert_eq!(entry.table.rows()[1][1].as_deref(), Some("12.5"));
    }

    #[test]
    fn unreadable_sheet_becomes_error_record() {
        struct Broken;
        impl SheetSource for Broken {
            fn sheet_names(&self) -> Vec<String> {
                vec!["Bad".into()]
            }
            fn read_sheet(&mut self, name: &str) -> NormalizeResult<SheetGrid> {
                Err(NormalizeError::SheetUnreadable {
                    sheet: name.into(),
                    reason: "corrupt".into(),
                })
            }
        }
        let result = Normalizer::default().run(&mut Broken, &[]).expect("run");
        assert_eq!(result.status, RunStatus::Error);
        assert_eq!(result.tables[0].metadata.quality_flag, QualityFlag::Error);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Bad: "));
    }

    #[test]
    fn missing_sheet_selection_is_fatal() {
        let mut source = MemorySource::new().with_sheet("A", grid(vec![vec!["x", "y"]]));
        let err = Normalizer::default()
            .run(&mut source, &["B".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("Sheet 'B' not found"));
        assert!(Normalizer::default().run(&mut MemorySource::new(), &[]).is_err());
    }

    #[test]
    fn out_of_bounds_region_is_error_tagged() {
        let g = grid(vec![vec!["a", "b"], vec!["1", "2"]]);
        let region = TableRegion::new(0, 5, 0, 1);
        let entry = Normalizer::default().clean_region(&g, &region, "S", 1, 1);
        assert_eq!(entry.metadata.quality_flag, QualityFlag::Error);
        assert!(entry.table.is_empty());
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let sheet = grid(vec![
            vec!["id", "name", "", "sku", "qty"],
            vec!["1", "Ann", "", "A1", "3"],
            vec!["2", "Bob", "", "B2", "4"],
        ]);
        let sequential = Normalizer::default()
            .normalize_sheet("S", &SheetGrid::new(sheet.clone()));
        let parallel = Normalizer::new(NormalizeConfig {
            parallel: true,
            ..NormalizeConfig::default()
        })
        .normalize_sheet("S", &SheetGrid::new(sheet));
        let names = |tables: &[NormalizedTable]| {
            tables.iter().map(|t| t.name().to_string()).collect::<Vec<_>>()
        };
        assert_eq!(names(&sequential), vec!["S__table01", "S__table02"]);
        assert_eq!(names(&sequential), names(&parallel));
        assert_eq!(sequential[1].table.rows(), parallel[1].table.rows());
    }
}
