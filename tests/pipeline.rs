mod common;

use common::{TWO_REGION_CSV, TestWorkspace, grid, two_region_sheet};
use sheet_normalizer::{
    config::{NormalizeConfig, ReaderLimits},
    io_utils::CsvSource,
    metadata::{CleanStatus, QualityFlag, RunStatus},
    pipeline::{MemorySource, Normalizer},
    profile::SqlType,
};

fn normalize(sheet: &str, rows: Vec<Vec<&str>>) -> sheet_normalizer::metadata::RunResult {
    let mut source = MemorySource::new().with_sheet(sheet, grid(rows));
    Normalizer::default().run(&mut source, &[]).expect("run")
}

#[test]
fn side_by_side_tables_with_stacked_header() {
    let mut source = MemorySource::new().with_sheet("Sheet", two_region_sheet());
    let result = Normalizer::default().run(&mut source, &[]).expect("run");
    assert_eq!(result.tables.len(), 2);

    let left = result.table("Sheet__table01").expect("left table");
    assert_eq!(left.metadata.table_bounds, "R1C1:R4C3");
    assert_eq!(left.metadata.source_table_id, "table01");
    assert_eq!(left.metadata.header_depth_used, 2);
    assert_eq!(left.table.columns(), &["region", "sales_q1", "sales_q2"]);
    assert_eq!(left.metadata.rows_in, 4);
    assert_eq!(left.metadata.rows_out, 2);
    assert_eq!(left.metadata.quality_flag, QualityFlag::ReviewWarnings);
    assert!(
        left.metadata
            .warnings
            .iter()
            .any(|w| w.starts_with("Multi-row header detected (depth=2)"))
    );
    assert!(
        left.metadata
            .warnings
            .contains(&"Sheet split into 2 table region(s).".to_string())
    );

    let right = result.table("Sheet__table02").expect("right table");
    assert_eq!(right.metadata.table_bounds, "R1C5:R4C6");
    assert_eq!(right.metadata.header_depth_used, 1);
    assert_eq!(right.table.columns(), &["sku", "qty"]);
    assert_eq!(right.table.row_count(), 3);
    assert_eq!(right.metadata.type_summary, "INTEGER(1), VARCHAR(1)");
    assert!(
        right
            .metadata
            .warnings
            .contains(&"Sheet split into 2 table region(s).".to_string())
    );
    assert_eq!(right.metadata.quality_flag, QualityFlag::ReviewWarnings);

    assert_eq!(result.status, RunStatus::Partial);
    assert!(result.warnings.iter().all(|w| !w.contains("Sheet split")));
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.starts_with("Sheet__table01: Multi-row header"))
    );
}

#[test]
fn csv_file_matches_in_memory_grid() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("Sheet.csv", TWO_REGION_CSV);
    let mut source = CsvSource::new(&path, None, None, ReaderLimits::default()).expect("source");
    let from_csv = Normalizer::default().run(&mut source, &[]).expect("run csv");

    let mut memory = MemorySource::new().with_sheet("Sheet", two_region_sheet());
    let from_memory = Normalizer::default().run(&mut memory, &[]).expect("run memory");

    assert_eq!(from_csv.tables.len(), from_memory.tables.len());
    for (a, b) in from_csv.tables.iter().zip(&from_memory.tables) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.table.rows(), b.table.rows());
    }
}

#[test]
fn blank_line_separates_stacked_csv_tables() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "stacked.csv",
        "id,name\n1,Ann\n2,Bob\n\nsku,qty\nA1,3\nB2,4\n",
    );
    let mut source = CsvSource::new(&path, None, None, ReaderLimits::default()).expect("source");
    let result = Normalizer::default().run(&mut source, &[]).expect("run");
    assert_eq!(result.tables.len(), 2);
    assert_eq!(result.tables[0].table.columns(), &["id", "name"]);
    assert_eq!(result.tables[0].metadata.table_bounds, "R1C1:R3C2");
    assert_eq!(result.tables[1].table.columns(), &["sku", "qty"]);
    assert_eq!(result.tables[1].metadata.table_bounds, "R5C1:R7C2");
}

#[test]
fn sparse_category_column_is_filled_down() {
    let result = normalize(
        "Stock",
        vec![
            vec!["Category", "Amount", "Qty"],
            vec!["Fruit", "1", "10"],
            vec!["", "2", "20"],
            vec!["", "3", "30"],
            vec![" Veg ", "4", "40"],
            vec!["", "5", "50"],
            vec!["", "6", "60"],
        ],
    );
    let entry = result.table("Stock").expect("table");
    assert_eq!(entry.metadata.context_columns_filled, vec!["category".to_string()]);
    let categories: Vec<Option<&str>> = entry.table.column_values(0).collect();
    assert_eq!(
        categories,
        vec![
            Some("Fruit"),
            Some("Fruit"),
            Some("Fruit"),
            Some("Veg"),
            Some("Veg"),
            Some("Veg")
        ]
    );
    assert!(
        entry
            .metadata
            .info
            .iter()
            .any(|m| m == "Applied fill-down to 1 context column(s): category")
    );
}

#[test]
fn integer_threshold_is_inclusive() {
    let mut rows = vec![vec!["id", "code"]];
    let ids: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
    for (i, id) in ids.iter().enumerate() {
        rows.push(vec![id.as_str(), if i == 9 { "x" } else { id.as_str() }]);
    }
    let result = normalize("Codes", rows);
    let profiles = &result.tables[0].profiles;
    assert_eq!(profiles[1].pct_int, 90.0);
    assert_eq!(profiles[1].recommended, SqlType::Integer);
}

#[test]
fn integers_with_a_few_labels_are_varchar() {
    let mut rows = vec![vec!["id", "code"]];
    let ids: Vec<String> = (1..=10).map(|i| i.to_string()).collect();
    for (i, id) in ids.iter().enumerate() {
        rows.push(vec![id.as_str(), if i >= 8 { "x" } else { id.as_str() }]);
    }
    let result = normalize("Codes", rows);
    let profile = &result.tables[0].profiles[1];
    assert_eq!(profile.pct_int, 80.0);
    assert_eq!(profile.pct_float, 0.0);
    assert_eq!(profile.recommended, SqlType::Varchar);
}

#[test]
fn decimal_column_is_float() {
    let result = normalize(
        "Prices",
        vec![
            vec!["Item", "Price"],
            vec!["Pen", "1.50"],
            vec!["Ink", "4.25"],
            vec!["Pad", "2.75"],
            vec!["Cap", "0.99"],
        ],
    );
    let entry = &result.tables[0];
    assert_eq!(entry.profiles[1].pct_float, 100.0);
    assert_eq!(entry.profiles[1].recommended, SqlType::Float);
    assert_eq!(entry.table.rows()[0][1].as_deref(), Some("1.5"));
}

#[test]
fn grand_total_row_is_dropped() {
    let result = normalize(
        "Sales",
        vec![
            vec!["Region", "Amount", "Qty", "Units"],
            vec!["North", "10", "20", "2"],
            vec!["South", "15", "25", "3"],
            vec!["East", "5", "15", "1"],
            vec!["Grand Total", "30", "60", "6"],
        ],
    );
    let entry = result.table("Sales").expect("table");
    assert_eq!(entry.metadata.totals_rows_dropped, 1);
    assert_eq!(entry.table.row_count(), 3);
    assert_eq!(entry.metadata.quality_flag, QualityFlag::ReviewTotals);
    assert!(entry.metadata.info.contains(&"Removed 1 total row(s).".to_string()));
}

#[test]
fn generic_total_row_is_kept_and_tagged() {
    let result = normalize(
        "Sales",
        vec![
            vec!["Region", "Amount", "Qty"],
            vec!["North", "10", "20"],
            vec!["South", "15", "25"],
            vec!["Total", "25", "45"],
        ],
    );
    let entry = result.table("Sales").expect("table");
    assert_eq!(entry.metadata.totals_rows_flagged, 1);
    assert_eq!(entry.metadata.totals_rows_dropped, 0);
    assert_eq!(entry.table.total_row(), &[false, false, true]);
    assert_eq!(entry.metadata.quality_flag, QualityFlag::ReviewWarnings);
}

#[test]
fn keeping_high_confidence_totals_is_configurable() {
    let mut config = NormalizeConfig::default();
    config.totals.drop_high_confidence = false;
    let mut source = MemorySource::new().with_sheet(
        "Sales",
        grid(vec![
            vec!["Region", "Amount", "Qty", "Units"],
            vec!["North", "10", "20", "2"],
            vec!["South", "15", "25", "3"],
            vec!["Grand Total", "25", "45", "5"],
        ]),
    );
    let result = Normalizer::new(config).run(&mut source, &[]).expect("run");
    assert_eq!(result.tables[0].table.row_count(), 3);
    assert_eq!(result.tables[0].metadata.totals_rows_dropped, 0);
    assert_eq!(result.tables[0].table.total_row(), &[false, false, true]);
}

#[test]
fn mixed_text_total_row_before_the_tail_is_kept() {
    let mut rows = vec![vec!["Item", "Qty", "Weight"]];
    for _ in 0..13 {
        rows.push(vec!["Bolts", "10", "2"]);
    }
    rows.push(vec!["Grand Total", "see note", "x"]);
    rows.push(vec!["Nuts", "4", "1"]);
    let result = normalize("Parts", rows);
    let entry = result.table("Parts").expect("table");
    assert_eq!(entry.metadata.totals_rows_flagged, 1);
    assert_eq!(entry.metadata.totals_rows_dropped, 0);
    assert_eq!(entry.table.row_count(), 15);
    assert!(entry.table.total_row()[13]);
}

#[test]
fn repeated_header_rows_are_removed() {
    let result = normalize(
        "Report",
        vec![
            vec!["Item", "Price", "Units"],
            vec!["Pen", "1.5", "3"],
            vec!["Item", "Price", "Units"],
            vec!["Ink", "4.25", "1"],
        ],
    );
    let entry = result.table("Report").expect("table");
    assert_eq!(entry.metadata.repeated_header_rows_dropped, 1);
    assert_eq!(entry.table.row_count(), 2);
    assert_eq!(entry.metadata.quality_flag, QualityFlag::ReviewRepeatedHeaders);
}

#[test]
fn identical_rows_are_flagged_not_dropped() {
    let result = normalize(
        "Log",
        vec![
            vec!["id", "amount"],
            vec!["1", "10"],
            vec!["1", "10"],
            vec!["2", "20"],
        ],
    );
    let entry = &result.tables[0];
    assert_eq!(entry.table.row_count(), 3);
    assert_eq!(entry.metadata.exact_duplicate_rows, 2);
    assert_eq!(entry.table.possible_duplicate(), &[true, true, false]);
}

#[test]
fn sheet_selection_limits_processing() {
    let mut source = MemorySource::new()
        .with_sheet("A", grid(vec![vec!["x", "y"], vec!["1", "2"]]))
        .with_sheet("B", grid(vec![vec!["p", "q"], vec!["3", "4"]]));
    let result = Normalizer::default()
        .run(&mut source, &["B".to_string()])
        .expect("run");
    assert_eq!(result.tables.len(), 1);
    assert_eq!(result.tables[0].metadata.source_tab, "B");
    assert_eq!(result.tables[0].metadata.clean_status, CleanStatus::Ok);
}

#[test]
fn empty_sheet_yields_an_empty_table() {
    let result = normalize("Blank", vec![]);
    assert_eq!(result.tables.len(), 1);
    let entry = &result.tables[0];
    assert!(entry.table.is_empty());
    assert_eq!(entry.metadata.rows_in, 0);
    assert_eq!(entry.metadata.type_summary, "N/A");
}
