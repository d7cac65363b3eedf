mod common;

use assert_cmd::Command;
use common::{TWO_REGION_CSV, TestWorkspace};
use predicates::str::contains;
use sheet_normalizer::config::NormalizeConfig;

fn bin() -> Command {
    Command::cargo_bin("sheet-normalizer").expect("binary exists")
}

#[test]
fn normalize_writes_tables_metadata_and_type_report() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("Sheet.csv", TWO_REGION_CSV);
    let out = workspace.path().join("out");
    bin()
        .args([
            "normalize",
            "-i",
            input.to_str().expect("utf-8 path"),
            "-o",
            out.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success()
        .stdout(contains("Sheet__table01"))
        .stdout(contains("Sheet__table02"))
        .stdout(contains("partial"));

    let right = std::fs::read_to_string(out.join("sheet__table02.csv")).expect("right table");
    assert_eq!(
        right,
        "sku,qty,__possible_duplicate,__is_total_row\n\
         A1,3,false,false\n\
         B2,4,false,false\n\
         C3,5,false,false\n"
    );
    assert!(out.join("sheet__table01.csv").exists());
    assert!(!out.join("clean_Sheet_ALL.csv").exists());

    let meta = std::fs::read_to_string(out.join("clean_Sheet_META.json")).expect("meta");
    let meta: serde_json::Value = serde_json::from_str(&meta).expect("meta json");
    assert_eq!(meta["status"], "partial");
    assert_eq!(meta["job_id"].as_str().expect("job id").len(), 8);
    assert_eq!(meta["tables"][0]["header_depth_used"], 2);
    assert_eq!(meta["tables"][0]["quality_flag"], "REVIEW - Warnings present");

    let types = std::fs::read_to_string(out.join("clean_Sheet_TYPE_ANALYSIS.csv")).expect("types");
    let first = types.lines().next().expect("header line");
    assert_eq!(
        first,
        "table,column,recommended_type,pct_int,pct_float,pct_date,sample_values"
    );
    assert!(types.contains("Sheet__table01,sales_q1,INTEGER"));
}

#[test]
fn combined_format_without_row_flags() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("Sheet.csv", TWO_REGION_CSV);
    bin()
        .args([
            "normalize",
            "-i",
            input.to_str().expect("utf-8 path"),
            "-o",
            workspace.path().to_str().expect("utf-8 path"),
            "--format",
            "combined",
            "--no-row-flags",
        ])
        .assert()
        .success();

    let combined = workspace.read("clean_Sheet_ALL.csv");
    let mut lines = combined.lines();
    assert_eq!(
        lines.next(),
        Some("source_tab,source_table_id,region,sales_q1,sales_q2,sku,qty")
    );
    assert_eq!(lines.next(), Some("Sheet,table01,North,10,12,,"));
    assert_eq!(combined.lines().count(), 6);
    assert!(!workspace.exists("sheet__table01.csv"));
}

#[test]
fn semicolon_input_from_stdin() {
    let workspace = TestWorkspace::new();
    bin()
        .args([
            "normalize",
            "-i",
            "-",
            "-o",
            workspace.path().to_str().expect("utf-8 path"),
            "--delimiter",
            ";",
        ])
        .write_stdin("Order ID;Amount\n1;10.5\n2;12.50\n")
        .assert()
        .success()
        .stdout(contains("stdin"));

    assert_eq!(
        workspace.read("stdin.csv"),
        "order_id,amount,__possible_duplicate,__is_total_row\n\
         1,10.5,false,false\n\
         2,12.5,false,false\n"
    );
    assert!(workspace.exists("clean_stdin_META.json"));
}

#[test]
fn profile_prints_recommended_types() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("Sheet.csv", TWO_REGION_CSV);
    bin()
        .args(["profile", "-i", input.to_str().expect("utf-8 path")])
        .assert()
        .success()
        .stdout(contains("sales_q1"))
        .stdout(contains("INTEGER"))
        .stdout(contains("VARCHAR"));
    assert!(!workspace.exists("clean_Sheet_META.json"));
}

#[test]
fn regions_lists_bounds_and_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("Sheet.csv", TWO_REGION_CSV);
    bin()
        .args(["regions", "-i", input.to_str().expect("utf-8 path")])
        .assert()
        .success()
        .stdout(contains("R1C1:R4C3"))
        .stdout(contains("R1C5:R4C6"))
        .stdout(contains("region, sales_q1, sales_q2"));
}

#[test]
fn config_writes_loadable_defaults() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("normalize.yaml");
    bin()
        .args(["config", "-o", path.to_str().expect("utf-8 path")])
        .assert()
        .success();
    let loaded = NormalizeConfig::load(&path).expect("load config");
    assert_eq!(loaded, NormalizeConfig::default());
}

#[test]
fn config_file_overrides_thresholds() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "sales.csv",
        "Region,Amount,Qty\nNorth,10,20\nSouth,15,25\nGrand Total,25,45\n",
    );
    let config = workspace.write("keep.yaml", "totals:\n  drop_high_confidence: false\n");
    let out = workspace.path().join("out");
    bin()
        .args([
            "normalize",
            "-i",
            input.to_str().expect("utf-8 path"),
            "-o",
            out.to_str().expect("utf-8 path"),
            "--config",
            config.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success();
    let table = std::fs::read_to_string(out.join("sales.csv")).expect("sales table");
    assert!(table.contains("Grand Total,25,45,false,true"));
}

#[test]
fn unknown_sheet_is_fatal() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("Sheet.csv", TWO_REGION_CSV);
    bin()
        .args([
            "normalize",
            "-i",
            input.to_str().expect("utf-8 path"),
            "-o",
            workspace.path().to_str().expect("utf-8 path"),
            "--sheet",
            "Missing",
        ])
        .assert()
        .failure()
        .stderr(contains("Sheet 'Missing' not found"));
}

#[test]
fn missing_input_is_fatal() {
    let workspace = TestWorkspace::new();
    bin()
        .args([
            "normalize",
            "-i",
            workspace.path().join("absent.csv").to_str().expect("utf-8 path"),
        ])
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}
