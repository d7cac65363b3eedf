#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_normalizer::grid::Grid;
use tempfile::{TempDir, tempdir};

/// Scratch directory that is removed when dropped.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(name)).expect("read workspace file")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.temp_dir.path().join(name).exists()
    }
}

pub fn grid(rows: Vec<Vec<&str>>) -> Grid {
    Grid::from_strings(rows)
}

/// Two side-by-side tables; the left one has a two-row header.
pub fn two_region_sheet() -> Grid {
    grid(vec![
        vec!["Region", "Sales", "Sales", "", "sku", "qty"],
        vec!["", "Q1", "Q2", "", "A1", "3"],
        vec!["North", "10", "12", "", "B2", "4"],
        vec!["South", "7", "9", "", "C3", "5"],
    ])
}

pub const TWO_REGION_CSV: &str = "Region,Sales,Sales,,sku,qty\n\
,Q1,Q2,,A1,3\n\
North,10,12,,B2,4\n\
South,7,9,,C3,5\n";
