#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use limnify::{Value, table::Cell};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
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

    /// Reads a workspace-relative file such as `datafiles/x.csv`.
    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(relative))
            .unwrap_or_else(|err| panic!("read {relative}: {err}"))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.temp_dir.path().join(relative).exists()
    }

    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(relative)).expect("valid json")
    }
}

pub fn date(year: i32, month: u32, day: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(year, month, day).expect("valid date"))
}

pub fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// One row mapping per `(date, x, y)` triple.
pub fn xy_rows(rows: &[(Value, i64, i64)]) -> Vec<BTreeMap<String, Value>> {
    rows.iter()
        .map(|(date, x, y)| {
            BTreeMap::from([
                ("date".to_string(), date.clone()),
                ("x".to_string(), Value::Integer(*x)),
                ("y".to_string(), Value::Integer(*y)),
            ])
        })
        .collect()
}

pub fn positional(rows: &[(Value, i64, i64)]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|(date, x, y)| {
            vec![
                Some(date.clone()),
                Some(Value::Integer(*x)),
                Some(Value::Integer(*y)),
            ]
        })
        .collect()
}

pub fn columnar(rows: &[(Value, i64, i64)]) -> BTreeMap<String, Vec<Cell>> {
    BTreeMap::from([
        (
            "date".to_string(),
            rows.iter().map(|(d, _, _)| Some(d.clone())).collect(),
        ),
        (
            "x".to_string(),
            rows.iter().map(|(_, x, _)| Some(Value::Integer(*x))).collect(),
        ),
        (
            "y".to_string(),
            rows.iter().map(|(_, _, y)| Some(Value::Integer(*y))).collect(),
        ),
    ])
}
