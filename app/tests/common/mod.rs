//! FILENAME: tests/common/mod.rs
//! Fixtures for pivot command line integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Sample sales data for pivot table tests.
pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Region", "Product", "Quarter", "Sales", "Quantity"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }

    pub fn csv() -> String {
        let mut lines = vec![Self::headers().join(",")];
        for (region, product, quarter, sales, quantity) in Self::data() {
            lines.push(format!("{region},{product},{quarter},{sales},{quantity}"));
        }
        lines.join("\n") + "\n"
    }

    /// Writes the fixture as `sales.csv` into a fresh temp directory.
    pub fn write_csv() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sales.csv");
        fs::write(&path, Self::csv()).unwrap();
        (dir, path)
    }
}

/// Runs the command line and returns what it printed.
pub fn run_cli(args: &[&str]) -> Result<String, app_lib::AppError> {
    let mut out = Vec::new();
    let mut full = vec!["pivot"];
    full.extend_from_slice(args);
    app_lib::cli::run_with_args(full, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}
