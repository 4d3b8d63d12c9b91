//! FILENAME: core/ingest/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Input has no header row")]
    MissingHeaders,

    #[error("Unsupported file type: {0} (expected .csv, .tsv, .tab, .xlsx or .xlsm)")]
    UnsupportedFormat(String),
}
