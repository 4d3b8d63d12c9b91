//! FILENAME: app/src/error.rs

use ingest::IngestError;
use pivot_engine::PivotError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Pivot(#[from] PivotError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
