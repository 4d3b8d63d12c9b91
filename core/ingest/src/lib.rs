//! FILENAME: core/ingest/src/lib.rs
//! Source ingestion for the pivot engine.
//!
//! Turns a tabular file into `SourceData`: ordered field names from the
//! header row plus one record per data row, every value kept as raw text.

mod csv_reader;
mod error;
mod xlsx_reader;

use std::path::Path;

use pivot_engine::SourceData;

pub use csv_reader::{read_csv, read_csv_str};
pub use error::IngestError;
pub use xlsx_reader::load_xlsx;

/// Options controlling how a source file is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Worksheet to read from a workbook. Defaults to the first sheet.
    pub sheet: Option<String>,

    /// Field delimiter override for delimited text.
    pub delimiter: Option<u8>,
}

/// Supported source file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl SourceFormat {
    /// Detects the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "tsv" | "tab" => Ok(SourceFormat::Tsv),
            "xlsx" | "xlsm" => Ok(SourceFormat::Xlsx),
            _ => Err(IngestError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn default_delimiter(self) -> u8 {
        match self {
            SourceFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Loads a source file into records, dispatching on its extension.
pub fn load_source(path: &Path, options: &LoadOptions) -> Result<SourceData, IngestError> {
    let format = SourceFormat::from_path(path)?;
    log::debug!("loading {} as {:?}", path.display(), format);

    match format {
        SourceFormat::Csv | SourceFormat::Tsv => {
            let delimiter = options
                .delimiter
                .unwrap_or_else(|| format.default_delimiter());
            read_csv(path, delimiter)
        }
        SourceFormat::Xlsx => load_xlsx(path, options.sheet.as_deref()),
    }
}
