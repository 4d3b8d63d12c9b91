//! FILENAME: core/ingest/src/csv_reader.rs
//! Delimited text ingestion (CSV, TSV).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use pivot_engine::SourceData;

use crate::IngestError;

pub fn read_csv(path: &Path, delimiter: u8) -> Result<SourceData, IngestError> {
    let file = File::open(path)?;
    read_delimited(file, delimiter)
}

/// Reads in-memory delimited text. The first row is the header.
pub fn read_csv_str(input: &str, delimiter: u8) -> Result<SourceData, IngestError> {
    read_delimited(input.as_bytes(), delimiter)
}

fn read_delimited<R: Read>(input: R, delimiter: u8) -> Result<SourceData, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(IngestError::MissingHeaders);
    }

    let mut data = SourceData::new(headers.iter().map(str::to_string).collect());
    let mut ragged = 0usize;

    for record in reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            ragged += 1;
        }
        data.add_record(record.iter().map(|v| Some(v.to_string())).collect());
    }

    if ragged > 0 {
        log::debug!("{} rows did not match the header width", ragged);
    }
    log::debug!(
        "read {} records with {} fields",
        data.record_count(),
        headers.len()
    );

    Ok(data)
}
