// FILENAME: core\ingest\src\xlsx_reader.rs

use crate::IngestError;
use calamine::{open_workbook, Data, Reader, Xlsx};
use pivot_engine::SourceData;
use std::path::Path;

/// Loads one worksheet: the named sheet, or the first one.
/// The first used row is the header; fully empty rows are skipped.
pub fn load_xlsx(path: &Path, sheet: Option<&str>) -> Result<SourceData, IngestError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| IngestError::SheetNotFound(name.to_string()))?,
        None => sheet_names.first().cloned().ok_or_else(|| {
            IngestError::InvalidFormat("Workbook contains no sheets".to_string())
        })?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|c| cell_text(c).unwrap_or_default()).collect(),
        None => return Err(IngestError::MissingHeaders),
    };
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::MissingHeaders);
    }

    let mut data = SourceData::new(headers);
    let mut skipped = 0usize;

    for row in rows {
        let values: Vec<Option<String>> = row.iter().map(cell_text).collect();
        if values.iter().all(Option::is_none) {
            skipped += 1;
            continue;
        }
        data.add_record(values);
    }

    log::debug!(
        "sheet '{}': {} records, {} empty rows skipped",
        sheet_name,
        data.record_count(),
        skipped
    );

    Ok(data)
}

/// Raw text of a cell. Numbers use their shortest form (`10.0` -> `"10"`).
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("{:?}", e),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    };
    Some(text)
}
