//! FILENAME: core/pivot-engine/src/layout.rs
//! Pivot Layout - Header and row builders that turn a PivotResult into
//! spanned view cells.
//!
//! Spans are computed independently per level: a run is a maximal block of
//! adjacent columns (or rows) sharing the same segment value at that level.
//! Every total is an aggregate of already-aggregated values:
//! - row totals re-aggregate the row's own leaf cells of one measure
//! - column totals re-aggregate one leaf column across all rows
//! - grand totals re-aggregate the row totals of one measure
//!
//! Counts roll up by summation at every tier (see `AggregationType::rollup`).

use crate::cache::{ColumnKey, GroupKey};
use crate::definition::{distinct_measures, Measure, ValueSpec};
use crate::engine::PivotResult;
use crate::view::{PivotBodyRow, PivotCellType, PivotFooterRow, PivotViewCell, RowLayout};

/// Label shown for an empty grouping segment.
pub const EMPTY_SEGMENT_LABEL: &str = "-";

/// Label for the footer row, and for the single row when no row fields exist.
pub const TOTAL_LABEL: &str = "Total";

/// Corner label when no row fields exist.
pub const DEFAULT_CORNER_LABEL: &str = "Row";

/// Collapses adjacent equal items into `(item, run length)` pairs.
pub fn span_runs<T, I>(items: I) -> Vec<(T, usize)>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut runs: Vec<(T, usize)> = Vec::new();
    for item in items {
        match runs.last_mut() {
            Some((last, len)) if *last == item => *len += 1,
            _ => runs.push((item, 1)),
        }
    }
    runs
}

fn segment_label(segment: &str) -> String {
    if segment.is_empty() {
        EMPTY_SEGMENT_LABEL.to_string()
    } else {
        segment.to_string()
    }
}

fn corner_label(row_fields: &[String]) -> String {
    if row_fields.is_empty() {
        DEFAULT_CORNER_LABEL.to_string()
    } else {
        row_fields.join(" / ")
    }
}

// ============================================================================
// HEADER LAYOUT
// ============================================================================

/// Builds the `column_field_count + 1` header rows.
///
/// Row 0 also carries the corner cell (first) and one trailing total header
/// per distinct measure (last), each spanning every header row.
pub fn build_headers(
    column_keys: &[ColumnKey],
    column_field_count: usize,
    row_fields: &[String],
    value_specs: &[ValueSpec],
) -> Vec<Vec<PivotViewCell>> {
    let header_row_count = column_field_count + 1;
    let mut rows: Vec<Vec<PivotViewCell>> = vec![Vec::new(); header_row_count];

    rows[0].push(
        PivotViewCell::corner(corner_label(row_fields))
            .with_row_span(header_row_count as u32)
            .with_col_span(row_fields.len().max(1) as u32),
    );

    for level in 0..column_field_count {
        let segments = column_keys
            .iter()
            .map(|key| key.group.segment(level).unwrap_or_default());
        for (segment, len) in span_runs(segments) {
            rows[level].push(PivotViewCell::column_header(segment_label(segment)).with_col_span(len as u32));
        }
    }

    rows[column_field_count].extend(
        column_keys
            .iter()
            .map(|key| PivotViewCell::value_header(key.measure.label())),
    );

    rows[0].extend(distinct_measures(value_specs).iter().map(|measure| {
        PivotViewCell::total_header(measure.total_label()).with_row_span(header_row_count as u32)
    }));

    rows
}

// ============================================================================
// ROW LAYOUT
// ============================================================================

/// Builds the body rows (sorted by row key) and the footer.
pub fn build_rows(
    result: &PivotResult,
    row_fields: &[String],
    column_keys: &[ColumnKey],
    value_specs: &[ValueSpec],
) -> RowLayout {
    let mut entries: Vec<&GroupKey> = result.row_keys().collect();
    entries.sort();

    if entries.is_empty() {
        return RowLayout::default();
    }

    let measures = distinct_measures(value_specs);
    let labels = row_labels(&entries, row_fields.len());

    // Leaf values per row, missing intersections as 0.
    let matrix: Vec<Vec<f64>> = entries
        .iter()
        .map(|&key| {
            let cells = result.row(key);
            column_keys
                .iter()
                .map(|column| {
                    cells
                        .and_then(|c| c.get(column))
                        .copied()
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    let row_totals: Vec<Vec<f64>> = matrix
        .iter()
        .map(|values| {
            measures
                .iter()
                .map(|measure| measure_total(measure, column_keys, values))
                .collect()
        })
        .collect();

    let body: Vec<PivotBodyRow> = entries
        .iter()
        .zip(labels)
        .zip(matrix.iter().zip(&row_totals))
        .map(|((&key, labels), (values, totals))| PivotBodyRow {
            key: key.clone(),
            labels,
            values: values.iter().map(|&v| PivotViewCell::data(v)).collect(),
            totals: totals
                .iter()
                .map(|&v| PivotViewCell::total(v, PivotCellType::RowTotal))
                .collect(),
        })
        .collect();

    let column_totals = column_keys
        .iter()
        .enumerate()
        .map(|(index, key)| {
            let value = key
                .aggregation()
                .rollup()
                .reduce(matrix.iter().map(|values| values[index]));
            PivotViewCell::total(value, PivotCellType::ColumnTotal)
        })
        .collect();

    let grand_totals = measures
        .iter()
        .enumerate()
        .map(|(index, measure)| {
            let value = measure
                .aggregation
                .rollup()
                .reduce(row_totals.iter().map(|totals| totals[index]));
            PivotViewCell::total(value, PivotCellType::GrandTotal)
        })
        .collect();

    let footer = PivotFooterRow {
        label: PivotViewCell::total_label(TOTAL_LABEL.to_string())
            .with_col_span(row_fields.len().max(1) as u32),
        column_totals,
        grand_totals,
    };

    RowLayout {
        body,
        footer: Some(footer),
    }
}

/// Re-aggregates one row's leaf values that belong to `measure`.
fn measure_total(measure: &Measure, column_keys: &[ColumnKey], values: &[f64]) -> f64 {
    let own = column_keys
        .iter()
        .zip(values)
        .filter(|(key, _)| key.measure == *measure)
        .map(|(_, &value)| value);
    measure.aggregation.rollup().reduce(own)
}

/// Label cells for each sorted row. Only the first row of a run renders the
/// label for that level.
fn row_labels(entries: &[&GroupKey], level_count: usize) -> Vec<Vec<PivotViewCell>> {
    let mut labels: Vec<Vec<PivotViewCell>> = vec![Vec::new(); entries.len()];

    if level_count == 0 {
        for row in &mut labels {
            row.push(PivotViewCell::row_header(TOTAL_LABEL.to_string()));
        }
        return labels;
    }

    for level in 0..level_count {
        let segments = entries
            .iter()
            .map(|key| key.segment(level).unwrap_or_default());
        let mut start = 0;
        for (segment, len) in span_runs(segments) {
            labels[start].push(
                PivotViewCell::row_header(segment_label(segment)).with_row_span(len as u32),
            );
            start += len;
        }
    }

    labels
}
