//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - The calculation core that transforms records into aggregates.
//!
//! This module takes a PivotDefinition (configuration) and SourceData (records)
//! and produces a PivotResult (immutable snapshot of reduced buckets).
//!
//! Algorithm:
//! 1. Resolve row, column and value field names to field indices once
//! 2. Single pass over records: build the row key and column group, then push
//!    one contribution per (value spec, aggregation) into its bucket
//! 3. Reduce every bucket once with the aggregation tagged on its column key
//! 4. Hand the result to the layout builders to produce a PivotView

use std::collections::BTreeSet;
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::cache::{
    parse_number, AggregateAccumulator, ColumnKey, FieldIndex, GroupKey, SourceData,
};
use crate::definition::{AggregationType, Measure, PivotDefinition};
use crate::layout::{build_headers, build_rows};
use crate::view::{DrillDownResult, PivotView};

// ============================================================================
// PIVOT RESULT
// ============================================================================

/// Immutable snapshot of one pivot computation.
///
/// Sparse: a row holds an entry only for the column keys it received records
/// for. Consumers treat missing entries as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotResult {
    rows: FxHashMap<GroupKey, FxHashMap<ColumnKey, f64>>,
    column_keys: Vec<ColumnKey>,
    column_field_count: usize,
}

impl PivotResult {
    /// All distinct leaf column keys observed, sorted.
    pub fn column_keys(&self) -> &[ColumnKey] {
        &self.column_keys
    }

    /// Number of column grouping levels the keys were built with.
    pub fn column_field_count(&self) -> usize {
        self.column_field_count
    }

    /// Row keys present in the result, in no particular order.
    pub fn row_keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.rows.keys()
    }

    /// Rows with their cell maps, in no particular order.
    pub fn rows(&self) -> impl Iterator<Item = (&GroupKey, &FxHashMap<ColumnKey, f64>)> {
        self.rows.iter()
    }

    pub fn row(&self, row_key: &GroupKey) -> Option<&FxHashMap<ColumnKey, f64>> {
        self.rows.get(row_key)
    }

    /// The reduced value at an intersection, if the row received any record
    /// for that column key.
    pub fn value(&self, row_key: &GroupKey, column_key: &ColumnKey) -> Option<f64> {
        self.rows
            .get(row_key)
            .and_then(|cells| cells.get(column_key))
            .copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// The main calculation engine for pivot tables.
pub struct PivotCalculator<'a> {
    data: &'a SourceData,
    definition: &'a PivotDefinition,

    /// Row field indices (`None` for names missing from the source).
    row_field_indices: Vec<Option<FieldIndex>>,

    /// Column field indices.
    col_field_indices: Vec<Option<FieldIndex>>,

    /// One index per value spec, in spec order.
    value_field_indices: Vec<Option<FieldIndex>>,
}

impl<'a> PivotCalculator<'a> {
    /// Creates a new calculator instance.
    pub fn new(data: &'a SourceData, definition: &'a PivotDefinition) -> Self {
        let row_field_indices = resolve_fields(data, &definition.row_fields);
        let col_field_indices = resolve_fields(data, &definition.column_fields);
        let value_field_indices = definition
            .value_specs
            .iter()
            .map(|spec| data.field_index(&spec.field))
            .collect();

        PivotCalculator {
            data,
            definition,
            row_field_indices,
            col_field_indices,
            value_field_indices,
        }
    }

    /// Executes the grouping pass and reduction.
    pub fn calculate(&self) -> PivotResult {
        let started = Instant::now();

        let mut buckets: FxHashMap<GroupKey, FxHashMap<ColumnKey, AggregateAccumulator>> =
            FxHashMap::default();
        let mut column_keys: BTreeSet<ColumnKey> = BTreeSet::new();

        for record in self.data.records() {
            let row_key = GroupKey::from_record(record, &self.row_field_indices);
            let col_group = GroupKey::from_record(record, &self.col_field_indices);
            let row_buckets = buckets.entry(row_key).or_default();

            let specs = self.definition.value_specs.iter();
            for (spec, &field_index) in specs.zip(&self.value_field_indices) {
                let numeric = field_index
                    .and_then(|i| record.get(i))
                    .and_then(parse_number);

                for &aggregation in &spec.aggregations {
                    let key = ColumnKey::new(
                        col_group.clone(),
                        Measure::new(spec.field.clone(), aggregation),
                    );
                    let contribution = match aggregation {
                        AggregationType::Count => Some(1.0),
                        _ => numeric,
                    };

                    if !column_keys.contains(&key) {
                        column_keys.insert(key.clone());
                    }
                    // The bucket exists even when the value did not parse.
                    let acc = row_buckets.entry(key).or_default();
                    if let Some(value) = contribution {
                        acc.add(value);
                    }
                }
            }
        }

        let rows: FxHashMap<GroupKey, FxHashMap<ColumnKey, f64>> = buckets
            .into_iter()
            .map(|(row_key, cells)| {
                let reduced = cells
                    .into_iter()
                    .map(|(key, acc)| {
                        let value = acc.compute(key.aggregation());
                        (key, value)
                    })
                    .collect();
                (row_key, reduced)
            })
            .collect();

        log::debug!(
            "pivot computed: {} records -> {} rows x {} column keys in {:?}",
            self.data.record_count(),
            rows.len(),
            column_keys.len(),
            started.elapsed()
        );

        PivotResult {
            rows,
            column_keys: column_keys.into_iter().collect(),
            column_field_count: self.definition.column_fields.len(),
        }
    }
}

fn resolve_fields(data: &SourceData, names: &[String]) -> Vec<Option<FieldIndex>> {
    let indices: Vec<Option<FieldIndex>> =
        names.iter().map(|name| data.field_index(name)).collect();
    for (name, index) in names.iter().zip(&indices) {
        if index.is_none() {
            log::debug!("field '{}' not in source; grouping it as empty", name);
        }
    }
    indices
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Groups and reduces `data` according to `definition`.
pub fn compute(data: &SourceData, definition: &PivotDefinition) -> PivotResult {
    PivotCalculator::new(data, definition).calculate()
}

/// Calculates a full pivot table view: engine pass plus both layout builders.
/// This is the main entry point for render collaborators.
pub fn calculate_pivot(data: &SourceData, definition: &PivotDefinition) -> PivotView {
    let result = compute(data, definition);
    let column_keys = result.column_keys();
    let column_field_count = definition.column_fields.len();

    let header_rows = build_headers(
        column_keys,
        column_field_count,
        &definition.row_fields,
        &definition.value_specs,
    );
    let rows = build_rows(
        &result,
        &definition.row_fields,
        column_keys,
        &definition.value_specs,
    );

    let row_label_col_count = definition.row_fields.len().max(1);
    let measure_count = definition.measures().len();

    PivotView {
        column_header_row_count: header_rows.len(),
        header_rows,
        body_rows: rows.body,
        footer: rows.footer,
        column_keys: column_keys.iter().map(ToString::to_string).collect(),
        row_label_col_count,
        col_count: row_label_col_count + column_keys.len() + measure_count,
    }
}

/// Finds the source records behind a row group, optionally narrowed to one
/// column group.
pub fn drill_down(
    data: &SourceData,
    definition: &PivotDefinition,
    row_key: &GroupKey,
    column_group: Option<&GroupKey>,
    max_records: usize,
) -> DrillDownResult {
    let calculator = PivotCalculator::new(data, definition);
    let mut result = DrillDownResult::new(row_key.clone(), column_group.cloned());
    result.max_records = max_records;

    let mut count = 0;
    for record in data.records() {
        let row_matches = GroupKey::from_record(record, &calculator.row_field_indices) == *row_key;
        let col_matches = column_group.map_or(true, |group| {
            GroupKey::from_record(record, &calculator.col_field_indices) == *group
        });

        if row_matches && col_matches {
            count += 1;
            if result.source_rows.len() < max_records {
                result.source_rows.push(record.source_row);
            }
        }
    }

    result.total_count = count;
    result.is_truncated = count > max_records;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregationType, ValueSpec};

    fn region_sales() -> SourceData {
        SourceData::from_rows(
            ["Region", "Sales"],
            [["E", "10"], ["E", "20"], ["W", "5"]],
        )
    }

    fn row(values: &[&str]) -> GroupKey {
        values.iter().copied().collect()
    }

    fn col(group: &[&str], field: &str, aggregation: AggregationType) -> ColumnKey {
        ColumnKey::new(group.iter().copied().collect(), Measure::new(field, aggregation))
    }

    #[test]
    fn test_sum_and_average_per_row() {
        let data = region_sales();
        let definition = PivotDefinition::new().with_rows(["Region"]).with_value(
            ValueSpec::new("Sales", vec![AggregationType::Sum, AggregationType::Average]),
        );

        let result = compute(&data, &definition);

        assert_eq!(result.row_count(), 2);
        let sum = col(&[], "Sales", AggregationType::Sum);
        let avg = col(&[], "Sales", AggregationType::Average);
        assert_eq!(result.value(&row(&["E"]), &sum), Some(30.0));
        assert_eq!(result.value(&row(&["E"]), &avg), Some(15.0));
        assert_eq!(result.value(&row(&["W"]), &sum), Some(5.0));
        assert_eq!(result.value(&row(&["W"]), &avg), Some(5.0));

        let keys: Vec<String> = result.column_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["Sales (avg)", "Sales (sum)"]);
    }

    #[test]
    fn test_count_ignores_parseability() {
        let data = SourceData::from_rows(
            ["Region", "Sales"],
            [["E", "10"], ["E", "oops"], ["W", ""]],
        );
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::new("Sales", vec![AggregationType::Count, AggregationType::Sum]));

        let result = compute(&data, &definition);

        let count = col(&[], "Sales", AggregationType::Count);
        let sum = col(&[], "Sales", AggregationType::Sum);
        assert_eq!(result.value(&row(&["E"]), &count), Some(2.0));
        assert_eq!(result.value(&row(&["W"]), &count), Some(1.0));
        assert_eq!(result.value(&row(&["E"]), &sum), Some(10.0));
        // The bucket exists but received no numeric contribution.
        assert_eq!(result.value(&row(&["W"]), &sum), Some(0.0));
    }

    #[test]
    fn test_empty_bucket_min_max_are_zero() {
        let data = SourceData::from_rows(["Region", "Sales"], [["E", "n/a"]]);
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::new("Sales", vec![AggregationType::Min, AggregationType::Max]));

        let result = compute(&data, &definition);

        for agg in [AggregationType::Min, AggregationType::Max] {
            let value = result.value(&row(&["E"]), &col(&[], "Sales", agg)).unwrap();
            assert_eq!(value, 0.0);
            assert!(value.is_finite());
        }
    }

    #[test]
    fn test_numeric_prefixes_contribute() {
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));
        let sum = col(&[], "Sales", AggregationType::Sum);

        for junk in ["x", "inf"] {
            let data = SourceData::from_rows(
                ["Region", "Sales"],
                [["E", "15 units"], ["E", "10%"], ["E", junk]],
            );
            let result = compute(&data, &definition);
            assert_eq!(result.value(&row(&["E"]), &sum), Some(25.0), "{junk}");
        }
    }

    #[test]
    fn test_fractional_sums_ignore_record_order() {
        let definition = PivotDefinition::new().with_rows(["Region"]).with_value(
            ValueSpec::new("Sales", vec![AggregationType::Sum, AggregationType::Average]),
        );
        let forward = SourceData::from_rows(
            ["Region", "Sales"],
            [["E", "0.1"], ["E", "0.2"], ["E", "0.3"]],
        );
        let backward = SourceData::from_rows(
            ["Region", "Sales"],
            [["E", "0.3"], ["E", "0.2"], ["E", "0.1"]],
        );

        let a = compute(&forward, &definition);
        let b = compute(&backward, &definition);

        assert_eq!(a, b);
        let sum = col(&[], "Sales", AggregationType::Sum);
        let avg = col(&[], "Sales", AggregationType::Average);
        assert_eq!(
            a.value(&row(&["E"]), &sum).map(f64::to_bits),
            b.value(&row(&["E"]), &sum).map(f64::to_bits)
        );
        assert_eq!(
            a.value(&row(&["E"]), &avg).map(f64::to_bits),
            b.value(&row(&["E"]), &avg).map(f64::to_bits)
        );
    }

    #[test]
    fn test_column_groups_prefix_leaf_keys() {
        let data = SourceData::from_rows(
            ["Region", "Quarter", "Sales"],
            [["E", "Q2", "1"], ["E", "Q1", "2"], ["W", "Q1", "4"]],
        );
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_columns(["Quarter"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));

        let result = compute(&data, &definition);

        let keys: Vec<String> = result.column_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["Q1 | Sales (sum)", "Q2 | Sales (sum)"]);
        assert_eq!(result.column_field_count(), 1);

        // Sparse: W never saw Q2.
        let q2 = col(&["Q2"], "Sales", AggregationType::Sum);
        assert_eq!(result.value(&row(&["W"]), &q2), None);
        assert_eq!(result.value(&row(&["E"]), &q2), Some(1.0));
    }

    #[test]
    fn test_no_row_or_column_fields_collapse_to_one_group() {
        let data = region_sales();
        let definition =
            PivotDefinition::new().with_value(ValueSpec::single("Sales", AggregationType::Sum));

        let result = compute(&data, &definition);

        assert_eq!(result.row_count(), 1);
        let only = result.row_keys().next().unwrap();
        assert!(only.is_empty());
        assert_eq!(
            result.value(only, &col(&[], "Sales", AggregationType::Sum)),
            Some(35.0)
        );
    }

    #[test]
    fn test_empty_value_specs_give_rows_without_cells() {
        let data = region_sales();
        let definition = PivotDefinition::new().with_rows(["Region"]);

        let result = compute(&data, &definition);

        assert!(result.column_keys().is_empty());
        assert_eq!(result.row_count(), 2);
        assert!(result.rows().all(|(_, cells)| cells.is_empty()));
    }

    #[test]
    fn test_empty_records() {
        let data = SourceData::new(vec!["Region".into(), "Sales".into()]);
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));

        let result = compute(&data, &definition);

        assert!(result.is_empty());
        assert!(result.column_keys().is_empty());
    }

    #[test]
    fn test_duplicate_value_specs_are_not_deduplicated() {
        let data = region_sales();
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum))
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));

        let result = compute(&data, &definition);

        // Both specs feed the same leaf column, so the value is doubled.
        let sum = col(&[], "Sales", AggregationType::Sum);
        assert_eq!(result.column_keys().len(), 1);
        assert_eq!(result.value(&row(&["E"]), &sum), Some(60.0));
    }

    #[test]
    fn test_unknown_fields_group_as_empty() {
        let data = region_sales();
        let definition = PivotDefinition::new()
            .with_rows(["Nope"])
            .with_value(ValueSpec::new("Missing", vec![AggregationType::Sum, AggregationType::Count]));

        let result = compute(&data, &definition);

        assert_eq!(result.row_count(), 1);
        let key = row(&[""]);
        assert_eq!(result.value(&key, &col(&[], "Missing", AggregationType::Sum)), Some(0.0));
        assert_eq!(result.value(&key, &col(&[], "Missing", AggregationType::Count)), Some(3.0));
    }

    #[test]
    fn test_separator_inside_values_stays_structured() {
        let data = SourceData::from_rows(
            ["Region", "Sales"],
            [["A | B", "1"], ["A", "2"]],
        );
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));

        let result = compute(&data, &definition);

        let sum = col(&[], "Sales", AggregationType::Sum);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.value(&row(&["A | B"]), &sum), Some(1.0));
        assert_eq!(result.value(&row(&["A"]), &sum), Some(2.0));
    }

    #[test]
    fn test_calculate_pivot_dimensions() {
        let data = SourceData::from_rows(
            ["Region", "Quarter", "Sales"],
            [["E", "Q1", "1"], ["E", "Q2", "2"], ["W", "Q1", "4"]],
        );
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_columns(["Quarter"])
            .with_value(ValueSpec::new("Sales", vec![AggregationType::Sum, AggregationType::Max]));

        let view = calculate_pivot(&data, &definition);

        assert_eq!(view.column_header_row_count, 2);
        assert_eq!(view.row_label_col_count, 1);
        assert_eq!(view.column_keys.len(), 4);
        assert_eq!(view.col_count, 1 + 4 + 2);
        assert_eq!(view.body_rows.len(), 2);
        assert!(view.footer.is_some());
        assert_eq!(view.row_count(), 2 + 2 + 1);
    }

    #[test]
    fn test_calculate_pivot_without_records_has_no_body() {
        let data = SourceData::new(vec!["Region".into(), "Sales".into()]);
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));

        let view = calculate_pivot(&data, &definition);

        assert!(!view.has_data());
        assert!(view.footer.is_none());
        assert!(view.column_keys.is_empty());
    }

    #[test]
    fn test_drill_down() {
        let data = SourceData::from_rows(
            ["Region", "Quarter", "Sales"],
            [
                ["E", "Q1", "1"],
                ["W", "Q1", "2"],
                ["E", "Q2", "3"],
                ["E", "Q1", "4"],
            ],
        );
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_columns(["Quarter"]);

        let all_east = drill_down(&data, &definition, &row(&["E"]), None, 10);
        assert_eq!(all_east.source_rows, vec![0, 2, 3]);
        assert_eq!(all_east.total_count, 3);
        assert!(!all_east.is_truncated);

        let east_q1 = drill_down(&data, &definition, &row(&["E"]), Some(&row(&["Q1"])), 1);
        assert_eq!(east_q1.source_rows, vec![0]);
        assert_eq!(east_q1.total_count, 2);
        assert!(east_q1.is_truncated);
    }
}
