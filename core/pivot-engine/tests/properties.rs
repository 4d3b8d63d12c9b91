//! Property-based tests for the pivot engine.
//!
//! Most properties use small integers (or junk text) so sums are exact in
//! f64. The permutation property uses fractional values, where addition is
//! not associative, and still asserts plain equality.

use std::collections::BTreeSet;

use proptest::prelude::*;

use pivot_engine::{
    calculate_pivot, compute, AggregationType, ColumnKey, GroupKey, Measure, PivotDefinition,
    SourceData, ValueSpec,
};

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

/// One raw Sales cell: mostly integers, sometimes empty or non-numeric.
fn arb_sales() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => (-1000i32..1000).prop_map(|v| v.to_string()),
        1 => Just(String::new()),
        1 => "[p-z]{1,4}",
    ]
}

/// One raw Sales cell with a fractional part, or junk.
fn arb_fractional_sales() -> impl Strategy<Value = String> {
    prop_oneof![
        6 => (-1.0e6f64..1.0e6).prop_map(|v| v.to_string()),
        1 => (0u32..1000).prop_map(|v| format!("0.{v:03}")),
        1 => "[p-z]{1,4}",
    ]
}

/// (Region, Quarter, Sales)
fn arb_record() -> impl Strategy<Value = (String, String, String)> {
    ("[A-C]", "Q[1-3]", arb_sales())
}

fn arb_records(max_len: usize) -> impl Strategy<Value = Vec<(String, String, String)>> {
    proptest::collection::vec(arb_record(), 1..max_len)
}

fn arb_fractional_records(max_len: usize) -> impl Strategy<Value = Vec<(String, String, String)>> {
    proptest::collection::vec(("[A-B]", "Q[1-2]", arb_fractional_sales()), 1..max_len)
}

/// Fractional records together with a shuffled copy of themselves.
fn arb_permuted_records(
    max_len: usize,
) -> impl Strategy<Value = (Vec<(String, String, String)>, Vec<(String, String, String)>)> {
    arb_fractional_records(max_len).prop_flat_map(|records| {
        let shuffled = Just(records.clone()).prop_shuffle();
        (Just(records), shuffled)
    })
}

fn to_source(records: &[(String, String, String)]) -> SourceData {
    SourceData::from_rows(
        ["Region".to_string(), "Quarter".to_string(), "Sales".to_string()],
        records
            .iter()
            .map(|(r, q, s)| vec![r.clone(), q.clone(), s.clone()]),
    )
}

fn all_aggregations() -> PivotDefinition {
    PivotDefinition::new()
        .with_rows(["Region"])
        .with_columns(["Quarter"])
        .with_value(ValueSpec::new("Sales", AggregationType::ALL.to_vec()))
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_result_invariant_under_permutation((records, shuffled) in arb_permuted_records(40)) {
        let definition = all_aggregations();
        let original = compute(&to_source(&records), &definition);
        let permuted = compute(&to_source(&shuffled), &definition);
        prop_assert_eq!(original, permuted);
    }

    #[test]
    fn prop_footer_sum_equals_column_sum(records in arb_records(40)) {
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_columns(["Quarter"])
            .with_value(ValueSpec::single("Sales", AggregationType::Sum));
        let view = calculate_pivot(&to_source(&records), &definition);
        let footer = view.footer.as_ref().expect("non-empty input has a footer");

        for (index, total) in footer.column_totals.iter().enumerate() {
            let column_sum: f64 = view
                .body_rows
                .iter()
                .filter_map(|row| row.values[index].value.as_number())
                .sum();
            prop_assert_eq!(total.value.as_number(), Some(column_sum));
        }
    }

    #[test]
    fn prop_count_matches_record_count(records in arb_records(40)) {
        let definition = PivotDefinition::new()
            .with_rows(["Region"])
            .with_columns(["Quarter"])
            .with_value(ValueSpec::single("Sales", AggregationType::Count));
        let result = compute(&to_source(&records), &definition);

        for (region, quarter, _) in &records {
            let expected = records
                .iter()
                .filter(|(r, q, _)| r == region && q == quarter)
                .count() as f64;
            let row: GroupKey = [region.as_str()].into_iter().collect();
            let key = ColumnKey::new(
                [quarter.as_str()].into_iter().collect(),
                Measure::new("Sales", AggregationType::Count),
            );
            prop_assert_eq!(result.value(&row, &key), Some(expected));
        }
    }

    #[test]
    fn prop_values_are_always_finite(records in arb_records(40)) {
        let result = compute(&to_source(&records), &all_aggregations());
        for (_, cells) in result.rows() {
            for value in cells.values() {
                prop_assert!(value.is_finite());
            }
        }
    }

    #[test]
    fn prop_column_keys_are_observed_combinations(records in arb_records(40)) {
        let result = compute(&to_source(&records), &all_aggregations());

        let expected: BTreeSet<String> = records
            .iter()
            .flat_map(|(_, quarter, _)| {
                AggregationType::ALL
                    .iter()
                    .map(move |agg| format!("{} | Sales ({})", quarter, agg.token()))
            })
            .collect();
        let actual: Vec<String> = result.column_keys().iter().map(ToString::to_string).collect();

        prop_assert_eq!(actual, expected.into_iter().collect::<Vec<_>>());
    }
}
