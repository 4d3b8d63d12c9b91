//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot table.
//! These structures are designed to be:
//! - Serializable (definition files, JSON output)
//! - Plain read-only ordered lists handed to the engine
//! - Immutable snapshots of user intent

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::AggregateAccumulator;
use crate::error::PivotError;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "avg", alias = "average")]
    Average,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "count")]
    Count,
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Sum
    }
}

impl AggregationType {
    pub const ALL: [AggregationType; 5] = [
        AggregationType::Sum,
        AggregationType::Average,
        AggregationType::Min,
        AggregationType::Max,
        AggregationType::Count,
    ];

    /// The lowercase token used inside column keys, e.g. `Sales (avg)`.
    pub fn token(self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Average => "avg",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Count => "count",
        }
    }

    /// The capitalized token used in header labels, e.g. `Avg of Sales`.
    pub fn label(self) -> &'static str {
        match self {
            AggregationType::Sum => "Sum",
            AggregationType::Average => "Avg",
            AggregationType::Min => "Min",
            AggregationType::Max => "Max",
            AggregationType::Count => "Count",
        }
    }

    /// The aggregation applied when already-aggregated values of this kind
    /// are combined into a higher-level total.
    ///
    /// Counts roll up by summation (two groups of 2 and 1 records make 3);
    /// every other kind re-applies itself to the aggregated values.
    pub fn rollup(self) -> AggregationType {
        match self {
            AggregationType::Count => AggregationType::Sum,
            other => other,
        }
    }

    /// Reduces a list of contributions with this aggregation.
    /// An empty list reduces to 0 for every kind.
    pub fn reduce<I>(self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let mut acc = AggregateAccumulator::new();
        for value in values {
            acc.add(value);
        }
        acc.compute(self)
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for AggregationType {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationType::Sum),
            "avg" | "average" | "mean" => Ok(AggregationType::Average),
            "min" | "minimum" => Ok(AggregationType::Min),
            "max" | "maximum" => Ok(AggregationType::Max),
            "count" => Ok(AggregationType::Count),
            _ => Err(PivotError::UnknownAggregation(s.trim().to_string())),
        }
    }
}

// ============================================================================
// MEASURES AND VALUE SPECS
// ============================================================================

/// One (value field, aggregation) pair: the unit a column key ends with and
/// the unit per-row and grand totals are computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Measure {
    pub field: String,
    pub aggregation: AggregationType,
}

impl Measure {
    pub fn new(field: impl Into<String>, aggregation: AggregationType) -> Self {
        Measure {
            field: field.into(),
            aggregation,
        }
    }

    /// Leaf header label, e.g. `Sum of Sales`.
    pub fn label(&self) -> String {
        format!("{} of {}", self.aggregation.label(), self.field)
    }

    /// Trailing total header label, e.g. `Total Sum of Sales`.
    pub fn total_label(&self) -> String {
        format!("Total {}", self.label())
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.aggregation.token())
    }
}

// Ordered like the display string `field (token)`: by field name, then token.
impl Ord for Measure {
    fn cmp(&self, other: &Self) -> Ordering {
        self.field
            .cmp(&other.field)
            .then_with(|| self.aggregation.token().cmp(other.aggregation.token()))
    }
}

impl PartialOrd for Measure {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A value field with the aggregations to apply to it.
///
/// Multiple specs may name the same field; they are not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSpec {
    /// Name of the source field being aggregated.
    pub field: String,

    /// Aggregations to apply, in display order.
    pub aggregations: Vec<AggregationType>,
}

impl ValueSpec {
    pub fn new(field: impl Into<String>, aggregations: Vec<AggregationType>) -> Self {
        ValueSpec {
            field: field.into(),
            aggregations,
        }
    }

    /// A spec with a single aggregation.
    pub fn single(field: impl Into<String>, aggregation: AggregationType) -> Self {
        ValueSpec::new(field, vec![aggregation])
    }

    /// The measures this spec produces, in aggregation order.
    pub fn measures(&self) -> impl Iterator<Item = Measure> + '_ {
        self.aggregations
            .iter()
            .map(move |&aggregation| Measure::new(self.field.clone(), aggregation))
    }
}

/// Parses `Sales`, `Sales:sum` or `Sales:sum,avg`.
/// A bare field name defaults to a single sum.
impl FromStr for ValueSpec {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, aggs) = match s.rsplit_once(':') {
            Some((field, aggs)) => (field.trim(), Some(aggs)),
            None => (s.trim(), None),
        };

        if field.is_empty() {
            return Err(PivotError::InvalidValueSpec(s.to_string()));
        }

        let aggregations = match aggs {
            None => vec![AggregationType::Sum],
            Some(list) => {
                let parsed = list
                    .split(',')
                    .filter(|token| !token.trim().is_empty())
                    .map(str::parse)
                    .collect::<Result<Vec<AggregationType>, _>>()?;
                if parsed.is_empty() {
                    return Err(PivotError::InvalidValueSpec(s.to_string()));
                }
                parsed
            }
        };

        Ok(ValueSpec::new(field, aggregations))
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable definition of a pivot table.
///
/// Row and column fields are expected to be duplicate-free and disjoint, but
/// the engine does not enforce either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotDefinition {
    /// Fields placed in the Row area (ordered from outer to inner).
    #[serde(default)]
    pub row_fields: Vec<String>,

    /// Fields placed in the Column area (ordered from outer to inner).
    #[serde(default)]
    pub column_fields: Vec<String>,

    /// Fields placed in the Values area.
    #[serde(default)]
    pub value_specs: Vec<ValueSpec>,
}

impl PivotDefinition {
    pub fn new() -> Self {
        PivotDefinition::default()
    }

    pub fn with_rows<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_columns<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value(mut self, spec: ValueSpec) -> Self {
        self.value_specs.push(spec);
        self
    }

    /// Distinct measures across all value specs, in declaration order.
    pub fn measures(&self) -> Vec<Measure> {
        distinct_measures(&self.value_specs)
    }

    /// Whether a table is worth rendering: at least one measure and at least
    /// one grouping field on either axis.
    pub fn is_renderable(&self) -> bool {
        let has_grouping = !self.row_fields.is_empty() || !self.column_fields.is_empty();
        has_grouping && self.value_specs.iter().any(|spec| !spec.aggregations.is_empty())
    }
}

/// Collects the distinct measures of `specs` in declaration order (not sorted).
pub fn distinct_measures(specs: &[ValueSpec]) -> Vec<Measure> {
    let mut measures: Vec<Measure> = Vec::new();
    for measure in specs.iter().flat_map(ValueSpec::measures) {
        if !measures.contains(&measure) {
            measures.push(measure);
        }
    }
    measures
}
