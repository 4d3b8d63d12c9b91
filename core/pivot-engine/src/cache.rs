//! FILENAME: core/pivot-engine/src/cache.rs
//! Pivot Cache - Source records and the composite keys built from them.
//!
//! The cache is designed for:
//! - Ordered storage of ingested records (ingestion order is display order)
//! - O(1) field lookup by name
//! - Structured group keys (ordered tuples of segment values) instead of
//!   separator-joined strings, so grouping values may contain any character
//!
//! Architecture:
//! - Each record stores one optional raw string per field, indexed by FieldIndex
//! - Row and column group keys are built per record from resolved field indices
//! - Aggregation buckets are transient accumulators keyed by (row key, column key)

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::definition::{AggregationType, Measure};
use crate::error::PivotError;

/// Index into the source data fields (0-based).
pub type FieldIndex = usize;

/// Separator used when keys are rendered to (or parsed from) their string form.
pub const KEY_SEPARATOR: &str = " | ";

// ============================================================================
// NUMBER PARSING
// ============================================================================

/// Parses a raw cell as a floating-point contribution.
///
/// Reads the longest numeric prefix after leading whitespace, so `"15 units"`
/// is 15 and `"10%"` is 10. The only non-finite literal is the exact-case
/// `Infinity` (with optional sign); `inf`, `infinity` and `NaN` yield `None`,
/// as does input with no leading digits.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        let negative = bytes.first() == Some(&b'-');
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let count_digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_digits = count_digits(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it.
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Whether a raw cell holds a finite number (the numeric-field test).
/// Strict: the whole trimmed cell must be a number.
pub fn is_finite_number(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}

// ============================================================================
// SOURCE RECORDS
// ============================================================================

/// A single row from the source data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// The original row index in the source data (0-based, excluding header).
    pub source_row: u32,

    /// Raw value for each field, indexed by FieldIndex. `None` = absent.
    pub values: Vec<Option<String>>,
}

impl SourceRecord {
    /// Raw value of a field, if present.
    pub fn get(&self, field_index: FieldIndex) -> Option<&str> {
        self.values.get(field_index).and_then(|v| v.as_deref())
    }
}

/// The ingested table: ordered field names plus ordered records.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    fields: Vec<String>,
    field_lookup: FxHashMap<String, FieldIndex>,
    records: Vec<SourceRecord>,
}

impl SourceData {
    /// Creates an empty table with the given field names.
    /// When a name repeats, lookups resolve to its first occurrence.
    pub fn new(fields: Vec<String>) -> Self {
        let mut field_lookup = FxHashMap::default();
        for (index, name) in fields.iter().enumerate() {
            field_lookup.entry(name.clone()).or_insert(index);
        }
        SourceData {
            fields,
            field_lookup,
            records: Vec::new(),
        }
    }

    /// Builds a table from string rows; empty strings are kept as present-but-empty.
    pub fn from_rows<F, R, S>(fields: F, rows: R) -> Self
    where
        F: IntoIterator<Item = S>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data = SourceData::new(fields.into_iter().map(Into::into).collect());
        for row in rows {
            data.add_record(row.into_iter().map(|v| Some(v.into())).collect());
        }
        data
    }

    /// Reserves capacity for expected record count.
    pub fn reserve(&mut self, record_count: usize) {
        self.records.reserve(record_count);
    }

    /// Adds a record. Values should be in field order; short rows are padded
    /// with absent values and extra values are dropped.
    pub fn add_record(&mut self, mut values: Vec<Option<String>>) {
        values.resize(self.fields.len(), None);
        let source_row = self.records.len() as u32;
        self.records.push(SourceRecord { source_row, values });
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolves a field name to its index.
    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.field_lookup.get(name).copied()
    }

    /// A field is numeric if at least one record's value parses as a finite
    /// number. One numeric cell is enough; the rest may be text.
    pub fn is_numeric_field(&self, field_index: FieldIndex) -> bool {
        self.records
            .iter()
            .any(|record| record.get(field_index).is_some_and(is_finite_number))
    }

    /// Numeric fields, in field order.
    pub fn numeric_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_numeric_field(*index))
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Non-numeric (grouping) fields, in field order.
    pub fn dimension_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_numeric_field(*index))
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

// ============================================================================
// GROUP KEY
// ============================================================================

/// An ordered tuple of grouping values (row fields or column fields).
///
/// Ordering is lexicographic over the segments, level by level. An empty key
/// is the implicit single group used when no fields are selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub values: SmallVec<[String; 4]>,
}

impl GroupKey {
    pub fn new(values: SmallVec<[String; 4]>) -> Self {
        GroupKey { values }
    }

    /// Builds the key for a record. Unknown fields and absent values both
    /// contribute an empty segment.
    pub fn from_record(record: &SourceRecord, field_indices: &[Option<FieldIndex>]) -> Self {
        let values = field_indices
            .iter()
            .map(|&index| {
                index
                    .and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();
        GroupKey { values }
    }

    pub fn segments(&self) -> &[String] {
        &self.values
    }

    pub fn segment(&self, level: usize) -> Option<&str> {
        self.values.get(level).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for GroupKey {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        GroupKey {
            values: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.values.join(KEY_SEPARATOR))
    }
}

// ============================================================================
// COLUMN KEY
// ============================================================================

/// A leaf column: a column group plus the measure reduced under it.
///
/// The aggregation travels as a tag on the measure, so nothing downstream
/// re-parses it from text. The string form
/// `<group> | <field> (<agg>)` (or `<field> (<agg>)` without column fields)
/// stays available through `Display` and [`ColumnKey::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub group: GroupKey,
    pub measure: Measure,
}

impl ColumnKey {
    pub fn new(group: GroupKey, measure: Measure) -> Self {
        ColumnKey { group, measure }
    }

    pub fn aggregation(&self) -> AggregationType {
        self.measure.aggregation
    }

    /// Parses the string form back into a key with `level_count` group segments.
    pub fn parse(key: &str, level_count: usize) -> Result<Self, PivotError> {
        let invalid = |reason: &str| PivotError::InvalidColumnKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        let mut segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if segments.len() < level_count + 1 {
            return Err(invalid("too few segments for the column field count"));
        }

        let leaf = segments.split_off(level_count).join(KEY_SEPARATOR);
        let (field, rest) = leaf
            .rsplit_once(" (")
            .ok_or_else(|| invalid("missing trailing '(agg)' token"))?;
        let token = rest
            .strip_suffix(')')
            .ok_or_else(|| invalid("unterminated '(agg)' token"))?;
        let aggregation = token.parse::<AggregationType>()?;

        Ok(ColumnKey {
            group: segments.into_iter().collect(),
            measure: Measure::new(field, aggregation),
        })
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.measure)
        } else {
            write!(f, "{}{}{}", self.group, KEY_SEPARATOR, self.measure)
        }
    }
}

// Group segments first (tuple order), then the measure.
impl Ord for ColumnKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group
            .cmp(&other.group)
            .then_with(|| self.measure.cmp(&other.measure))
    }
}

impl PartialOrd for ColumnKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// AGGREGATE ACCUMULATOR
// ============================================================================

/// Accumulator for one aggregation bucket.
/// Keeps every contribution so the sum does not depend on arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateAccumulator {
    values: Vec<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        AggregateAccumulator::default()
    }

    /// Adds one contribution.
    pub fn add(&mut self, value: f64) {
        self.values.push(value);
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Sum over the contributions in `total_cmp` order.
    pub fn sum(&self) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.iter().sum()
    }

    /// Computes the final aggregate. Empty buckets yield 0 for every kind.
    pub fn compute(&self, aggregation: AggregationType) -> f64 {
        match aggregation {
            AggregationType::Sum => self.sum(),
            AggregationType::Count => self.count() as f64,
            AggregationType::Average => {
                if self.is_empty() {
                    0.0
                } else {
                    self.sum() / (self.count() as f64)
                }
            }
            AggregationType::Min => self.min.unwrap_or(0.0),
            AggregationType::Max => self.max.unwrap_or(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
