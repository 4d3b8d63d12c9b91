//! FILENAME: core/pivot-engine/src/error.rs

use thiserror::Error;

/// Errors raised at the text boundaries of the engine.
///
/// Computation itself never fails: every degenerate input yields a
/// well-defined empty or zeroed result. Only parsing user-supplied tokens
/// and wire-format column keys can be rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PivotError {
    #[error("Unknown aggregation '{0}' (expected sum, avg, min, max or count)")]
    UnknownAggregation(String),

    #[error("Invalid value spec '{0}' (expected FIELD or FIELD:agg[,agg...])")]
    InvalidValueSpec(String),

    #[error("Invalid column key '{key}': {reason}")]
    InvalidColumnKey { key: String, reason: String },
}
