//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot aggregation engine.
//!
//! Groups flat records by row and column fields, reduces value fields through
//! one or more aggregations per intersection, and lays the result out as a
//! hierarchical table with spanned headers and three tiers of totals.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot table IS)
//! - `cache`: Source records and structured keys (what we group BY)
//! - `engine`: Grouping and reduction pass (HOW we calculate)
//! - `layout`: Header and row builders, including totals
//! - `view`: Renderable output for the render collaborator (WHAT we display)

pub mod cache;
pub mod definition;
pub mod engine;
pub mod error;
pub mod layout;
pub mod view;

pub use cache::*;
pub use definition::*;
pub use engine::{calculate_pivot, compute, drill_down, PivotCalculator, PivotResult};
pub use error::PivotError;
pub use layout::{build_headers, build_rows, span_runs};
pub use view::*;
