//! FILENAME: core/pivot-engine/src/view.rs
//! Pivot View - Renderable output for the render collaborator.
//!
//! This module holds the cell and row structures produced by the layout
//! builders. It includes metadata for:
//! - Merged cells (row/column spans)
//! - Cell types (labels, data, row totals, column totals, grand totals)
//! - Pre-formatted display strings

use serde::{Deserialize, Serialize};

use crate::cache::GroupKey;

// ============================================================================
// CELL TYPES AND METADATA
// ============================================================================

/// The type of a cell in the pivot view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotCellType {
    /// Top-left cell naming the row fields.
    Corner,
    /// Column group label (one per run of equal values at a level).
    ColumnHeader,
    /// Leaf metric label, e.g. `Sum of Sales`.
    ValueHeader,
    /// Trailing per-measure total label, e.g. `Total Sum of Sales`.
    TotalHeader,
    /// Row group label.
    RowHeader,
    /// Data cell (aggregated value).
    Data,
    /// Per-row total for one measure.
    RowTotal,
    /// Footer label cell.
    TotalLabel,
    /// Footer total for one leaf column.
    ColumnTotal,
    /// Footer total for one measure across all rows.
    GrandTotal,
}

/// Display value for a pivot cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PivotCellValue {
    Number(f64),
    Text(String),
}

impl From<f64> for PivotCellValue {
    fn from(value: f64) -> Self {
        PivotCellValue::Number(value)
    }
}

impl PivotCellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PivotCellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Formats an aggregated value for display.
///
/// Integral values render without a fractional part, everything else with
/// two decimals. Absent values render as an empty string.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_finite() && v.fract() == 0.0 => {
            // Avoid "-0" for negative zero.
            if v == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", v)
            }
        }
        Some(v) => format!("{:.2}", v),
    }
}

// ============================================================================
// VIEW CELL
// ============================================================================

/// A single cell in the pivot table view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotViewCell {
    /// The display value.
    pub value: PivotCellValue,

    /// The type of this cell.
    pub cell_type: PivotCellType,

    /// Number of rows this cell spans.
    pub row_span: u32,

    /// Number of columns this cell spans.
    pub col_span: u32,

    /// Whether this cell should be visually emphasized (e.g., totals).
    pub is_bold: bool,

    /// Pre-formatted display string.
    pub formatted_value: String,
}

impl PivotViewCell {
    fn label(label: String, cell_type: PivotCellType) -> Self {
        PivotViewCell {
            formatted_value: label.clone(),
            value: PivotCellValue::Text(label),
            cell_type,
            row_span: 1,
            col_span: 1,
            is_bold: false,
        }
    }

    fn number(value: f64, cell_type: PivotCellType) -> Self {
        PivotViewCell {
            value: PivotCellValue::Number(value),
            formatted_value: format_value(Some(value)),
            cell_type,
            row_span: 1,
            col_span: 1,
            is_bold: false,
        }
    }

    /// Creates a data cell.
    pub fn data(value: f64) -> Self {
        PivotViewCell::number(value, PivotCellType::Data)
    }

    /// Creates a bold total cell of the given type.
    pub fn total(value: f64, cell_type: PivotCellType) -> Self {
        PivotViewCell::number(value, cell_type).as_total()
    }

    /// Creates the corner cell.
    pub fn corner(label: String) -> Self {
        PivotViewCell::label(label, PivotCellType::Corner).as_total()
    }

    /// Creates a column group header cell.
    pub fn column_header(label: String) -> Self {
        PivotViewCell::label(label, PivotCellType::ColumnHeader).as_total()
    }

    /// Creates a leaf metric header cell.
    pub fn value_header(label: String) -> Self {
        PivotViewCell::label(label, PivotCellType::ValueHeader).as_total()
    }

    /// Creates a trailing total header cell.
    pub fn total_header(label: String) -> Self {
        PivotViewCell::label(label, PivotCellType::TotalHeader).as_total()
    }

    /// Creates a row header cell.
    pub fn row_header(label: String) -> Self {
        PivotViewCell::label(label, PivotCellType::RowHeader)
    }

    /// Creates the footer label cell.
    pub fn total_label(label: String) -> Self {
        PivotViewCell::label(label, PivotCellType::TotalLabel).as_total()
    }

    pub fn with_row_span(mut self, span: u32) -> Self {
        self.row_span = span;
        self
    }

    pub fn with_col_span(mut self, span: u32) -> Self {
        self.col_span = span;
        self
    }

    /// Sets cell as a total.
    pub fn as_total(mut self) -> Self {
        self.is_bold = true;
        self
    }

    pub fn text(&self) -> &str {
        &self.formatted_value
    }
}

// ============================================================================
// BODY AND FOOTER ROWS
// ============================================================================

/// One body row of the pivot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotBodyRow {
    /// The row group this row represents.
    pub key: GroupKey,

    /// Label cells rendered by this row. A level whose run started on an
    /// earlier row renders nothing here.
    pub labels: Vec<PivotViewCell>,

    /// One cell per leaf column key.
    pub values: Vec<PivotViewCell>,

    /// One cell per distinct measure.
    pub totals: Vec<PivotViewCell>,
}

impl PivotBodyRow {
    /// All cells in render order.
    pub fn cells(&self) -> impl Iterator<Item = &PivotViewCell> {
        self.labels.iter().chain(&self.values).chain(&self.totals)
    }
}

/// The footer row: column totals followed by grand totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotFooterRow {
    pub label: PivotViewCell,
    pub column_totals: Vec<PivotViewCell>,
    pub grand_totals: Vec<PivotViewCell>,
}

impl PivotFooterRow {
    /// All cells in render order.
    pub fn cells(&self) -> impl Iterator<Item = &PivotViewCell> {
        std::iter::once(&self.label)
            .chain(&self.column_totals)
            .chain(&self.grand_totals)
    }
}

/// Output of the row layout builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowLayout {
    pub body: Vec<PivotBodyRow>,

    /// `None` when there are no body rows.
    pub footer: Option<PivotFooterRow>,
}

// ============================================================================
// MAIN VIEW STRUCT
// ============================================================================

/// The complete rendered view of a pivot table.
/// This is what gets handed to the render collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PivotView {
    /// Header rows: one per column field level plus the leaf metric row.
    pub header_rows: Vec<Vec<PivotViewCell>>,

    /// Body rows, sorted by row key.
    pub body_rows: Vec<PivotBodyRow>,

    /// Footer with column and grand totals.
    pub footer: Option<PivotFooterRow>,

    /// String form of every leaf column key, in column order.
    pub column_keys: Vec<String>,

    /// Number of row label columns (left area).
    pub row_label_col_count: usize,

    /// Number of column header rows (top area).
    pub column_header_row_count: usize,

    /// Total number of columns in the grid.
    pub col_count: usize,
}

impl PivotView {
    /// Whether the view has any body rows to show.
    pub fn has_data(&self) -> bool {
        !self.body_rows.is_empty()
    }

    /// Number of grid rows: headers, body and footer.
    pub fn row_count(&self) -> usize {
        self.header_rows.len() + self.body_rows.len() + usize::from(self.footer.is_some())
    }

    /// Every grid row as a list of cells, headers first, footer last.
    pub fn grid_rows(&self) -> Vec<Vec<&PivotViewCell>> {
        let mut rows: Vec<Vec<&PivotViewCell>> = self
            .header_rows
            .iter()
            .map(|row| row.iter().collect())
            .collect();
        rows.extend(self.body_rows.iter().map(|row| row.cells().collect()));
        if let Some(footer) = &self.footer {
            rows.push(footer.cells().collect());
        }
        rows
    }
}

// ============================================================================
// DRILL-DOWN RESULT
// ============================================================================

/// Result of a drill-down operation (showing detail records).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillDownResult {
    /// The row group that was drilled into.
    pub row_key: GroupKey,

    /// The column group that was drilled into (`None` = all columns).
    pub column_group: Option<GroupKey>,

    /// The detail records (source row indices).
    pub source_rows: Vec<u32>,

    /// Total count of matching records.
    pub total_count: usize,

    /// Whether this is a partial result.
    pub is_truncated: bool,

    /// Maximum records that were fetched.
    pub max_records: usize,
}

impl DrillDownResult {
    pub fn new(row_key: GroupKey, column_group: Option<GroupKey>) -> Self {
        DrillDownResult {
            row_key,
            column_group,
            source_rows: Vec::new(),
            total_count: 0,
            is_truncated: false,
            max_records: 1000, // Default limit
        }
    }
}
