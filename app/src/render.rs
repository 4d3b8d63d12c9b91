//! FILENAME: app/src/render.rs
//! Text and JSON renderers for pivot views and field listings.

use pivot_engine::{PivotCellType, PivotView, PivotViewCell, SourceData};
use serde::Serialize;

/// One placed cell of the text grid.
#[derive(Debug, Clone, Default)]
struct GridCell {
    text: String,
    numeric: bool,
}

/// Lays the view out on a dense grid. Spanned cells put their text in the
/// top-left slot and leave the slots they cover blank.
fn place_cells(view: &PivotView) -> Vec<Vec<GridCell>> {
    let rows = view.row_count();
    let cols = view.col_count;
    let mut grid = vec![vec![GridCell::default(); cols]; rows];
    let mut occupied = vec![vec![false; cols]; rows];

    for (r, cells) in view.grid_rows().into_iter().enumerate() {
        let mut c = 0;
        for cell in cells {
            while c < cols && occupied[r][c] {
                c += 1;
            }
            if c >= cols {
                log::warn!("row {} has more cells than the grid has columns", r);
                break;
            }

            grid[r][c] = GridCell {
                text: cell.text().to_string(),
                numeric: is_numeric(cell),
            };

            let row_end = (r + cell.row_span.max(1) as usize).min(rows);
            let col_end = (c + cell.col_span.max(1) as usize).min(cols);
            for row in occupied.iter_mut().take(row_end).skip(r) {
                for slot in row.iter_mut().take(col_end).skip(c) {
                    *slot = true;
                }
            }
            c = col_end;
        }
    }

    grid
}

fn is_numeric(cell: &PivotViewCell) -> bool {
    matches!(
        cell.cell_type,
        PivotCellType::Data
            | PivotCellType::RowTotal
            | PivotCellType::ColumnTotal
            | PivotCellType::GrandTotal
    )
}

fn compute_widths(grid: &[Vec<GridCell>], cols: usize) -> Vec<usize> {
    (0..cols)
        .map(|c| {
            grid.iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.text.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn format_row(cells: &[GridCell], widths: &[usize]) -> String {
    let mut out = String::new();
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        let padding = width.saturating_sub(cell.text.chars().count());
        out.push(' ');
        if cell.numeric {
            out.push_str(&" ".repeat(padding));
            out.push_str(&cell.text);
        } else {
            out.push_str(&cell.text);
            out.push_str(&" ".repeat(padding));
        }
        out.push_str(" |");
    }
    out
}

fn format_separator(widths: &[usize]) -> String {
    let mut out = String::new();
    out.push('|');
    for width in widths {
        out.push(' ');
        out.push_str(&"-".repeat(*width));
        out.push_str(" |");
    }
    out
}

/// Renders the view as an aligned text table, with separators under the
/// header and above the footer.
pub fn render_text(view: &PivotView) -> String {
    let grid = place_cells(view);
    let widths = compute_widths(&grid, view.col_count);
    let header_rows = view.header_rows.len();
    let body_end = header_rows + view.body_rows.len();

    let mut lines = Vec::with_capacity(grid.len() + 2);
    for (index, row) in grid.iter().enumerate() {
        if index == header_rows || (index == body_end && view.footer.is_some()) {
            lines.push(format_separator(&widths));
        }
        lines.push(format_row(row, &widths));
    }
    lines.join("\n")
}

pub fn render_json(view: &PivotView) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(view)
}

// ============================================================================
// FIELD LISTING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Numeric,
    Dimension,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub kind: FieldKind,
}

/// Classifies every field of the source, in field order.
pub fn describe_fields(data: &SourceData) -> Vec<FieldInfo> {
    data.fields()
        .iter()
        .enumerate()
        .map(|(index, name)| FieldInfo {
            name: name.clone(),
            kind: if data.is_numeric_field(index) {
                FieldKind::Numeric
            } else {
                FieldKind::Dimension
            },
        })
        .collect()
}

pub fn render_fields(data: &SourceData) -> String {
    let fields = describe_fields(data);
    let name_width = fields
        .iter()
        .map(|f| f.name.chars().count())
        .chain(std::iter::once("FIELD".len()))
        .max()
        .unwrap_or(0);

    let mut lines = vec![format!("{:<width$}  KIND", "FIELD", width = name_width)];
    for field in &fields {
        let kind = match field.kind {
            FieldKind::Numeric => "numeric",
            FieldKind::Dimension => "dimension",
        };
        lines.push(format!("{:<width$}  {}", field.name, kind, width = name_width));
    }
    lines.push(format!("records: {}", data.record_count()));
    lines.join("\n")
}

pub fn render_fields_json(data: &SourceData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&describe_fields(data))
}
