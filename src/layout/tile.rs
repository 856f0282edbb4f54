use std::sync::Arc;

use arcstr::ArcStr;
use grid::Grid;
use serde::{Deserialize, Serialize};

use super::cell::{Cell, Instance};
use crate::geometry::Point;

/// Where a cell sits inside its grid slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Align {
    Center,
    LowerLeft,
}

/// Arranges cells into rows and columns.
///
/// Row 0 is the top row. Each column is as wide as its widest cell and each
/// row as tall as its tallest cell, with `spacing` between slots. Empty
/// slots and empty cells keep their place but draw nothing.
pub fn grid_layout(
    name: impl Into<ArcStr>,
    cells: &Grid<Option<Arc<Cell>>>,
    spacing: (f64, f64),
    align: Align,
) -> Cell {
    let (rows, cols) = cells.size();
    let mut top = Cell::new(name);
    let size_at = |r: usize, c: usize| -> (f64, f64) {
        match cells.get(r, c) {
            Some(Some(cell)) => cell.size(),
            _ => (0.0, 0.0),
        }
    };

    let col_widths: Vec<f64> = (0..cols)
        .map(|c| (0..rows).map(|r| size_at(r, c).0).fold(0.0, f64::max))
        .collect();
    let row_heights: Vec<f64> = (0..rows)
        .map(|r| (0..cols).map(|c| size_at(r, c).1).fold(0.0, f64::max))
        .collect();

    let mut y = 0.0;
    for r in 0..rows {
        y -= row_heights[r];
        let mut x = 0.0;
        for c in 0..cols {
            if let Some(Some(cell)) = cells.get(r, c) {
                if let Some(bbox) = cell.bbox() {
                    let target = match align {
                        Align::Center => Point::new(
                            x + col_widths[c] / 2.0 - bbox.width() / 2.0,
                            y + row_heights[r] / 2.0 - bbox.height() / 2.0,
                        ),
                        Align::LowerLeft => Point::new(x, y),
                    };
                    top.add_instance(Instance::new(
                        arcstr::format!("tile_{r}_{c}"),
                        Arc::clone(cell),
                    ))
                    .translate(target - bbox.p0);
                }
            }
            x += col_widths[c] + spacing.0;
        }
        y -= spacing.1;
    }
    top
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use grid::grid;

    use super::*;
    use crate::geometry::Rect;
    use crate::layout::layers::Layer;

    fn block(w: f64, h: f64) -> Option<Arc<Cell>> {
        let mut cell = Cell::new(format!("block_{w}x{h}"));
        cell.add_rect(Layer::new(1, 0), Rect::from_size(w, h));
        Some(cell.finish())
    }

    #[test]
    fn slots_follow_largest_cells() {
        let cells = grid![[block(2.0, 1.0), block(4.0, 4.0)][None, block(1.0, 1.0)]];
        let top = grid_layout("tiles", &cells, (1.0, 2.0), Align::LowerLeft);
        assert_eq!(top.insts().len(), 3);
        let bbox = top.bbox().unwrap();
        assert_relative_eq!(bbox.width(), 2.0 + 1.0 + 4.0);
        assert_relative_eq!(bbox.height(), 4.0 + 2.0 + 1.0);
        assert_relative_eq!(bbox.top(), 0.0);
    }

    #[test]
    fn centered_alignment() {
        let cells = grid![[block(2.0, 2.0)][block(4.0, 4.0)]];
        let top = grid_layout("centered", &cells, (0.0, 0.0), Align::Center);
        let small = top.insts()[0].bbox().unwrap();
        assert_relative_eq!(small.center().x, 2.0);
        assert_relative_eq!(small.center().y, -1.0);
    }
}
