//! Quick SVG previews of layouts.

use std::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;

use super::cell::Cell;
use super::error::{LayoutError, LayoutResult};
use super::layers::Layer;
use crate::geometry::Point;

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

fn plot_err(e: impl std::fmt::Display) -> LayoutError {
    LayoutError::Plot(e.to_string())
}

/// Renders a flattened preview of `cell` to an SVG file `width` pixels wide.
///
/// Each layer gets its own translucent color.
pub fn write_svg(cell: &Cell, path: impl AsRef<Path>, width: u32) -> LayoutResult<()> {
    let bbox = cell
        .bbox()
        .ok_or_else(|| LayoutError::EmptyCell(cell.name().clone()))?;
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let margin = 0.02 * bbox.width().max(bbox.height());
    let view = bbox.expand(margin);
    let scale = width.max(1) as f64 / view.width();
    let height = ((view.height() * scale).ceil() as u32).max(1);
    let to_px = |p: &Point| -> (i32, i32) {
        (
            ((p.x - view.left()) * scale).round() as i32,
            ((view.top() - p.y) * scale).round() as i32,
        )
    };

    let flat = cell.flatten();
    let mut colors: BTreeMap<Layer, RGBColor> = BTreeMap::new();
    for (i, layer) in cell.layers().into_iter().enumerate() {
        colors.insert(layer, PALETTE[i % PALETTE.len()]);
    }

    let root = SVGBackend::new(path, (width.max(1), height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    for elem in flat.elems() {
        let color = colors.get(&elem.layer).copied().unwrap_or(BLACK);
        let pts: Vec<(i32, i32)> = elem.inner.points.iter().map(to_px).collect();
        root.draw(&Polygon::new(pts, color.mix(0.5).filled()))
            .map_err(plot_err)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn renders_svg() -> LayoutResult<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("preview.svg");
        let mut cell = Cell::new("preview");
        cell.add_rect(Layer::new(1, 0), Rect::from_size(10.0, 5.0));
        cell.add_rect(Layer::new(2, 0), Rect::from_size(2.0, 2.0));
        write_svg(&cell, &path, 400)?;
        let svg = std::fs::read_to_string(&path)?;
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polygon"));
        Ok(())
    }

    #[test]
    fn empty_cells_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let res = write_svg(&Cell::new("nothing"), dir.path().join("x.svg"), 100);
        assert!(matches!(res, Err(LayoutError::EmptyCell(_))));
    }
}
