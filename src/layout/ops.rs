//! Whole-cell geometry recipes built on [`Region`] booleans.

use arcstr::ArcStr;

use super::cell::Cell;
use super::error::{ensure_positive, LayoutError, LayoutResult};
use super::layers::Layer;
use super::port::Port;
use crate::geometry::{BooleanOp, Polygon, Region};

/// The merged geometry of `cell` on every layer.
fn all_layers(cell: &Cell) -> Region {
    let flat = cell.flatten();
    Region::from_polygons(flat.elems().iter().map(|e| &e.inner))
}

/// Combines all geometry of `a` and `b` with `op`, drawing the result on `layer`.
pub fn boolean(a: &Cell, b: &Cell, op: BooleanOp, layer: Layer) -> Cell {
    let region = all_layers(a).boolean(&all_layers(b), op);
    let mut cell = Cell::new(arcstr::format!("{}_{:?}_{}", a.name(), op, b.name()).to_lowercase());
    cell.add_region(layer, &region);
    cell
}

/// Merges all geometry of `cell` onto `layer`, keeping its ports.
pub fn union_all(cell: &Cell, layer: Layer) -> LayoutResult<Cell> {
    let mut out = Cell::new(cell.name().clone());
    out.add_region(layer, &all_layers(cell));
    for port in cell.ports() {
        out.add_port(Port {
            layer,
            ..port.clone()
        })?;
    }
    Ok(out)
}

/// The rectangle that trims an outline open in front of `port`.
fn port_trim(port: &Port, distance: f64) -> Polygon {
    let (a, b) = port.endpoints();
    let out = port.normal() * (distance * 1.01);
    // Nudge inward so the trim fully clears the outline edge.
    let inward = port.normal() * (-distance * 0.01);
    Polygon::new(vec![a + inward, b + inward, b + out, a + out])
}

/// A band of width `distance` around all geometry in `cell`.
///
/// This is the isolation trench used for positive-tone patterning: only the
/// outline is exposed, so the film inside it remains. The outline is left
/// open in front of every port named in `open_ports`, so that wires can
/// continue out of the device.
pub fn outline(
    cell: &Cell,
    distance: f64,
    layer: Layer,
    open_ports: &[ArcStr],
) -> LayoutResult<Cell> {
    ensure_positive(&[("distance", distance)])?;
    let shape = all_layers(cell);
    if shape.is_empty() {
        return Err(LayoutError::EmptyCell(cell.name().clone()));
    }
    let mut band = shape.offset(distance).difference(&shape);
    for name in open_ports {
        let port = cell.port(name)?;
        band = band.difference(&Region::from_polygon(&port_trim(port, distance)));
    }
    let mut out = Cell::new(arcstr::format!("{}_outline", cell.name()));
    out.add_region(layer, &band);
    for port in cell.ports() {
        out.add_port(port.clone())?;
    }
    Ok(out)
}

/// The bounding box of `cell` grown by `border`, minus all its geometry.
pub fn invert(cell: &Cell, border: f64, layer: Layer) -> LayoutResult<Cell> {
    let bbox = cell
        .bbox()
        .ok_or_else(|| LayoutError::EmptyCell(cell.name().clone()))?;
    let window = Region::from_rect(&bbox.expand(border));
    let mut out = Cell::new(arcstr::format!("{}_inverted", cell.name()));
    out.add_region(layer, &window.difference(&all_layers(cell)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{Point, Rect};

    fn bar() -> Cell {
        let mut cell = Cell::new("bar");
        cell.add_rect(Layer::new(1, 0), Rect::from_size(10.0, 2.0));
        cell.add_port(Port::new("w", Point::new(0.0, 1.0), 2.0, 180.0, Layer::new(1, 0)))
            .unwrap();
        cell.add_port(Port::new("e", Point::new(10.0, 1.0), 2.0, 0.0, Layer::new(1, 0)))
            .unwrap();
        cell
    }

    #[test]
    fn outline_surrounds_shape() {
        let out = outline(&bar(), 1.0, Layer::new(1, 0), &[]).unwrap();
        let region = out.region(Layer::new(1, 0));
        let bbox = region.bbox().unwrap();
        assert_relative_eq!(bbox.width(), 12.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.height(), 4.0, epsilon = 1e-6);
        // The band never overlaps the bar itself.
        let overlap = region.intersection(&Region::from_rect(&Rect::from_size(10.0, 2.0)));
        assert!(overlap.area() < 1e-6);
        assert_eq!(out.ports().len(), 2);
    }

    #[test]
    fn open_ports_cut_the_outline() {
        let closed = outline(&bar(), 1.0, Layer::new(1, 0), &[]).unwrap();
        let open = outline(&bar(), 1.0, Layer::new(1, 0), &["e".into(), "w".into()]).unwrap();
        let closed_area = closed.region(Layer::new(1, 0)).area();
        let open_area = open.region(Layer::new(1, 0)).area();
        assert_relative_eq!(closed_area - open_area, 4.0, epsilon = 1e-3);
        assert!(outline(&bar(), 1.0, Layer::new(1, 0), &["x".into()]).is_err());
    }

    #[test]
    fn invert_leaves_frame() {
        let inv = invert(&bar(), 1.0, Layer::new(2, 0)).unwrap();
        assert_relative_eq!(inv.region(Layer::new(2, 0)).area(), 48.0 - 20.0, epsilon = 1e-6);
        assert!(invert(&Cell::new("empty"), 1.0, Layer::new(2, 0)).is_err());
    }

    #[test]
    fn boolean_difference() {
        let mut hole = Cell::new("hole");
        hole.add_rect(Layer::new(1, 0), Rect::from_center(Point::new(5.0, 1.0), 2.0, 10.0));
        let cut = boolean(&bar(), &hole, BooleanOp::Difference, Layer::new(3, 0));
        assert_relative_eq!(cut.region(Layer::new(3, 0)).area(), 16.0, epsilon = 1e-6);
        let merged = union_all(&bar(), Layer::new(3, 0)).unwrap();
        assert_eq!(merged.ports().len(), 2);
        assert_eq!(merged.ports()[0].layer, Layer::new(3, 0));
    }
}
