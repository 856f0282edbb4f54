//! Basic parametric shapes.
//!
//! Each function returns a fresh [`Cell`] with its geometry placed relative
//! to the origin and, where it makes sense, ports for wiring.

use crate::geometry::{Point, Polygon, Rect, Region};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::{Cell, Layer, Port};

pub mod text;

pub use text::text;

/// Sampling pitch along tapers, in microns.
pub const TAPER_STEP: f64 = 0.1;

/// A `width` x `height` rectangle with its lower-left corner at the origin.
pub fn rectangle(width: f64, height: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("width", width), ("height", height)])?;
    let mut cell = Cell::new("rectangle");
    cell.add_rect(layer, Rect::from_size(width, height));
    Ok(cell)
}

/// A rectangle centered at the origin with a port on each side.
///
/// Ports are named `N`, `E`, `S` and `W`.
pub fn compass(width: f64, height: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("width", width), ("height", height)])?;
    let mut cell = Cell::new("compass");
    cell.add_rect(layer, Rect::from_center(Point::zero(), width, height));
    let (hw, hh) = (width / 2.0, height / 2.0);
    cell.add_port(Port::new("N", Point::new(0.0, hh), width, 90.0, layer))?;
    cell.add_port(Port::new("E", Point::new(hw, 0.0), height, 0.0, layer))?;
    cell.add_port(Port::new("S", Point::new(0.0, -hh), width, 270.0, layer))?;
    cell.add_port(Port::new("W", Point::new(-hw, 0.0), height, 180.0, layer))?;
    Ok(cell)
}

/// A linear taper along x from width `w1` at the origin to `w2` at `length`.
///
/// Port `1` faces west and port `2` faces east.
pub fn taper(length: f64, w1: f64, w2: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("length", length), ("w1", w1), ("w2", w2)])?;
    let mut cell = Cell::new("taper");
    cell.add_polygon(
        layer,
        Polygon::new(vec![
            Point::new(0.0, -w1 / 2.0),
            Point::new(length, -w2 / 2.0),
            Point::new(length, w2 / 2.0),
            Point::new(0.0, w1 / 2.0),
        ]),
    );
    cell.add_port(Port::new("1", Point::zero(), w1, 180.0, layer))?;
    cell.add_port(Port::new("2", Point::new(length, 0.0), w2, 0.0, layer))?;
    Ok(cell)
}

/// The sample positions along a taper of `length`.
fn taper_samples(length: f64) -> Vec<f64> {
    let n = ((length / TAPER_STEP).ceil() as usize).max(1);
    (0..=n).map(|i| length * i as f64 / n as f64).collect()
}

/// A hyperbolic-cosine taper from `narrow` at the origin to `wide` at `length`.
///
/// The width at `x` is `narrow * cosh(a * x)` with
/// `a = acosh(wide / narrow) / length`, which spreads current crowding evenly
/// along the taper. Port `1` (narrow) faces west and port `2` (wide) faces
/// east.
pub fn hyper_taper(length: f64, wide: f64, narrow: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("length", length), ("wide", wide), ("narrow", narrow)])?;
    ensure(wide >= narrow, || {
        format!("hyper taper wide end ({wide}) is narrower than its narrow end ({narrow})")
    })?;
    let a = (wide / narrow).acosh() / length;
    let xs = taper_samples(length);
    let top = xs
        .iter()
        .map(|&x| Point::new(x, narrow * (a * x).cosh() / 2.0));
    let bottom = xs
        .iter()
        .rev()
        .map(|&x| Point::new(x, -narrow * (a * x).cosh() / 2.0));

    let mut cell = Cell::new("hyper_taper");
    cell.add_polygon(layer, Polygon::new(top.chain(bottom).collect()));
    cell.add_port(Port::new("1", Point::zero(), narrow, 180.0, layer))?;
    cell.add_port(Port::new("2", Point::new(length, 0.0), wide, 0.0, layer))?;
    Ok(cell)
}

/// A plus-shaped cross of arm `length` and line `width`, centered at the origin.
pub fn cross(length: f64, width: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("length", length), ("width", width)])?;
    ensure(length > width, || {
        format!("cross length ({length}) must exceed its width ({width})")
    })?;
    let region = Region::from_rect(&Rect::from_center(Point::zero(), length, width))
        .union(&Region::from_rect(&Rect::from_center(Point::zero(), width, length)));
    let mut cell = Cell::new("cross");
    cell.add_region(layer, &region);
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::layout::LayoutError;

    const L: Layer = Layer::new(1, 0);

    #[test]
    fn compass_ports() -> LayoutResult<()> {
        let c = compass(4.0, 2.0, L)?;
        assert_eq!(c.port("N")?.center, Point::new(0.0, 1.0));
        assert_eq!(c.port("W")?.width, 2.0);
        assert_eq!(c.port("S")?.orientation, 270.0);
        Ok(())
    }

    #[test]
    fn rejects_non_positive_sizes() {
        assert!(matches!(
            rectangle(0.0, 1.0, L),
            Err(LayoutError::InvalidParams(_))
        ));
        assert!(taper(1.0, -1.0, 1.0, L).is_err());
        assert!(hyper_taper(10.0, 1.0, 2.0, L).is_err());
        assert!(cross(1.0, 2.0, L).is_err());
    }

    #[test]
    fn taper_area() -> LayoutResult<()> {
        let t = taper(10.0, 1.0, 3.0, L)?;
        assert_relative_eq!(t.region(L).area(), 20.0, epsilon = 1e-6);
        assert_eq!(t.port("2")?.center, Point::new(10.0, 0.0));
        Ok(())
    }

    #[test]
    fn hyper_taper_ends() -> LayoutResult<()> {
        let t = hyper_taper(10.0, 20.0, 1.0, L)?;
        let bbox = t.bbox().unwrap();
        assert_relative_eq!(bbox.width(), 10.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.height(), 20.0, epsilon = 1e-6);
        // 101 samples along each edge.
        assert_eq!(t.elems()[0].inner.len(), 202);
        let narrow = t.port("1")?;
        assert_eq!(narrow.width, 1.0);
        assert_eq!(narrow.orientation, 180.0);
        Ok(())
    }

    #[test]
    fn short_tapers_still_have_two_samples() {
        assert_eq!(taper_samples(0.01).len(), 2);
    }

    #[test]
    fn cross_area() -> LayoutResult<()> {
        let c = cross(10.0, 2.0, L)?;
        assert_relative_eq!(c.region(L).area(), 36.0, epsilon = 1e-6);
        Ok(())
    }
}
