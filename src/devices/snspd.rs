use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Region};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::{Cell, Instance, Layer, Port};
use crate::shapes::hyper_taper;

/// Parameters of a meandered superconducting nanowire single-photon detector.
///
/// All dimensions are in microns.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnspdParams {
    pub wire_width: f64,
    /// Center-to-center spacing of adjacent meander rows.
    pub wire_pitch: f64,
    /// Width and height of the area the meander rows fill.
    pub size: (f64, f64),
    /// If set, the meander width is chosen to give this many squares for
    /// the height in `size`.
    pub num_squares: Option<f64>,
    /// Width of each turn as a multiple of `wire_width`.
    pub turn_ratio: f64,
    /// Put both terminals on the west side instead of opposite sides.
    pub terminals_same_side: bool,
}

impl Default for SnspdParams {
    fn default() -> Self {
        Self {
            wire_width: 0.1,
            wire_pitch: 0.5,
            size: (6.0, 6.0),
            num_squares: None,
            turn_ratio: 2.0,
            terminals_same_side: false,
        }
    }
}

/// The meander dimensions derived from [`SnspdParams`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Meander {
    /// Length of each row between the turns.
    pub row_length: f64,
    pub rows: usize,
    pub turn_w: f64,
}

impl SnspdParams {
    /// Works out the row length and the number of rows.
    ///
    /// The row count is reduced by one if needed so the terminals land on
    /// the requested sides.
    pub fn meander(&self) -> LayoutResult<Meander> {
        let (width, height) = self.size;
        ensure_positive(&[
            ("wire_width", self.wire_width),
            ("wire_pitch", self.wire_pitch),
            ("height", height),
            ("turn_ratio", self.turn_ratio),
        ])?;
        ensure(self.wire_pitch > self.wire_width, || {
            format!(
                "wire pitch ({}) must exceed the wire width ({})",
                self.wire_pitch, self.wire_width
            )
        })?;
        ensure(self.turn_ratio >= 1.0, || {
            format!("turn ratio must be at least 1, got {}", self.turn_ratio)
        })?;

        let mut rows = (height / self.wire_pitch).floor() as usize;
        let same_side_parity = rows % 2 == 0;
        if same_side_parity != self.terminals_same_side {
            rows = rows.saturating_sub(1);
        }
        let min_rows = if self.terminals_same_side { 2 } else { 3 };
        ensure(rows >= min_rows, || {
            format!(
                "a {height} um tall meander at pitch {} fits only {rows} rows",
                self.wire_pitch
            )
        })?;

        let row_length = match self.num_squares {
            Some(squares) => {
                ensure_positive(&[("num_squares", squares)])?;
                squares * self.wire_width * self.wire_pitch / height
            }
            None => {
                ensure_positive(&[("width", width)])?;
                width
            }
        };
        Ok(Meander {
            row_length,
            rows,
            turn_w: self.turn_ratio * self.wire_width,
        })
    }

    /// The approximate number of squares along the wire.
    ///
    /// Each turn is counted as a bar of length `wire_pitch` and width
    /// `turn_w`; the terminal stubs are counted as wire.
    pub fn num_squares(&self) -> LayoutResult<f64> {
        let m = self.meander()?;
        let wire = m.rows as f64 * m.row_length + 2.0 * m.turn_w;
        let turns = (m.rows - 1) as f64 * self.wire_pitch / m.turn_w;
        Ok(wire / self.wire_width + turns)
    }
}

/// Draws a horizontal meander centered at the origin.
///
/// Rows run along x and stack upward from port `1`, which faces west at the
/// bottom row. Port `2` is on the top row, facing east, or west when
/// `terminals_same_side` is set.
pub fn snspd(params: &SnspdParams, layer: Layer) -> LayoutResult<Cell> {
    let Meander {
        row_length,
        rows,
        turn_w,
    } = params.meander()?;
    let w = params.wire_width;
    let pitch = params.wire_pitch;
    let half = w / 2.0;

    let mut region = Region::new();
    for i in 0..rows {
        let y = i as f64 * pitch;
        let mut x0 = 0.0;
        let mut x1 = row_length;
        if i == 0 {
            x0 = -turn_w;
        }
        if i == rows - 1 {
            if rows % 2 == 1 {
                x1 = row_length + turn_w;
            } else {
                x0 = -turn_w;
            }
        }
        region = region.union(&Region::from_rect(&Rect::new(
            Point::new(x0, y - half),
            Point::new(x1, y + half),
        )));
        if i + 1 < rows {
            // Even rows turn on the east side, odd rows on the west.
            let (bx0, bx1) = if i % 2 == 0 {
                (row_length, row_length + turn_w)
            } else {
                (-turn_w, 0.0)
            };
            region = region.union(&Region::from_rect(&Rect::new(
                Point::new(bx0, y - half),
                Point::new(bx1, y + pitch + half),
            )));
        }
    }

    let top_y = (rows - 1) as f64 * pitch;
    let center = Point::new(row_length / 2.0, top_y / 2.0);
    let mut cell = Cell::new("snspd");
    cell.add_region(layer, &region);
    cell.add_port(Port::new("1", Point::new(-turn_w, 0.0), w, 180.0, layer))?;
    let port2 = if rows % 2 == 1 {
        Port::new("2", Point::new(row_length + turn_w, top_y), w, 0.0, layer)
    } else {
        Port::new("2", Point::new(-turn_w, top_y), w, 180.0, layer)
    };
    cell.add_port(port2)?;
    cell.translate(-center);
    debug!(
        "snspd: {rows} rows of {row_length:.3} um, {:.0} squares",
        params.num_squares()?
    );
    Ok(cell)
}

/// A meander standing upright, with hyperbolic tapers out to `lead_w`.
///
/// Ports: `1` (south) and `2` (north), both `lead_w` wide.
pub fn snspd_vertical(params: &SnspdParams, lead_w: f64, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("lead_w", lead_w)])?;
    ensure(lead_w >= params.wire_width, || {
        format!(
            "lead width ({lead_w}) is narrower than the wire ({})",
            params.wire_width
        )
    })?;
    let mut params = *params;
    if params.terminals_same_side {
        warn!("vertical SNSPDs need terminals on opposite sides; ignoring `terminals_same_side`");
        params.terminals_same_side = false;
    }

    let meander = snspd(&params, layer)?.finish();
    let taper = hyper_taper(2.0 * lead_w, lead_w, params.wire_width, layer)?.finish();

    let mut cell = Cell::new("snspd_vertical");
    let inst = cell.add_instance(Instance::new("meander", meander));
    inst.rotate(90.0, Point::zero());
    let (p1, p2) = (inst.port("1")?, inst.port("2")?);

    for (name, dest) in [("1", p1), ("2", p2)] {
        let inst = cell.add_instance(Instance::new(format!("lead{name}"), taper.clone()));
        inst.connect("1", &dest)?;
        let port = inst.port("2")?.with_name(name);
        cell.add_port(port)?;
    }
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::layout::LayoutError;

    const L: Layer = Layer::new(1, 0);

    #[test]
    fn row_parity_matches_terminal_sides() -> LayoutResult<()> {
        let opposite = SnspdParams::default().meander()?;
        assert_eq!(opposite.rows, 11);
        let same = SnspdParams {
            terminals_same_side: true,
            ..Default::default()
        }
        .meander()?;
        assert_eq!(same.rows, 12);
        Ok(())
    }

    #[test]
    fn meander_ports_and_extent() -> LayoutResult<()> {
        let cell = snspd(&SnspdParams::default(), L)?;
        let bbox = cell.bbox().unwrap();
        // Rows plus a turn on each side.
        assert_relative_eq!(bbox.width(), 6.0 + 0.4, epsilon = 1e-6);
        assert_relative_eq!(bbox.height(), 10.0 * 0.5 + 0.1, epsilon = 1e-6);
        assert_relative_eq!(bbox.center().x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.center().y, 0.0, epsilon = 1e-6);

        let p1 = cell.port("1")?;
        let p2 = cell.port("2")?;
        assert_eq!(p1.orientation, 180.0);
        assert_eq!(p2.orientation, 0.0);
        assert_relative_eq!(p1.center.x, bbox.left(), epsilon = 1e-6);
        assert_relative_eq!(p2.center.x, bbox.right(), epsilon = 1e-6);
        // The wire is one continuous polygon.
        assert_eq!(cell.elems().len(), 1);
        Ok(())
    }

    #[test]
    fn same_side_terminals() -> LayoutResult<()> {
        let params = SnspdParams {
            terminals_same_side: true,
            ..Default::default()
        };
        let cell = snspd(&params, L)?;
        assert_eq!(cell.port("2")?.orientation, 180.0);
        assert_relative_eq!(cell.port("1")?.center.x, cell.port("2")?.center.x);
        Ok(())
    }

    #[test]
    fn num_squares_sets_width() -> LayoutResult<()> {
        let params = SnspdParams {
            num_squares: Some(1200.0),
            size: (0.0, 6.0),
            ..Default::default()
        };
        let m = params.meander()?;
        assert_relative_eq!(m.row_length, 10.0, epsilon = 1e-6);
        assert!(params.num_squares()? > 1100.0);
        Ok(())
    }

    #[test]
    fn too_short_for_a_meander() {
        let params = SnspdParams {
            size: (6.0, 0.9),
            ..Default::default()
        };
        assert!(matches!(snspd(&params, L), Err(LayoutError::InvalidParams(_))));
    }

    #[test]
    fn vertical_leads() -> LayoutResult<()> {
        let cell = snspd_vertical(&SnspdParams::default(), 2.0, L)?;
        let p1 = cell.port("1")?;
        let p2 = cell.port("2")?;
        assert_eq!(p1.orientation, 270.0);
        assert_eq!(p2.orientation, 90.0);
        assert_relative_eq!(p1.width, 2.0);
        let bbox = cell.bbox().unwrap();
        assert_relative_eq!(p2.center.y, bbox.top(), epsilon = 1e-6);
        assert_relative_eq!(p1.center.y, bbox.bottom(), epsilon = 1e-6);
        Ok(())
    }
}
