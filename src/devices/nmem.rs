use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::{Cell, Layer, Port};

/// A write heater crossing the wide branch of a memory loop.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmemHeater {
    pub width: f64,
    /// How far the heater reaches past each side of the branch.
    pub overhang: f64,
}

impl Default for NmemHeater {
    fn default() -> Self {
        Self {
            width: 0.3,
            overhang: 1.0,
        }
    }
}

/// Parameters of a superconducting loop memory cell.
///
/// The loop is two vertical branches of different widths joined by
/// horizontal busbars. All dimensions are in microns.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NmemParams {
    pub left_w: f64,
    pub right_w: f64,
    /// Height of the branches between the busbars.
    pub loop_h: f64,
    /// Center-to-center spacing of the branches.
    pub loop_w: f64,
    pub bus_w: f64,
    pub lead_w: f64,
    pub heater: Option<NmemHeater>,
}

impl Default for NmemParams {
    fn default() -> Self {
        Self {
            left_w: 0.1,
            right_w: 0.3,
            loop_h: 3.0,
            loop_w: 2.0,
            bus_w: 0.5,
            lead_w: 1.0,
            heater: Some(NmemHeater::default()),
        }
    }
}

impl NmemParams {
    pub fn validate(&self) -> LayoutResult<()> {
        ensure_positive(&[
            ("left_w", self.left_w),
            ("right_w", self.right_w),
            ("loop_h", self.loop_h),
            ("loop_w", self.loop_w),
            ("bus_w", self.bus_w),
            ("lead_w", self.lead_w),
        ])?;
        ensure(self.left_w != self.right_w, || {
            "memory loop branches must differ in width".to_string()
        })?;
        ensure((self.left_w + self.right_w) / 2.0 < self.loop_w, || {
            format!(
                "branches of width {} and {} touch at spacing {}",
                self.left_w, self.right_w, self.loop_w
            )
        })?;
        if let Some(heater) = self.heater {
            ensure_positive(&[("heater.width", heater.width), ("heater.overhang", heater.overhang)])?;
            ensure(heater.width < self.loop_h, || {
                format!(
                    "heater ({} um) is wider than the loop is tall ({} um)",
                    heater.width, self.loop_h
                )
            })?;
            ensure(heater.overhang < self.loop_w - self.wide_w() / 2.0, || {
                format!(
                    "heater overhang ({}) reaches the other branch",
                    heater.overhang
                )
            })?;
        }
        Ok(())
    }

    fn wide_w(&self) -> f64 {
        self.left_w.max(self.right_w)
    }
}

/// Draws a memory loop centered at the origin.
///
/// Ports: `t` (top lead, north), `b` (bottom lead, south) and, with a
/// heater, `h1` (west) and `h2` (east) on `heater_layer`.
pub fn nmem(params: &NmemParams, layer: Layer, heater_layer: Layer) -> LayoutResult<Cell> {
    params.validate()?;
    let NmemParams {
        left_w,
        right_w,
        loop_h,
        loop_w,
        bus_w,
        lead_w,
        heater,
    } = *params;
    let (xl, xr) = (-loop_w / 2.0, loop_w / 2.0);
    let hh = loop_h / 2.0;

    let mut cell = Cell::new("nmem");
    cell.add_rect(
        layer,
        Rect::new(Point::new(xl - left_w / 2.0, -hh), Point::new(xl + left_w / 2.0, hh)),
    );
    cell.add_rect(
        layer,
        Rect::new(Point::new(xr - right_w / 2.0, -hh), Point::new(xr + right_w / 2.0, hh)),
    );

    let bus_l = xl - left_w / 2.0;
    let bus_r = xr + right_w / 2.0;
    cell.add_rect(
        layer,
        Rect::new(Point::new(bus_l, hh), Point::new(bus_r, hh + bus_w)),
    );
    cell.add_rect(
        layer,
        Rect::new(Point::new(bus_l, -hh - bus_w), Point::new(bus_r, -hh)),
    );

    // Leads leave the middle of each busbar.
    let top = hh + bus_w + lead_w;
    cell.add_rect(
        layer,
        Rect::new(Point::new(-lead_w / 2.0, hh + bus_w), Point::new(lead_w / 2.0, top)),
    );
    cell.add_rect(
        layer,
        Rect::new(Point::new(-lead_w / 2.0, -top), Point::new(lead_w / 2.0, -hh - bus_w)),
    );
    cell.add_port(Port::new("t", Point::new(0.0, top), lead_w, 90.0, layer))?;
    cell.add_port(Port::new("b", Point::new(0.0, -top), lead_w, 270.0, layer))?;

    if let Some(NmemHeater { width, overhang }) = heater {
        let (x, w) = if right_w > left_w {
            (xr, right_w)
        } else {
            (xl, left_w)
        };
        let x0 = x - w / 2.0 - overhang;
        let x1 = x + w / 2.0 + overhang;
        cell.add_rect(
            heater_layer,
            Rect::new(Point::new(x0, -width / 2.0), Point::new(x1, width / 2.0)),
        );
        cell.add_port(Port::new("h1", Point::new(x0, 0.0), width, 180.0, heater_layer))?;
        cell.add_port(Port::new("h2", Point::new(x1, 0.0), width, 0.0, heater_layer))?;
    }
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::layout::LayoutError;

    const DEV: Layer = Layer::new(1, 0);
    const HEAT: Layer = Layer::new(3, 0);

    #[test]
    fn loop_encloses_a_hole() -> LayoutResult<()> {
        let cell = nmem(&NmemParams::default(), DEV, HEAT)?;
        let metal = cell.region(DEV);
        assert_eq!(metal.num_holes(), 1);
        let t = cell.port("t")?;
        let b = cell.port("b")?;
        assert_relative_eq!(t.center.y, 1.5 + 0.5 + 1.0);
        assert_relative_eq!(b.center.y, -t.center.y);
        Ok(())
    }

    #[test]
    fn heater_crosses_wide_branch() -> LayoutResult<()> {
        let params = NmemParams::default();
        let cell = nmem(&params, DEV, HEAT)?;
        let heater = cell.region(HEAT);
        let bbox = heater.bbox().unwrap();
        assert_relative_eq!(bbox.center().x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.width(), 0.3 + 2.0, epsilon = 1e-6);
        assert_eq!(cell.port("h1")?.layer, HEAT);
        Ok(())
    }

    #[test]
    fn no_heater() -> LayoutResult<()> {
        let params = NmemParams {
            heater: None,
            ..Default::default()
        };
        let cell = nmem(&params, DEV, HEAT)?;
        assert!(!cell.has_port("h1"));
        assert!(!cell.layers().contains(&HEAT));
        Ok(())
    }

    #[test]
    fn rejects_symmetric_loop() {
        let params = NmemParams {
            left_w: 0.3,
            ..Default::default()
        };
        assert!(matches!(
            nmem(&params, DEV, HEAT),
            Err(LayoutError::InvalidParams(_))
        ));
        let params = NmemParams {
            heater: Some(NmemHeater {
                overhang: 5.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(nmem(&params, DEV, HEAT).is_err());
    }
}
