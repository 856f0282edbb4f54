use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Polygon, Rect, Region};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::{Cell, Instance, Layer, Port};
use crate::shapes::hyper_taper;

/// The profile of the gate as it narrows into the choke.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChokeShape {
    /// A straight taper ending in a sharp point.
    #[default]
    Sharp,
    /// A hyperbolic-cosine taper.
    Smooth,
}

/// Parameters of a three-terminal nanocryotron.
///
/// All dimensions are in microns.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NtronParams {
    /// Width of the gate where it meets the channel.
    pub choke_w: f64,
    /// Length of the gate taper.
    pub choke_l: f64,
    /// Width of the gate at its port.
    pub gate_w: f64,
    pub channel_w: f64,
    pub channel_l: f64,
    pub source_w: f64,
    pub drain_w: f64,
    /// Length of the source and drain tapers.
    pub taper_l: f64,
    /// Offset of the choke from the middle of the channel, toward the drain.
    pub choke_shift: f64,
    pub choke: ChokeShape,
}

impl Default for NtronParams {
    fn default() -> Self {
        Self {
            choke_w: 0.03,
            choke_l: 0.5,
            gate_w: 0.2,
            channel_w: 0.1,
            channel_l: 1.0,
            source_w: 0.3,
            drain_w: 0.3,
            taper_l: 0.5,
            choke_shift: 0.0,
            choke: ChokeShape::Sharp,
        }
    }
}

impl NtronParams {
    pub fn validate(&self) -> LayoutResult<()> {
        ensure_positive(&[
            ("choke_w", self.choke_w),
            ("choke_l", self.choke_l),
            ("gate_w", self.gate_w),
            ("channel_w", self.channel_w),
            ("channel_l", self.channel_l),
            ("source_w", self.source_w),
            ("drain_w", self.drain_w),
            ("taper_l", self.taper_l),
        ])?;
        ensure(self.choke_w < self.gate_w, || {
            format!(
                "choke width ({}) must be narrower than the gate ({})",
                self.choke_w, self.gate_w
            )
        })?;
        ensure(self.choke_w < self.channel_w, || {
            format!(
                "choke width ({}) must be narrower than the channel ({})",
                self.choke_w, self.channel_w
            )
        })?;
        ensure(
            self.choke_shift.abs() + self.choke_w / 2.0 <= self.channel_l / 2.0,
            || {
                format!(
                    "choke shifted by {} does not meet the channel of length {}",
                    self.choke_shift, self.channel_l
                )
            },
        )
    }
}

/// Draws an nTron with the channel running vertically through the origin.
///
/// Ports: `g` (gate, west), `s` (source, south) and `d` (drain, north).
pub fn ntron(params: &NtronParams, layer: Layer) -> LayoutResult<Cell> {
    params.validate()?;
    let NtronParams {
        choke_w,
        choke_l,
        gate_w,
        channel_w,
        channel_l,
        source_w,
        drain_w,
        taper_l,
        choke_shift,
        choke,
    } = *params;
    let (hw, hl) = (channel_w / 2.0, channel_l / 2.0);

    let channel = Region::from_rect(&Rect::new(Point::new(-hw, -hl), Point::new(hw, hl)));
    let drain = Polygon::new(vec![
        Point::new(-hw, hl),
        Point::new(hw, hl),
        Point::new(drain_w / 2.0, hl + taper_l),
        Point::new(-drain_w / 2.0, hl + taper_l),
    ]);
    let source = Polygon::new(vec![
        Point::new(-hw, -hl),
        Point::new(-source_w / 2.0, -hl - taper_l),
        Point::new(source_w / 2.0, -hl - taper_l),
        Point::new(hw, -hl),
    ]);

    // A stub of choke width reaching into the channel keeps the union connected.
    let stub = Region::from_rect(&Rect::new(
        Point::new(-hw, choke_shift - choke_w / 2.0),
        Point::new(0.0, choke_shift + choke_w / 2.0),
    ));
    let gate_x = -hw - choke_l;
    let gate = match choke {
        ChokeShape::Sharp => Region::from_polygon(&Polygon::new(vec![
            Point::new(-hw, choke_shift - choke_w / 2.0),
            Point::new(-hw, choke_shift + choke_w / 2.0),
            Point::new(gate_x, choke_shift + gate_w / 2.0),
            Point::new(gate_x, choke_shift - gate_w / 2.0),
        ])),
        ChokeShape::Smooth => {
            let taper = hyper_taper(choke_l, gate_w, choke_w, layer)?.finish();
            let mut tmp = Cell::new("choke");
            let edge = Port::new("edge", Point::new(-hw, choke_shift), choke_w, 180.0, layer);
            tmp.add_instance(Instance::new("taper", taper))
                .connect("1", &edge)?;
            tmp.region(layer)
        }
    };

    let region = channel
        .union(&Region::from_polygon(&drain))
        .union(&Region::from_polygon(&source))
        .union(&stub)
        .union(&gate);

    let mut cell = Cell::new("ntron");
    cell.add_region(layer, &region);
    cell.add_port(Port::new(
        "g",
        Point::new(gate_x, choke_shift),
        gate_w,
        180.0,
        layer,
    ))?;
    cell.add_port(Port::new(
        "s",
        Point::new(0.0, -hl - taper_l),
        source_w,
        270.0,
        layer,
    ))?;
    cell.add_port(Port::new(
        "d",
        Point::new(0.0, hl + taper_l),
        drain_w,
        90.0,
        layer,
    ))?;
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::layout::LayoutError;

    const L: Layer = Layer::new(1, 0);

    #[test]
    fn default_ntron_ports() -> LayoutResult<()> {
        let params = NtronParams::default();
        let cell = ntron(&params, L)?;
        let g = cell.port("g")?;
        assert_relative_eq!(g.center.x, -0.55, epsilon = 1e-12);
        assert_eq!(g.orientation, 180.0);
        assert_relative_eq!(cell.port("d")?.center.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(cell.port("s")?.center.y, -1.0, epsilon = 1e-12);

        let bbox = cell.bbox().unwrap();
        assert_relative_eq!(bbox.left(), -0.55, epsilon = 1e-6);
        assert_relative_eq!(bbox.height(), 2.0, epsilon = 1e-6);
        // Channel, tapers and gate merge into one polygon.
        assert_eq!(cell.elems().len(), 1);
        Ok(())
    }

    #[test]
    fn smooth_choke() -> LayoutResult<()> {
        let params = NtronParams {
            choke: ChokeShape::Smooth,
            choke_shift: 0.2,
            ..Default::default()
        };
        let cell = ntron(&params, L)?;
        assert_eq!(cell.elems().len(), 1);
        let bbox = cell.bbox().unwrap();
        assert_relative_eq!(bbox.left(), -0.55, epsilon = 1e-6);
        assert_relative_eq!(cell.port("g")?.center.y, 0.2);
        // The smooth gate is slimmer than the straight one.
        let sharp = ntron(&NtronParams { choke_shift: 0.2, ..Default::default() }, L)?;
        assert!(cell.region(L).area() < sharp.region(L).area());
        Ok(())
    }

    #[test]
    fn rejects_wide_choke() {
        let params = NtronParams {
            choke_w: 0.3,
            ..Default::default()
        };
        assert!(matches!(ntron(&params, L), Err(LayoutError::InvalidParams(_))));
        let params = NtronParams {
            choke_shift: 0.6,
            ..Default::default()
        };
        assert!(ntron(&params, L).is_err());
    }
}
