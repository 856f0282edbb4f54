use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Region};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::{Cell, Instance, Layer, Port};
use crate::route::path_region;
use crate::shapes::{hyper_taper, taper};

/// How the heater sits relative to the channel.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaterKind {
    /// A heater on the device layer running alongside the channel.
    #[default]
    Planar,
    /// A heater on its own layer crossing over the channel.
    Stacked,
}

/// Parameters of a heater-tron. All dimensions are in microns.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtronParams {
    pub channel_w: f64,
    pub channel_l: f64,
    /// Width the channel and heater leads taper out to.
    pub lead_w: f64,
    pub heater_w: f64,
    /// Length of the stacked heater strip; unused for planar heaters.
    pub heater_l: f64,
    /// Spacing between a planar heater and the channel.
    pub gap: f64,
    pub kind: HeaterKind,
}

impl Default for HtronParams {
    fn default() -> Self {
        Self {
            channel_w: 0.2,
            channel_l: 2.0,
            lead_w: 1.0,
            heater_w: 0.5,
            heater_l: 3.0,
            gap: 0.2,
            kind: HeaterKind::Planar,
        }
    }
}

impl HtronParams {
    pub fn validate(&self) -> LayoutResult<()> {
        ensure_positive(&[
            ("channel_w", self.channel_w),
            ("channel_l", self.channel_l),
            ("lead_w", self.lead_w),
            ("heater_w", self.heater_w),
            ("heater_l", self.heater_l),
            ("gap", self.gap),
        ])?;
        ensure(self.lead_w >= self.channel_w, || {
            format!(
                "lead width ({}) must be at least the channel width ({})",
                self.lead_w, self.channel_w
            )
        })?;
        ensure(self.lead_w >= self.heater_w, || {
            format!(
                "lead width ({}) must be at least the heater width ({})",
                self.lead_w, self.heater_w
            )
        })?;
        if self.kind == HeaterKind::Stacked {
            ensure(self.heater_l > self.channel_w, || {
                format!(
                    "stacked heater ({} um) must be longer than the channel is wide ({} um)",
                    self.heater_l, self.channel_w
                )
            })?;
        }
        Ok(())
    }
}

/// Draws an hTron with a vertical channel centered at the origin.
///
/// Ports: `c1` (channel, south), `c2` (channel, north) and the heater
/// terminals `h1` and `h2`. A stacked heater runs west to east across the
/// channel on `heater_layer`; a planar heater folds around the east side of
/// the channel on `layer`, with both terminals facing east.
pub fn htron(params: &HtronParams, layer: Layer, heater_layer: Layer) -> LayoutResult<Cell> {
    params.validate()?;
    let HtronParams {
        channel_w,
        channel_l,
        lead_w,
        heater_w,
        heater_l,
        gap,
        kind,
    } = *params;
    let (hw, hl) = (channel_w / 2.0, channel_l / 2.0);

    let mut cell = Cell::new("htron");
    cell.add_rect(
        layer,
        Rect::new(Point::new(-hw, -hl), Point::new(hw, hl)),
    );

    let channel_taper = hyper_taper(lead_w, lead_w, channel_w, layer)?.finish();
    let ends = [
        ("c1", Port::new("c1", Point::new(0.0, -hl), channel_w, 270.0, layer)),
        ("c2", Port::new("c2", Point::new(0.0, hl), channel_w, 90.0, layer)),
    ];
    for (name, dest) in ends {
        let inst = cell.add_instance(Instance::new(format!("taper_{name}"), channel_taper.clone()));
        inst.connect("1", &dest)?;
        let port = inst.port("2")?.with_name(name);
        cell.add_port(port)?;
    }

    match kind {
        HeaterKind::Stacked => {
            let half = heater_l / 2.0;
            cell.add_rect(
                heater_layer,
                Rect::new(
                    Point::new(-half, -heater_w / 2.0),
                    Point::new(half, heater_w / 2.0),
                ),
            );
            let heater_taper = taper(lead_w, heater_w, lead_w, heater_layer)?.finish();
            let ends = [
                ("h1", Port::new("h1", Point::new(-half, 0.0), heater_w, 180.0, heater_layer)),
                ("h2", Port::new("h2", Point::new(half, 0.0), heater_w, 0.0, heater_layer)),
            ];
            for (name, dest) in ends {
                let inst =
                    cell.add_instance(Instance::new(format!("taper_{name}"), heater_taper.clone()));
                inst.connect("1", &dest)?;
                let port = inst.port("2")?.with_name(name);
                cell.add_port(port)?;
            }
        }
        HeaterKind::Planar => {
            let x = hw + gap + heater_w / 2.0;
            let y = hl - heater_w / 2.0;
            ensure(2.0 * y > lead_w, || {
                format!("heater leads of width {lead_w} overlap on a {channel_l} um channel")
            })?;
            // Start and end flush with the heater's east edge.
            let x_end = x + heater_w / 2.0;
            let heater = path_region(
                &[
                    Point::new(x_end, -y),
                    Point::new(x, -y),
                    Point::new(x, y),
                    Point::new(x_end, y),
                ],
                heater_w,
                false,
            )?;
            let channel = Region::from_rect(&Rect::new(Point::new(-hw, -hl), Point::new(hw, hl)));
            ensure(heater.intersection(&channel).is_empty(), || {
                "planar heater overlaps the channel".to_string()
            })?;
            cell.add_region(layer, &heater);

            let heater_taper = taper(lead_w, heater_w, lead_w, layer)?.finish();
            for (name, py) in [("h1", -y), ("h2", y)] {
                let dest = Port::new(name, Point::new(x_end, py), heater_w, 0.0, layer);
                let inst =
                    cell.add_instance(Instance::new(format!("taper_{name}"), heater_taper.clone()));
                inst.connect("1", &dest)?;
                let port = inst.port("2")?.with_name(name);
                cell.add_port(port)?;
            }
        }
    }
    Ok(cell)
}
