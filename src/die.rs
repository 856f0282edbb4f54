//! Die cells: a device surrounded by routed bond pads.

use std::collections::BTreeMap;

use arcstr::ArcStr;
use derive_builder::Builder;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::layout::error::{ensure, ensure_positive, LayoutError, LayoutResult};
use crate::layout::{outline, Cell, Instance, Layer, Layers, Port, Side};
use crate::route::route_quad;
use crate::shapes::text;

/// The number of pads on each side of a die.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PadCounts {
    pub n: usize,
    pub e: usize,
    pub s: usize,
    pub w: usize,
}

impl Default for PadCounts {
    fn default() -> Self {
        Self {
            n: 1,
            e: 1,
            s: 1,
            w: 1,
        }
    }
}

impl PadCounts {
    pub fn get(&self, side: Side) -> usize {
        match side {
            Side::North => self.n,
            Side::East => self.e,
            Side::South => self.s,
            Side::West => self.w,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, derive(Debug))]
#[serde(default)]
pub struct DieParams {
    /// Outer width and height of the die.
    pub size: (f64, f64),
    /// The device area at the center of the die.
    pub device_max_size: (f64, f64),
    /// Pad width along its side and depth into the die.
    pub pad_size: (f64, f64),
    /// Distance from the die edge to the outer edge of the pads.
    pub pad_inset: f64,
    /// Width of the contacts on the edge of the device area.
    pub contact_w: f64,
    pub pads: PadCounts,
    /// Width of the isolation trench in positive tone.
    pub isolation: f64,
    #[builder(setter(into))]
    pub text: String,
    pub text_size: f64,
    /// Also draw the routes on the pad layer.
    pub fill_pad_layer: bool,
    /// Draw isolation trenches around the metal instead of the metal itself.
    pub positive_tone: bool,
}

impl Default for DieParams {
    fn default() -> Self {
        Self {
            size: (10000.0, 10000.0),
            device_max_size: (100.0, 100.0),
            pad_size: (200.0, 200.0),
            pad_inset: 500.0,
            contact_w: 50.0,
            pads: PadCounts::default(),
            isolation: 10.0,
            text: String::new(),
            text_size: 250.0,
            fill_pad_layer: false,
            positive_tone: false,
        }
    }
}

/// The frame of one side of a rectangle centered at the origin.
struct SideFrame {
    normal: Point,
    tangent: Point,
    /// Distance from the center to this side.
    reach: f64,
    /// Length of this side.
    length: f64,
}

impl SideFrame {
    fn new(side: Side, (width, height): (f64, f64)) -> Self {
        let normal = Point::unit(side.orientation());
        match side {
            Side::North | Side::South => Self {
                normal,
                tangent: Point::new(1.0, 0.0),
                reach: height / 2.0,
                length: width,
            },
            Side::East | Side::West => Self {
                normal,
                tangent: Point::new(0.0, 1.0),
                reach: width / 2.0,
                length: height,
            },
        }
    }

    /// The position of slot `i` of `n` evenly spaced along the side.
    fn slot(&self, i: usize, n: usize) -> f64 {
        -self.length / 2.0 + self.length * (i + 1) as f64 / (n + 1) as f64
    }
}

impl DieParams {
    #[inline]
    pub fn builder() -> DieParamsBuilder {
        DieParamsBuilder::default()
    }

    pub fn validate(&self) -> LayoutResult<()> {
        let (w, h) = self.size;
        let (dw, dh) = self.device_max_size;
        let (pw, ph) = self.pad_size;
        ensure_positive(&[
            ("size.0", w),
            ("size.1", h),
            ("device_max_size.0", dw),
            ("device_max_size.1", dh),
            ("pad_size.0", pw),
            ("pad_size.1", ph),
            ("contact_w", self.contact_w),
            ("isolation", self.isolation),
            ("text_size", self.text_size),
        ])?;
        ensure(self.pad_inset >= 0.0, || {
            format!("pad inset must not be negative, got {}", self.pad_inset)
        })?;
        ensure(
            dw / 2.0 < w / 2.0 - self.pad_inset - ph && dh / 2.0 < h / 2.0 - self.pad_inset - ph,
            || {
                format!(
                    "a {dw} x {dh} um device area does not fit inside the pads of a {w} x {h} um die"
                )
            },
        )?;
        for side in Side::ALL {
            let n = self.pads.get(side);
            if n == 0 {
                continue;
            }
            let die = SideFrame::new(side, self.size);
            let area = SideFrame::new(side, self.device_max_size);
            let pitch = die.length / (n + 1) as f64;
            ensure(pitch > pw && pitch - pw / 2.0 > self.pad_inset + ph, || {
                format!("{n} pads of width {pw} do not fit on the {side} side")
            })?;
            ensure(area.length / (n + 1) as f64 >= self.contact_w, || {
                format!(
                    "{n} contacts of width {} do not fit on the {side} side of the device area",
                    self.contact_w
                )
            })?;
        }
        Ok(())
    }

    /// The inner contacts on one side, in ascending order along that side.
    fn contacts(&self, side: Side, layer: Layer) -> Vec<Port> {
        let frame = SideFrame::new(side, self.device_max_size);
        let n = self.pads.get(side);
        (0..n)
            .map(|i| {
                let center = frame.normal * frame.reach + frame.tangent * frame.slot(i, n);
                Port::new(
                    arcstr::format!("{}{}", side.short_form(), i + 1),
                    center,
                    self.contact_w,
                    side.orientation(),
                    layer,
                )
            })
            .collect()
    }

    /// The pad rectangles on one side and the ports on their inner edges.
    fn pads(&self, side: Side, layer: Layer) -> Vec<(Rect, Port)> {
        let frame = SideFrame::new(side, self.size);
        let n = self.pads.get(side);
        let (pw, ph) = self.pad_size;
        let (rw, rh) = match side {
            Side::North | Side::South => (pw, ph),
            Side::East | Side::West => (ph, pw),
        };
        (0..n)
            .map(|i| {
                let along = frame.tangent * frame.slot(i, n);
                let depth = frame.reach - self.pad_inset;
                let center = frame.normal * (depth - ph / 2.0) + along;
                let port = Port::new(
                    arcstr::format!("pad_{}{}", side.short_form(), i + 1),
                    frame.normal * (depth - ph) + along,
                    pw,
                    side.orientation() + 180.0,
                    layer,
                );
                (Rect::from_center(center, rw, rh), port)
            })
            .collect()
    }
}

/// Builds the die frame, pads, routing to the inner contacts and label.
fn die_body(params: &DieParams, layers: &Layers) -> LayoutResult<Cell> {
    params.validate()?;
    let name = if params.text.is_empty() {
        ArcStr::from("die")
    } else {
        arcstr::format!("die_{}", params.text)
    };
    let mut cell = Cell::new(name);
    let (w, h) = params.size;
    cell.add_rect(layers.die, Rect::from_center(Point::zero(), w, h));

    for side in Side::ALL {
        let contacts = params.contacts(side, layers.device);
        let pads = params.pads(side, layers.device);
        for (contact, (pad, pad_port)) in contacts.into_iter().zip(pads) {
            let route = route_quad(&pad_port, &contact, None, None);
            cell.add_rect(layers.device, pad);
            cell.add_rect(layers.pad, pad);
            if params.fill_pad_layer {
                cell.add_polygon(layers.pad, route.clone());
            }
            cell.add_polygon(layers.device, route);
            cell.add_port(contact)?;
        }
    }

    if !params.text.is_empty() {
        let label = text(&params.text, params.text_size, layers.label)?.finish();
        cell.add_instance(Instance::new("label", label))
            .translate(Point::new(
                -w / 2.0 + params.text_size,
                -h / 2.0 + params.text_size,
            ));
    }
    Ok(cell)
}

/// Replaces the device-layer metal of `cell` with its isolation outline.
///
/// The outline is left open in front of each port in `open`.
fn to_positive_tone(
    cell: &Cell,
    params: &DieParams,
    layers: &Layers,
    open: &[Port],
) -> LayoutResult<Cell> {
    let mut flat = cell.flatten();
    let mut metal = Cell::new("metal");
    metal.add_region(layers.device, &flat.region(layers.device));
    for port in open {
        metal.add_port(port.clone())?;
    }
    let names: Vec<ArcStr> = open.iter().map(|p| p.name.clone()).collect();
    let trench = outline(&metal, params.isolation, layers.device, &names)?;
    flat.remove_layer(layers.device);
    flat.add_region(layers.device, &trench.region(layers.device));
    Ok(flat)
}

/// A die with pads routed to inner contacts, but no device.
///
/// The contacts are exposed as ports `N1..Nn`, `E1..`, `S1..` and `W1..`,
/// numbered left to right on the north and south sides and bottom to top
/// on the east and west sides. In positive tone the outline is left open at
/// every contact, toward the device area.
pub fn die_cell(params: &DieParams, layers: &Layers) -> LayoutResult<Cell> {
    let body = die_body(params, layers)?;
    if params.positive_tone {
        let open: Vec<Port> = body.ports().iter().map(Port::flipped).collect();
        to_positive_tone(&body, params, layers, &open)
    } else {
        Ok(body)
    }
}

/// Sorts ports by their position along the side they face.
fn along_side(side: Side, port: &Port) -> f64 {
    match side {
        Side::North | Side::South => port.center.x,
        Side::East | Side::West => port.center.y,
    }
}

/// Centers `device` in a die and routes each device port to an inner contact.
///
/// Ports are matched to contacts on the side they face, in order along that
/// side. A side with fewer device ports than contacts uses the middle
/// contacts.
pub fn die_with_device(params: &DieParams, layers: &Layers, device: &Cell) -> LayoutResult<Cell> {
    let bbox = device
        .bbox()
        .ok_or_else(|| LayoutError::EmptyCell(device.name().clone()))?;
    let (max_w, max_h) = params.device_max_size;
    if bbox.width() > max_w || bbox.height() > max_h {
        return Err(LayoutError::DeviceTooLarge {
            name: device.name().clone(),
            width: bbox.width(),
            height: bbox.height(),
            max_width: max_w,
            max_height: max_h,
        });
    }

    let mut cell = die_body(params, layers)?;
    let inst = cell.add_instance(Instance::new("device", device.clone().finish()));
    inst.center_at(Point::zero());
    let inst = inst.clone();

    let mut by_side: BTreeMap<Side, Vec<Port>> = BTreeMap::new();
    for port in inst.ports() {
        by_side.entry(port.side()).or_default().push(port);
    }

    for (side, mut ports) in by_side {
        let contacts = params.contacts(side, layers.device);
        ensure(ports.len() <= contacts.len(), || {
            format!(
                "device `{}` has {} ports facing {side} but the die has {} contacts there",
                device.name(),
                ports.len(),
                contacts.len()
            )
        })?;
        ports.sort_by(|a, b| along_side(side, a).total_cmp(&along_side(side, b)));
        let skip = (contacts.len() - ports.len()) / 2;
        for (port, contact) in ports.iter().zip(contacts.iter().skip(skip)) {
            debug!("routing {}.{} to contact {}", device.name(), port.name, contact.name);
            let route = route_quad(port, contact, None, None);
            cell.add_polygon(port.layer, route);
        }
    }

    if params.positive_tone {
        to_positive_tone(&cell, params, layers, &[])
    } else {
        Ok(cell)
    }
}
