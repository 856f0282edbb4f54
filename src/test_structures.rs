//! Process test structures: alignment marks, van der Pauw crosses,
//! resolution gratings and etch squares.

use std::sync::Arc;

use grid::Grid;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::layout::error::{ensure, ensure_positive, LayoutResult};
use crate::layout::{grid_layout, invert, Align, Cell, Instance, Layer, Port, Side};
use crate::shapes::{cross, text};

/// Offset of a label from its structure, in multiples of the text size.
const LABEL_GAP: f64 = 1.5;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    pub cross_length: f64,
    pub cross_width: f64,
    /// Spacing between the marks of successive layers.
    pub spacing: f64,
    /// Draw each mark as a cross-shaped opening in a square window.
    pub inverted: bool,
    /// Margin of the window around an inverted cross.
    pub border: f64,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            cross_length: 100.0,
            cross_width: 10.0,
            spacing: 50.0,
            inverted: false,
            border: 20.0,
        }
    }
}

/// A row of alignment crosses, one per entry in `layers`, centered at the origin.
pub fn alignment_mark(params: &AlignmentParams, layers: &[Layer]) -> LayoutResult<Cell> {
    ensure(!layers.is_empty(), || {
        "an alignment mark needs at least one layer".to_string()
    })?;
    ensure_positive(&[("spacing", params.spacing), ("border", params.border)])?;

    let marks = layers
        .iter()
        .map(|&layer| -> LayoutResult<Option<Arc<Cell>>> {
            let mark = cross(params.cross_length, params.cross_width, layer)?;
            let mut mark = if params.inverted {
                invert(&mark, params.border, layer)?
            } else {
                mark
            };
            mark.set_name(format!("align_{}_{}", layer.layer, layer.datatype));
            Ok(Some(mark.finish()))
        })
        .collect::<LayoutResult<Vec<_>>>()?;
    let tiles = Grid::from_vec(marks, layers.len());
    let mut cell = grid_layout("alignment_mark", &tiles, (params.spacing, 0.0), Align::Center);
    cell.center_at(Point::zero());
    Ok(cell)
}

/// A van der Pauw sheet resistance cross.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdpParams {
    pub arm_w: f64,
    /// Length of each arm from the center of the cross to its pad.
    pub arm_l: f64,
    pub pad_size: f64,
}

impl Default for VdpParams {
    fn default() -> Self {
        Self {
            arm_w: 1.0,
            arm_l: 40.0,
            pad_size: 50.0,
        }
    }
}

/// Four arms ending in square pads, centered at the origin.
///
/// Ports `N`, `E`, `S` and `W` sit on the outer pad edges.
pub fn vdp(params: &VdpParams, layer: Layer) -> LayoutResult<Cell> {
    let VdpParams {
        arm_w,
        arm_l,
        pad_size,
    } = *params;
    ensure_positive(&[("arm_w", arm_w), ("arm_l", arm_l), ("pad_size", pad_size)])?;
    ensure(pad_size >= arm_w, || {
        format!("pads ({pad_size}) must be at least as wide as the arms ({arm_w})")
    })?;
    ensure(arm_l > pad_size / 2.0, || {
        format!("arms of length {arm_l} are too short to keep {pad_size} um pads apart")
    })?;

    let mut cell = cross(2.0 * arm_l, arm_w, layer)?;
    cell.set_name("vdp");
    let reach = arm_l + pad_size;
    for side in Side::ALL {
        let dir = Point::unit(side.orientation());
        let center = dir * (arm_l + pad_size / 2.0);
        cell.add_rect(layer, Rect::from_center(center, pad_size, pad_size));
        cell.add_port(Port::new(
            side.short_form(),
            dir * reach,
            pad_size,
            side.orientation(),
            layer,
        ))?;
    }
    Ok(cell)
}

/// Line/space gratings of increasing width.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionParams {
    pub min_width: f64,
    pub max_width: f64,
    pub step: f64,
    /// Lines per grating.
    pub lines: usize,
    pub line_length: f64,
    /// Spacing between neighboring gratings.
    pub spacing: f64,
    pub text_size: f64,
}

impl Default for ResolutionParams {
    fn default() -> Self {
        Self {
            min_width: 0.1,
            max_width: 1.0,
            step: 0.1,
            lines: 5,
            line_length: 10.0,
            spacing: 5.0,
            text_size: 2.0,
        }
    }
}

impl ResolutionParams {
    /// The line widths to draw, from `min_width` to `max_width` inclusive.
    pub fn widths(&self) -> LayoutResult<Vec<f64>> {
        ensure_positive(&[
            ("min_width", self.min_width),
            ("max_width", self.max_width),
            ("step", self.step),
        ])?;
        ensure(self.max_width >= self.min_width, || {
            format!(
                "max width ({}) is below min width ({})",
                self.max_width, self.min_width
            )
        })?;
        let n = ((self.max_width - self.min_width) / self.step + 1e-9).floor() as usize;
        Ok((0..=n)
            .map(|i| self.min_width + i as f64 * self.step)
            .collect())
    }
}

/// Gratings laid out left to right, each labeled with its line width on
/// `label_layer`.
///
/// Each grating has `lines` vertical lines with spaces equal to the line
/// width. The bottoms of the lines sit on y = 0.
pub fn resolution_test(
    params: &ResolutionParams,
    layer: Layer,
    label_layer: Layer,
) -> LayoutResult<Cell> {
    let widths = params.widths()?;
    ensure(params.lines > 0, || "a grating needs at least one line".to_string())?;
    ensure_positive(&[
        ("line_length", params.line_length),
        ("spacing", params.spacing),
        ("text_size", params.text_size),
    ])?;

    let mut cell = Cell::new("resolution_test");
    let mut x = 0.0;
    for w in widths {
        let x0 = x;
        for i in 0..params.lines {
            let lx = x0 + 2.0 * w * i as f64;
            cell.add_rect(
                layer,
                Rect::new(Point::new(lx, 0.0), Point::new(lx + w, params.line_length)),
            );
        }
        let grating_w = (2 * params.lines - 1) as f64 * w;
        let label = text(&format!("{w:.2}"), params.text_size, label_layer)?.finish();
        let label_w = label.size().0;
        cell.add_instance(Instance::new(format!("label_{w:.2}"), label))
            .translate(Point::new(
                x0,
                params.line_length + LABEL_GAP * params.text_size - params.text_size,
            ));
        x += grating_w.max(label_w) + params.spacing;
    }
    Ok(cell)
}

/// Squares of each layer for checking etch rates, labeled below.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtchParams {
    pub size: f64,
    pub spacing: f64,
    pub text_size: f64,
}

impl Default for EtchParams {
    fn default() -> Self {
        Self {
            size: 20.0,
            spacing: 10.0,
            text_size: 3.0,
        }
    }
}

pub fn etch_test(params: &EtchParams, layers: &[Layer], label_layer: Layer) -> LayoutResult<Cell> {
    ensure(!layers.is_empty(), || {
        "an etch test needs at least one layer".to_string()
    })?;
    ensure_positive(&[
        ("size", params.size),
        ("spacing", params.spacing),
        ("text_size", params.text_size),
    ])?;

    let squares = layers
        .iter()
        .map(|&layer| -> LayoutResult<Option<Arc<Cell>>> {
            let mut sq = Cell::new(format!("etch_{}_{}", layer.layer, layer.datatype));
            sq.add_rect(layer, Rect::from_size(params.size, params.size));
            let label = text(&layer.to_string(), params.text_size, label_layer)?.finish();
            sq.add_instance(Instance::new("label", label))
                .translate(Point::new(0.0, -LABEL_GAP * params.text_size));
            Ok(Some(sq.finish()))
        })
        .collect::<LayoutResult<Vec<_>>>()?;
    let tiles = Grid::from_vec(squares, layers.len());
    Ok(grid_layout("etch_test", &tiles, (params.spacing, 0.0), Align::LowerLeft))
}
