//! Chips: a grid of dies tracked by an occupancy map.

use std::path::Path;
use std::sync::Arc;

use derive_builder::Builder;
use grid::Grid;
use log::{error, info, warn};
use plotters::prelude::{
    Color, DrawingAreaErrorKind, IntoDrawingArea, RGBColor, Rectangle, SVGBackend, BLACK, WHITE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::geometry::{Point, Rect, Region};
use crate::layout::error::{ensure, ensure_positive, LayoutError, LayoutResult};
use crate::layout::{write_gds, Cell, Instance, Layers};
use crate::shapes::{cross, text};

/// Pixels per die in the occupancy map rendering.
const MAP_DIE_PX: u32 = 40;

/// The state of one die slot.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Occupancy {
    #[default]
    Free,
    Occupied,
}

#[derive(Debug, ThisError)]
pub enum PlacementError {
    #[error("cell `{name}` spanning {span:?} dies at (col, row) = {pos:?} falls outside the {num_dies:?} die grid")]
    OutOfBounds {
        name: String,
        pos: (usize, usize),
        span: (usize, usize),
        num_dies: (usize, usize),
    },

    #[error("no free {span:?} die span left for cell `{name}`")]
    ChipFull { name: String, span: (usize, usize) },
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, derive(Debug))]
#[serde(default)]
pub struct ChipParams {
    #[builder(setter(into))]
    pub name: String,
    /// Dies along x and y.
    pub num_dies: (usize, usize),
    pub die_size: (f64, f64),
    /// Width of the dicing lanes drawn on every die boundary.
    pub dicing_width: f64,
    /// Draw die indices and corner marks on the annotation layer.
    pub annotations: bool,
}

impl Default for ChipParams {
    fn default() -> Self {
        Self {
            name: "chip".to_string(),
            num_dies: (4, 4),
            die_size: (10000.0, 10000.0),
            dicing_width: 100.0,
            annotations: true,
        }
    }
}

impl ChipParams {
    #[inline]
    pub fn builder() -> ChipParamsBuilder {
        ChipParamsBuilder::default()
    }

    pub fn validate(&self) -> LayoutResult<()> {
        ensure(self.num_dies.0 > 0 && self.num_dies.1 > 0, || {
            format!("a chip needs at least one die, got {:?}", self.num_dies)
        })?;
        ensure_positive(&[
            ("die_size.0", self.die_size.0),
            ("die_size.1", self.die_size.1),
            ("dicing_width", self.dicing_width),
        ])?;
        ensure(
            self.dicing_width < self.die_size.0.min(self.die_size.1),
            || {
                format!(
                    "dicing lanes ({} um) are wider than the dies",
                    self.dicing_width
                )
            },
        )?;
        ensure(!self.name.is_empty(), || "chip name is empty".to_string())
    }
}

/// A chip under construction.
///
/// Die `(col, row)` spans `[col, col + 1] x [row, row + 1]` die sizes with
/// `(0, 0)` at the bottom-left corner of the chip.
pub struct Chip {
    params: ChipParams,
    /// Indexed `[row][col]`, row 0 at the bottom.
    occupancy: Grid<Occupancy>,
    cell: Cell,
}

/// Draws the chip frame and creates an empty occupancy map.
pub fn create_chip(params: &ChipParams, layers: &Layers) -> LayoutResult<Chip> {
    params.validate()?;
    let (nx, ny) = params.num_dies;
    let (dx, dy) = params.die_size;
    let (w, h) = (nx as f64 * dx, ny as f64 * dy);
    let half = params.dicing_width / 2.0;

    let mut lanes = Region::new();
    for i in 0..=nx {
        let x = i as f64 * dx;
        lanes = lanes.union(&Region::from_rect(&Rect::new(
            Point::new(x - half, -half),
            Point::new(x + half, h + half),
        )));
    }
    for j in 0..=ny {
        let y = j as f64 * dy;
        lanes = lanes.union(&Region::from_rect(&Rect::new(
            Point::new(-half, y - half),
            Point::new(w + half, y + half),
        )));
    }

    let mut cell = Cell::new(params.name.as_str());
    cell.add_region(layers.die, &lanes);

    if params.annotations {
        let text_size = dy / 20.0;
        for row in 0..ny {
            for col in 0..nx {
                let label = text(&format!("{col},{row}"), text_size, layers.annotation)?.finish();
                cell.add_instance(Instance::new(format!("index_{col}_{row}"), label))
                    .translate(Point::new(
                        col as f64 * dx + params.dicing_width,
                        row as f64 * dy + params.dicing_width,
                    ));
            }
        }
        let mark = cross(dx / 10.0, params.dicing_width, layers.annotation)?.finish();
        for (i, corner) in Rect::new(Point::zero(), Point::new(w, h))
            .corners()
            .into_iter()
            .enumerate()
        {
            cell.add_instance(Instance::new(format!("corner_{i}"), mark.clone()))
                .translate(corner);
        }
    }

    info!("created {nx} x {ny} die chip `{}` ({w} x {h} um)", params.name);
    Ok(Chip {
        params: params.clone(),
        occupancy: Grid::init(ny, nx, Occupancy::Free),
        cell,
    })
}

impl Chip {
    #[inline]
    pub fn params(&self) -> &ChipParams {
        &self.params
    }

    #[inline]
    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn into_cell(self) -> Cell {
        self.cell
    }

    #[inline]
    pub fn occupancy(&self) -> &Grid<Occupancy> {
        &self.occupancy
    }

    /// How many dies a cell covers along x and y.
    pub fn span_of(&self, cell: &Cell) -> (usize, usize) {
        let (w, h) = cell.size();
        let (dx, dy) = self.params.die_size;
        let dies = |len: f64, die: f64| ((len / die - 1e-9).ceil() as usize).max(1);
        (dies(w, dx), dies(h, dy))
    }

    fn in_bounds(&self, (col, row): (usize, usize), (sx, sy): (usize, usize)) -> bool {
        let (nx, ny) = self.params.num_dies;
        col.checked_add(sx).is_some_and(|end| end <= nx)
            && row.checked_add(sy).is_some_and(|end| end <= ny)
    }

    /// Whether die `(col, row)` exists and is free.
    pub fn is_free(&self, col: usize, row: usize) -> bool {
        matches!(self.occupancy.get(row, col), Some(Occupancy::Free))
    }

    fn span_is_free(&self, (col, row): (usize, usize), (sx, sy): (usize, usize)) -> bool {
        self.in_bounds((col, row), (sx, sy))
            && (row..row + sy).all(|r| (col..col + sx).all(|c| self.is_free(c, r)))
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy
            .iter()
            .filter(|o| **o == Occupancy::Occupied)
            .count()
    }

    /// Places `cell` centered on the dies starting at `(col, row)`.
    ///
    /// A cell larger than one die covers as many dies as it needs, extending
    /// right and up. Covering an occupied die logs a warning but still
    /// places the cell. If any covered die is off the chip, nothing is placed.
    pub fn place_on_chip(
        &mut self,
        cell: Arc<Cell>,
        (col, row): (usize, usize),
    ) -> Result<(), PlacementError> {
        let span = self.span_of(&cell);
        if !self.in_bounds((col, row), span) {
            let err = PlacementError::OutOfBounds {
                name: cell.name().to_string(),
                pos: (col, row),
                span,
                num_dies: self.params.num_dies,
            };
            error!("{err}");
            return Err(err);
        }

        let (sx, sy) = span;
        for r in row..row + sy {
            for c in col..col + sx {
                if let Some(slot) = self.occupancy.get_mut(r, c) {
                    if *slot == Occupancy::Occupied {
                        warn!(
                            "die ({c}, {r}) is already occupied; overlapping it with `{}`",
                            cell.name()
                        );
                    }
                    *slot = Occupancy::Occupied;
                }
            }
        }

        let (dx, dy) = self.params.die_size;
        let center = Point::new(
            (col as f64 + sx as f64 / 2.0) * dx,
            (row as f64 + sy as f64 / 2.0) * dy,
        );
        let name = format!("{}_{col}_{row}", cell.name());
        self.cell
            .add_instance(Instance::new(name, cell))
            .center_at(center);
        Ok(())
    }

    /// Places each cell on the first free span found scanning row by row
    /// from `start`.
    ///
    /// Returns the position chosen for each cell. The first cell that does
    /// not fit stops placement with [`PlacementError::ChipFull`]; cells
    /// placed before it stay on the chip.
    pub fn place_remaining_devices(
        &mut self,
        cells: impl IntoIterator<Item = Arc<Cell>>,
        start: (usize, usize),
    ) -> Result<Vec<(usize, usize)>, PlacementError> {
        let (nx, ny) = self.params.num_dies;
        // Starts past the last die leave nothing to scan.
        let first = start
            .1
            .checked_mul(nx)
            .and_then(|i| i.checked_add(start.0))
            .map_or(nx * ny, |i| i.min(nx * ny));
        let mut placed = Vec::new();
        for cell in cells {
            let span = self.span_of(&cell);
            let pos = (first..nx * ny)
                .map(|i| (i % nx, i / nx))
                .find(|&pos| self.span_is_free(pos, span));
            match pos {
                Some(pos) => {
                    self.place_on_chip(cell, pos)?;
                    placed.push(pos);
                }
                None => {
                    let err = PlacementError::ChipFull {
                        name: cell.name().to_string(),
                        span,
                    };
                    warn!("{err}");
                    return Err(err);
                }
            }
        }
        Ok(placed)
    }

    /// A text map of the chip, top row first: `X` for occupied, `.` for free.
    pub fn map(&self) -> String {
        let (rows, cols) = self.occupancy.size();
        let mut out = String::with_capacity(rows * (cols + 1));
        for r in (0..rows).rev() {
            for c in 0..cols {
                out.push(if self.is_free(c, r) { '.' } else { 'X' });
            }
            out.push('\n');
        }
        out
    }

    /// Logs the occupancy map at info level.
    pub fn log_map(&self) {
        info!(
            "chip `{}`: {} of {} dies occupied\n{}",
            self.params.name,
            self.occupied_count(),
            self.occupancy.size().0 * self.occupancy.size().1,
            self.map()
        );
    }

    /// Renders the occupancy map to an SVG file.
    pub fn plot_map(&self, path: impl AsRef<Path>) -> LayoutResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let (rows, cols) = self.occupancy.size();
        let size = (cols as u32 * MAP_DIE_PX, rows as u32 * MAP_DIE_PX);
        let plot_err = |e: DrawingAreaErrorKind<std::io::Error>| LayoutError::Plot(e.to_string());

        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        for r in 0..rows {
            for c in 0..cols {
                let x0 = (c as u32 * MAP_DIE_PX) as i32;
                // Row 0 is drawn at the bottom.
                let y0 = ((rows - 1 - r) as u32 * MAP_DIE_PX) as i32;
                let corners = [(x0 + 1, y0 + 1), (x0 + MAP_DIE_PX as i32 - 1, y0 + MAP_DIE_PX as i32 - 1)];
                let style = if self.is_free(c, r) {
                    BLACK.stroke_width(1)
                } else {
                    RGBColor(31, 119, 180).filled()
                };
                root.draw(&Rectangle::new(corners, style))
                    .map_err(plot_err)?;
            }
        }
        root.present().map_err(plot_err)?;
        Ok(())
    }

    pub fn write_gds(&self, path: impl AsRef<Path>) -> LayoutResult<()> {
        write_gds(&self.cell, path)
    }
}
