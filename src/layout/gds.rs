//! GDSII export.
//!
//! Converts the cell hierarchy into [`gds21`] structures. The GDSII user unit
//! is 1 um and the database unit is 1 nm; all coordinates are snapped to the
//! database grid on the way out.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use arcstr::ArcStr;
use log::debug;

use super::cell::{Cell, Element, Instance, Label};
use super::error::{LayoutError, LayoutResult};
use crate::geometry::{split_polygon, Point, DB_GRID};

/// The most vertices written to a single boundary record.
///
/// An XY record holds at most 8191 points in its 16-bit length field.
pub const MAX_BOUNDARY_VERTICES: usize = 4000;

/// A GDSII exporter for one top cell and everything it instantiates.
pub struct GdsExporter<'a> {
    top: &'a Cell,
    names_used: HashSet<ArcStr>,
    /// Export names of instantiated cells, keyed by identity.
    names: HashMap<*const Cell, ArcStr>,
    /// Instantiated cells in dependency order (children first).
    order: Vec<Arc<Cell>>,
}

impl<'a> GdsExporter<'a> {
    pub fn new(top: &'a Cell) -> Self {
        Self {
            top,
            names_used: HashSet::new(),
            names: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Renames cells as needed so that no two distinct cells share a name.
    ///
    /// The top cell always keeps its name.
    fn get_cell_name(&mut self, cell: &Cell) -> ArcStr {
        let name = cell.name();
        let name = if self.names_used.contains(name) {
            let mut i = 1;
            loop {
                let newname = arcstr::format!("{}_{}", name, i);
                if !self.names_used.contains(&newname) {
                    break newname;
                }
                i += 1;
            }
        } else {
            name.clone()
        };
        self.names_used.insert(name.clone());
        name
    }

    fn visit(&mut self, cell: &Arc<Cell>) {
        let key = Arc::as_ptr(cell);
        if self.names.contains_key(&key) {
            return;
        }
        for inst in cell.insts() {
            self.visit(inst.cell());
        }
        let name = self.get_cell_name(cell);
        self.names.insert(key, name);
        self.order.push(Arc::clone(cell));
    }

    fn prepare(&mut self) {
        self.names_used.insert(self.top.name().clone());
        let top = self.top;
        for inst in top.insts() {
            self.visit(inst.cell());
        }
    }

    /// Exports to a [`gds21::GdsLibrary`].
    pub fn export_lib(mut self) -> LayoutResult<gds21::GdsLibrary> {
        self.prepare();

        let mut gdslib = gds21::GdsLibrary::new(self.top.name().to_string());
        gdslib.units = gds21::GdsUnits::new(DB_GRID, DB_GRID * 1e-6);

        let order = std::mem::take(&mut self.order);
        for cell in order.iter() {
            let name = self.names[&Arc::as_ptr(cell)].clone();
            gdslib.structs.push(self.export_cell(cell, name)?);
        }
        let top = self.top;
        gdslib.structs.push(self.export_cell(top, top.name().clone())?);

        debug!(
            "exported {} GDS structures for `{}`",
            gdslib.structs.len(),
            top.name()
        );
        Ok(gdslib)
    }

    /// Converts a [`Cell`] to a [`gds21::GdsStruct`] cell definition.
    fn export_cell(&mut self, cell: &Cell, name: ArcStr) -> LayoutResult<gds21::GdsStruct> {
        let mut elems = Vec::new();
        for inst in cell.insts() {
            elems.push(self.export_instance(inst)?.into());
        }
        for elem in cell.elems() {
            elems.extend(self.export_element(elem)?);
        }
        for label in cell.labels() {
            elems.push(self.export_label(label)?);
        }
        let mut strukt = gds21::GdsStruct::new(name.to_string());
        strukt.elems = elems;
        Ok(strukt)
    }

    /// Converts an [`Instance`] to a GDS instance ([`gds21::GdsStructRef`]).
    fn export_instance(&mut self, inst: &Instance) -> LayoutResult<gds21::GdsStructRef> {
        let t = inst.transform();
        let strans = if t.reflect || t.angle != 0.0 {
            Some(gds21::GdsStrans {
                reflected: t.reflect,
                angle: if t.angle != 0.0 { Some(t.angle) } else { None },
                ..Default::default()
            })
        } else {
            None
        };
        Ok(gds21::GdsStructRef {
            name: self.names[&Arc::as_ptr(inst.cell())].to_string(),
            xy: export_point(&t.offset)?,
            strans,
            ..Default::default()
        })
    }

    /// Converts an [`Element`] to one or more [`gds21::GdsBoundary`]s.
    ///
    /// GDS boundaries repeat their first point to close the ring, so an
    /// N-sided polygon is described by N + 1 points. Polygons with more than
    /// [`MAX_BOUNDARY_VERTICES`] vertices are cut into several boundaries.
    fn export_element(&mut self, elem: &Element) -> LayoutResult<Vec<gds21::GdsElement>> {
        let pieces = if elem.inner.len() > MAX_BOUNDARY_VERTICES {
            debug!(
                "splitting a {}-vertex polygon on layer {}",
                elem.inner.len(),
                elem.layer
            );
            split_polygon(&elem.inner, MAX_BOUNDARY_VERTICES)
        } else {
            vec![elem.inner.clone()]
        };
        pieces
            .iter()
            .filter(|poly| !poly.is_empty())
            .map(|poly| -> LayoutResult<gds21::GdsElement> {
                let mut xy = poly
                    .points
                    .iter()
                    .map(export_point)
                    .collect::<Result<Vec<_>, _>>()?;
                xy.push(xy[0].clone());
                Ok(gds21::GdsBoundary {
                    layer: elem.layer.layer,
                    datatype: elem.layer.datatype,
                    xy,
                    ..Default::default()
                }
                .into())
            })
            .collect()
    }

    fn export_label(&mut self, label: &Label) -> LayoutResult<gds21::GdsElement> {
        Ok(gds21::GdsTextElem {
            string: label.text.to_string(),
            layer: label.layer.layer,
            texttype: label.layer.datatype,
            xy: export_point(&label.loc)?,
            ..Default::default()
        }
        .into())
    }
}

/// Converts a [`Point`] in microns to a GDS21 [`gds21::GdsPoint`] in database units.
pub fn export_point(pt: &Point) -> LayoutResult<gds21::GdsPoint> {
    Ok(gds21::GdsPoint::new(to_db(pt.x)?, to_db(pt.y)?))
}

fn to_db(v: f64) -> LayoutResult<i32> {
    let db = (v / DB_GRID).round();
    if !db.is_finite() || db > i32::MAX as f64 || db < i32::MIN as f64 {
        return Err(LayoutError::CoordinateOverflow(v));
    }
    Ok(db as i32)
}

/// Converts `top` and its hierarchy to a [`gds21::GdsLibrary`].
pub fn to_gds_library(top: &Cell) -> LayoutResult<gds21::GdsLibrary> {
    GdsExporter::new(top).export_lib()
}

/// Writes `top` and its hierarchy to a GDSII file.
pub fn write_gds(top: &Cell, path: impl AsRef<Path>) -> LayoutResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let lib = to_gds_library(top)?;
    lib.save(path)
        .map_err(|e| LayoutError::Gds(format!("{e:?}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::layout::layers::Layer;
    use crate::paths::out_gds;
    use crate::tests::test_work_dir;

    fn leaf(name: &str) -> Arc<Cell> {
        let mut cell = Cell::new(name);
        cell.add_rect(Layer::new(1, 0), Rect::from_size(1.0, 1.0));
        cell.finish()
    }

    #[test]
    fn distinct_cells_get_unique_names() -> LayoutResult<()> {
        let a = leaf("unit");
        let b = leaf("unit");
        let mut top = Cell::new("unit");
        top.add_instance(Instance::new("a", Arc::clone(&a)));
        top.add_instance(Instance::new("a2", a))
            .rotate(90.0, Point::zero());
        top.add_instance(Instance::new("b", b))
            .translate(Point::new(3.0, 0.0));
        top.add_label("hello", Point::new(0.5, 0.5), Layer::new(5, 0));

        let lib = to_gds_library(&top)?;
        let names: Vec<String> = lib.structs.iter().map(|s| s.name.to_string()).collect();
        assert_eq!(names, vec!["unit_1", "unit_2", "unit"]);
        // Two references to the first leaf, one to the second, plus one label.
        assert_eq!(lib.structs[2].elems.len(), 4);
        Ok(())
    }

    #[test]
    fn coordinates_snap_to_nanometers() -> LayoutResult<()> {
        let p = export_point(&Point::new(1.2344, -0.0006))?;
        assert_eq!(p, gds21::GdsPoint::new(1234, -1));
        assert!(matches!(
            export_point(&Point::new(1e9, 0.0)),
            Err(LayoutError::CoordinateOverflow(_))
        ));
        Ok(())
    }

    #[test]
    fn writes_and_reloads() -> LayoutResult<()> {
        let mut top = Cell::new("nwgen_gds_round_trip");
        top.add_rect(Layer::new(2, 1), Rect::from_size(5.0, 2.0));
        let path = out_gds(test_work_dir("nwgen_gds_round_trip"), top.name());
        write_gds(&top, &path)?;

        let lib = gds21::GdsLibrary::load(&path).map_err(|e| LayoutError::Gds(format!("{e:?}")))?;
        assert_eq!(lib.structs.len(), 1);
        match &lib.structs[0].elems[0] {
            gds21::GdsElement::GdsBoundary(b) => {
                assert_eq!(b.layer, 2);
                assert_eq!(b.datatype, 1);
                assert_eq!(b.xy.len(), 5);
                assert_eq!(b.xy[2], gds21::GdsPoint::new(5000, 2000));
            }
            other => panic!("unexpected element {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn long_tapers_split_into_several_boundaries() -> LayoutResult<()> {
        let mut top = crate::shapes::hyper_taper(1000.0, 50.0, 1.0, Layer::new(1, 0))?;
        top.set_name("nwgen_gds_long_taper");
        assert!(top.elems()[0].inner.len() > MAX_BOUNDARY_VERTICES);
        let area = top.elems()[0].inner.area();

        let path = out_gds(test_work_dir("nwgen_gds_long_taper"), top.name());
        write_gds(&top, &path)?;
        let lib = gds21::GdsLibrary::load(&path).map_err(|e| LayoutError::Gds(format!("{e:?}")))?;

        let boundaries: Vec<_> = lib.structs[0]
            .elems
            .iter()
            .filter_map(|e| match e {
                gds21::GdsElement::GdsBoundary(b) => Some(b),
                _ => None,
            })
            .collect();
        assert!(boundaries.len() > 1);
        assert!(boundaries
            .iter()
            .all(|b| b.xy.len() <= MAX_BOUNDARY_VERTICES + 1));

        // Shoelace area of the reloaded boundaries, in um^2.
        let reloaded: f64 = boundaries
            .iter()
            .map(|b| {
                let twice: f64 = b
                    .xy
                    .windows(2)
                    .map(|w| w[0].x as f64 * w[1].y as f64 - w[1].x as f64 * w[0].y as f64)
                    .sum();
                twice.abs() / 2.0 * DB_GRID * DB_GRID
            })
            .sum();
        approx::assert_relative_eq!(reloaded, area, max_relative = 1e-3);
        Ok(())
    }
}
