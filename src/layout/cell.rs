use std::collections::BTreeSet;
use std::sync::Arc;

use arcstr::ArcStr;

use super::error::{LayoutError, LayoutResult};
use super::layers::Layer;
use super::port::Port;
use crate::geometry::{Point, Polygon, Rect, Region, Transform};

/// A polygon drawn on a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub layer: Layer,
    pub inner: Polygon,
}

/// A text label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: ArcStr,
    pub loc: Point,
    pub layer: Layer,
}

/// A placed copy of another cell.
#[derive(Debug, Clone)]
pub struct Instance {
    name: ArcStr,
    cell: Arc<Cell>,
    transform: Transform,
}

/// A layout cell: polygons, instances of other cells, ports and labels.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    name: ArcStr,
    elems: Vec<Element>,
    insts: Vec<Instance>,
    ports: Vec<Port>,
    labels: Vec<Label>,
}

impl Cell {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    #[inline]
    pub fn elems(&self) -> &[Element] {
        &self.elems
    }

    #[inline]
    pub fn insts(&self) -> &[Instance] {
        &self.insts
    }

    #[inline]
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn add_polygon(&mut self, layer: Layer, poly: Polygon) {
        if poly.len() >= 3 {
            self.elems.push(Element { layer, inner: poly });
        }
    }

    pub fn add_rect(&mut self, layer: Layer, rect: Rect) {
        self.add_polygon(layer, rect.to_polygon());
    }

    /// Adds every polygon of `region`, fractured so that none has holes.
    pub fn add_region(&mut self, layer: Layer, region: &Region) {
        for poly in region.polygons() {
            self.add_polygon(layer, poly);
        }
    }

    pub fn add_label(&mut self, text: impl Into<ArcStr>, loc: Point, layer: Layer) {
        self.labels.push(Label {
            text: text.into(),
            loc,
            layer,
        });
    }

    /// Adds an instance and returns a handle to it for further placement.
    pub fn add_instance(&mut self, inst: Instance) -> &mut Instance {
        let idx = self.insts.len();
        self.insts.push(inst);
        &mut self.insts[idx]
    }

    pub fn add_port(&mut self, port: Port) -> LayoutResult<()> {
        if self.has_port(&port.name) {
            return Err(LayoutError::DuplicatePort {
                cell: self.name.clone(),
                port: port.name,
            });
        }
        self.ports.push(port);
        Ok(())
    }

    /// Re-exports a port of `inst` on this cell under `name`.
    pub fn expose_port(&mut self, inst: &Instance, port: &str, name: &str) -> LayoutResult<()> {
        let port = inst.port(port)?.with_name(name);
        self.add_port(port)
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.ports.iter().any(|p| p.name == name)
    }

    pub fn port(&self, name: &str) -> LayoutResult<&Port> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LayoutError::PortNotFound {
                cell: self.name.clone(),
                port: ArcStr::from(name),
            })
    }

    pub fn remove_port(&mut self, name: &str) -> Option<Port> {
        let idx = self.ports.iter().position(|p| p.name == name)?;
        Some(self.ports.remove(idx))
    }

    /// The bounding box of all geometry under `t`, including instances.
    fn bbox_under(&self, t: &Transform) -> Option<Rect> {
        let elems = self
            .elems
            .iter()
            .filter_map(|e| Rect::bounding(e.inner.points.iter().map(|p| t.apply(*p))));
        let insts = self
            .insts
            .iter()
            .filter_map(|i| i.cell.bbox_under(&i.transform.then(t)));
        elems.chain(insts).reduce(|a, b| a.union(&b))
    }

    /// The bounding box of the cell, or `None` if it has no geometry.
    pub fn bbox(&self) -> Option<Rect> {
        self.bbox_under(&Transform::identity())
    }

    /// The width and height of the bounding box; zero for an empty cell.
    pub fn size(&self) -> (f64, f64) {
        self.bbox()
            .map(|b| (b.width(), b.height()))
            .unwrap_or((0.0, 0.0))
    }

    pub fn center(&self) -> Point {
        self.bbox().map(|b| b.center()).unwrap_or_default()
    }

    fn flatten_into(&self, t: &Transform, elems: &mut Vec<Element>, labels: &mut Vec<Label>) {
        elems.extend(self.elems.iter().map(|e| Element {
            layer: e.layer,
            inner: e.inner.transform(t),
        }));
        labels.extend(self.labels.iter().map(|l| Label {
            loc: t.apply(l.loc),
            ..l.clone()
        }));
        for inst in self.insts.iter() {
            inst.cell.flatten_into(&inst.transform.then(t), elems, labels);
        }
    }

    /// A copy of this cell with all instances expanded into polygons.
    ///
    /// Ports of the top cell are kept; ports of instances are dropped.
    pub fn flatten(&self) -> Cell {
        let mut elems = Vec::new();
        let mut labels = Vec::new();
        self.flatten_into(&Transform::identity(), &mut elems, &mut labels);
        Cell {
            name: self.name.clone(),
            elems,
            insts: Vec::new(),
            ports: self.ports.clone(),
            labels,
        }
    }

    /// The merged geometry on `layer`, including instances.
    pub fn region(&self, layer: Layer) -> Region {
        let flat = self.flatten();
        Region::from_polygons(
            flat.elems
                .iter()
                .filter(|e| e.layer == layer)
                .map(|e| &e.inner),
        )
    }

    /// Every layer with geometry in this cell or its instances.
    pub fn layers(&self) -> BTreeSet<Layer> {
        let mut out: BTreeSet<Layer> = self.elems.iter().map(|e| e.layer).collect();
        for inst in self.insts.iter() {
            out.extend(inst.cell.layers());
        }
        out
    }

    /// Removes all polygons on `layer` from this cell (not its instances).
    pub fn remove_layer(&mut self, layer: Layer) {
        self.elems.retain(|e| e.layer != layer);
    }

    /// Applies `t` to everything in the cell.
    pub fn transform(&mut self, t: &Transform) {
        for e in self.elems.iter_mut() {
            e.inner = e.inner.transform(t);
        }
        for i in self.insts.iter_mut() {
            i.transform = i.transform.then(t);
        }
        for p in self.ports.iter_mut() {
            *p = p.transform(t);
        }
        for l in self.labels.iter_mut() {
            l.loc = t.apply(l.loc);
        }
    }

    pub fn translate(&mut self, by: Point) {
        self.transform(&Transform::translate(by));
    }

    /// Moves the cell so its bounding box is centered at `p`.
    pub fn center_at(&mut self, p: Point) {
        let by = p - self.center();
        self.translate(by);
    }

    /// Consumes the cell, producing a shareable handle for instancing.
    #[inline]
    pub fn finish(self) -> Arc<Cell> {
        Arc::new(self)
    }
}

impl Instance {
    pub fn new(name: impl Into<ArcStr>, cell: Arc<Cell>) -> Self {
        Self {
            name: name.into(),
            cell,
            transform: Transform::identity(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Applies `t` after the instance's current transform.
    pub fn apply(&mut self, t: &Transform) -> &mut Self {
        self.transform = self.transform.then(t);
        self
    }

    pub fn translate(&mut self, by: Point) -> &mut Self {
        self.apply(&Transform::translate(by))
    }

    pub fn rotate(&mut self, angle: f64, about: Point) -> &mut Self {
        self.apply(&Transform::rotate_about(angle, about))
    }

    /// Mirrors about the horizontal line `y`.
    pub fn mirror_x(&mut self, y: f64) -> &mut Self {
        let t = Transform::translate(Point::new(0.0, -y))
            .then(&Transform::mirror_x())
            .then(&Transform::translate(Point::new(0.0, y)));
        self.apply(&t)
    }

    /// Mirrors about the vertical line `x`.
    pub fn mirror_y(&mut self, x: f64) -> &mut Self {
        let t = Transform::translate(Point::new(-x, 0.0))
            .then(&Transform::mirror_x())
            .then(&Transform::rotate(180.0))
            .then(&Transform::translate(Point::new(x, 0.0)));
        self.apply(&t)
    }

    /// Places the child cell's origin at `p`, keeping rotation and reflection.
    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.transform.offset = p;
        self
    }

    /// Moves the instance so its bounding box is centered at `p`.
    pub fn center_at(&mut self, p: Point) -> &mut Self {
        let center = self.bbox().map(|b| b.center()).unwrap_or(self.transform.offset);
        self.translate(p - center)
    }

    pub fn bbox(&self) -> Option<Rect> {
        self.cell.bbox_under(&self.transform)
    }

    /// The named port of the child cell, in the parent's coordinates.
    pub fn port(&self, name: &str) -> LayoutResult<Port> {
        Ok(self.cell.port(name)?.transform(&self.transform))
    }

    /// All ports of the child cell, in the parent's coordinates.
    pub fn ports(&self) -> Vec<Port> {
        self.cell
            .ports()
            .iter()
            .map(|p| p.transform(&self.transform))
            .collect()
    }

    /// Rotates and moves this instance so that its port `port` sits on
    /// `dest`, facing it.
    pub fn connect(&mut self, port: &str, dest: &Port) -> LayoutResult<&mut Self> {
        let p = self.port(port)?;
        let angle = dest.orientation + 180.0 - p.orientation;
        self.rotate(angle, p.center);
        let p = self.port(port)?;
        Ok(self.translate(dest.center - p.center))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn unit_square() -> Arc<Cell> {
        let mut cell = Cell::new("square");
        cell.add_rect(Layer::new(1, 0), Rect::from_size(2.0, 1.0));
        cell.add_port(Port::new(
            "e",
            Point::new(2.0, 0.5),
            1.0,
            0.0,
            Layer::new(1, 0),
        ))
        .unwrap();
        cell.finish()
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let mut cell = Cell::new("dup");
        let p = Port::new("a", Point::zero(), 1.0, 0.0, Layer::default());
        cell.add_port(p.clone()).unwrap();
        assert!(matches!(
            cell.add_port(p),
            Err(LayoutError::DuplicatePort { .. })
        ));
        assert!(matches!(
            cell.port("b"),
            Err(LayoutError::PortNotFound { .. })
        ));
    }

    #[test]
    fn empty_cell_has_no_bbox() {
        let cell = Cell::new("empty");
        assert!(cell.bbox().is_none());
        assert_eq!(cell.size(), (0.0, 0.0));
    }

    #[test]
    fn instance_bbox_follows_rotation() {
        let mut top = Cell::new("top");
        let inst = top.add_instance(Instance::new("sq", unit_square()));
        inst.rotate(90.0, Point::zero());
        let bbox = top.bbox().unwrap();
        assert_eq!(bbox, Rect::new(Point::new(-1.0, 0.0), Point::new(0.0, 2.0)));
    }

    #[test]
    fn connect_faces_destination() {
        let sq = unit_square();
        let mut top = Cell::new("top");
        let dest = Port::new("d", Point::new(10.0, 10.0), 1.0, 90.0, Layer::new(1, 0));
        let inst = top.add_instance(Instance::new("sq", sq));
        inst.connect("e", &dest).unwrap();
        let p = inst.port("e").unwrap();
        assert_relative_eq!(p.center.x, 10.0, epsilon = 1e-6);
        assert_relative_eq!(p.center.y, 10.0, epsilon = 1e-6);
        assert_relative_eq!(p.orientation, 270.0, epsilon = 1e-6);
        // The square now hangs above the destination port.
        let bbox = inst.bbox().unwrap();
        assert_relative_eq!(bbox.bottom(), 10.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.top(), 12.0, epsilon = 1e-6);
    }

    #[test]
    fn flatten_applies_nested_transforms() {
        let sq = unit_square();
        let mut mid = Cell::new("mid");
        mid.add_instance(Instance::new("a", sq))
            .translate(Point::new(5.0, 0.0));
        let mid = mid.finish();
        let mut top = Cell::new("top");
        top.add_instance(Instance::new("b", mid))
            .mirror_y(0.0);
        let flat = top.flatten();
        assert!(flat.insts().is_empty());
        assert_eq!(flat.elems().len(), 1);
        let bbox = flat.bbox().unwrap();
        assert_relative_eq!(bbox.left(), -7.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.right(), -5.0, epsilon = 1e-6);
        assert_eq!(flat.layers().len(), 1);
    }

    #[test]
    fn merged_region() {
        let mut cell = Cell::new("two");
        cell.add_rect(Layer::new(1, 0), Rect::from_size(2.0, 2.0));
        cell.add_rect(Layer::new(1, 0), Rect::from_size(2.0, 2.0).translate(Point::new(1.0, 0.0)));
        cell.add_rect(Layer::new(2, 0), Rect::from_size(9.0, 9.0));
        assert_relative_eq!(cell.region(Layer::new(1, 0)).area(), 6.0, epsilon = 1e-6);
    }
}
