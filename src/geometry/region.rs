//! Boolean geometry on sets of polygons.
//!
//! A [`Region`] may contain polygons with holes. GDSII boundaries cannot
//! represent holes, so [`Region::polygons`] fractures the region into simple
//! polygons before they are handed to a cell.

use geo::{Area, BooleanOps, Buffer, BoundingRect, Coord, LineString, MultiPolygon};
use log::warn;
use serde::{Deserialize, Serialize};

use super::point::Point;
use super::polygon::Polygon;
use super::rect::Rect;

/// Splitting gives up past this many nested cuts.
const MAX_SPLIT_DEPTH: usize = 32;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
    Xor,
}

/// A set of polygons, possibly with holes, supporting boolean operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    inner: MultiPolygon<f64>,
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

fn to_ring(poly: &Polygon) -> LineString<f64> {
    LineString::from(
        poly.points
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

fn from_ring(ring: &LineString<f64>) -> Polygon {
    Polygon::new(ring.0.iter().map(|c| Point::new(c.x, c.y)).collect())
}

fn geo_rect(rect: &Rect) -> geo::Polygon<f64> {
    geo::Polygon::new(to_ring(&rect.to_polygon()), vec![])
}

impl Region {
    pub fn new() -> Self {
        Self {
            inner: MultiPolygon::new(vec![]),
        }
    }

    pub fn from_polygon(poly: &Polygon) -> Self {
        if poly.len() < 3 {
            return Self::new();
        }
        let single = MultiPolygon::new(vec![geo::Polygon::new(to_ring(poly), vec![])]);
        // A self-union normalizes orientation and resolves self-overlaps.
        Self {
            inner: single.union(&MultiPolygon::new(vec![])),
        }
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self::from_polygon(&rect.to_polygon())
    }

    /// The union of all the given polygons.
    pub fn from_polygons<'a>(polys: impl IntoIterator<Item = &'a Polygon>) -> Self {
        polys
            .into_iter()
            .fold(Self::new(), |acc, p| acc.union(&Self::from_polygon(p)))
    }

    pub fn boolean(&self, other: &Region, op: BooleanOp) -> Region {
        let inner = match op {
            BooleanOp::Union => self.inner.union(&other.inner),
            BooleanOp::Difference => self.inner.difference(&other.inner),
            BooleanOp::Intersection => self.inner.intersection(&other.inner),
            BooleanOp::Xor => self.inner.xor(&other.inner),
        };
        Region { inner }
    }

    #[inline]
    pub fn union(&self, other: &Region) -> Region {
        self.boolean(other, BooleanOp::Union)
    }

    #[inline]
    pub fn difference(&self, other: &Region) -> Region {
        self.boolean(other, BooleanOp::Difference)
    }

    #[inline]
    pub fn intersection(&self, other: &Region) -> Region {
        self.boolean(other, BooleanOp::Intersection)
    }

    #[inline]
    pub fn xor(&self, other: &Region) -> Region {
        self.boolean(other, BooleanOp::Xor)
    }

    /// Grows (`distance > 0`) or shrinks (`distance < 0`) the region.
    pub fn offset(&self, distance: f64) -> Region {
        if distance == 0.0 || self.is_empty() {
            return self.clone();
        }
        Region {
            inner: self.inner.buffer(distance),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.0.is_empty()
    }

    pub fn area(&self) -> f64 {
        self.inner.unsigned_area()
    }

    pub fn bbox(&self) -> Option<Rect> {
        self.inner
            .bounding_rect()
            .map(|r| Rect::new(Point::new(r.min().x, r.min().y), Point::new(r.max().x, r.max().y)))
    }

    /// The number of holes across all polygons in the region.
    pub fn num_holes(&self) -> usize {
        self.inner.0.iter().map(|p| p.interiors().len()).sum()
    }

    /// Converts the region into simple polygons with no holes.
    pub fn polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        for poly in self.inner.0.iter() {
            fracture(poly, poly.interiors().len(), &mut out);
        }
        out
    }
}

/// The two halves of `bbox`, grown by a margin, on either side of a cut.
fn halves(bbox: &geo::Rect<f64>, cut: f64, vertical: bool) -> [Rect; 2] {
    let lo = Point::new(bbox.min().x - 1.0, bbox.min().y - 1.0);
    let hi = Point::new(bbox.max().x + 1.0, bbox.max().y + 1.0);
    if vertical {
        [
            Rect::new(lo, Point::new(cut, hi.y)),
            Rect::new(Point::new(cut, lo.y), hi),
        ]
    } else {
        [
            Rect::new(lo, Point::new(hi.x, cut)),
            Rect::new(Point::new(lo.x, cut), hi),
        ]
    }
}

/// Splits `poly` with a vertical cut through its first hole until no holes remain.
///
/// Every cut opens at least the hole it passes through, so `budget` starts
/// at the hole count and only runs out on degenerate input.
fn fracture(poly: &geo::Polygon<f64>, budget: usize, out: &mut Vec<Polygon>) {
    if poly.interiors().is_empty() {
        out.push(from_ring(poly.exterior()));
        return;
    }
    if budget == 0 {
        warn!(
            "could not fracture a polygon; filling its {} remaining holes",
            poly.interiors().len()
        );
        out.push(from_ring(poly.exterior()));
        return;
    }
    let (Some(outer), Some(hole)) = (
        poly.exterior().bounding_rect(),
        poly.interiors()[0].bounding_rect(),
    ) else {
        return;
    };
    let cut = (hole.min().x + hole.max().x) / 2.0;
    let whole = MultiPolygon::new(vec![poly.clone()]);
    for half in halves(&outer, cut, true).iter() {
        let piece = whole.intersection(&MultiPolygon::new(vec![geo_rect(half)]));
        for p in piece.0.iter() {
            fracture(p, budget - 1, out);
        }
    }
}

/// Cuts `poly` into pieces of at most `max_points` vertices each.
///
/// Cuts run across the longer side of the bounding box at the median
/// vertex, so each piece keeps roughly half the vertices.
pub fn split_polygon(poly: &Polygon, max_points: usize) -> Vec<Polygon> {
    let mut out = Vec::new();
    split_into(poly, max_points, 0, &mut out);
    out
}

fn split_into(poly: &Polygon, max_points: usize, depth: usize, out: &mut Vec<Polygon>) {
    if poly.len() <= max_points {
        out.push(poly.clone());
        return;
    }
    if depth >= MAX_SPLIT_DEPTH {
        warn!(
            "could not split a {}-vertex polygon below {max_points} vertices",
            poly.len()
        );
        out.push(poly.clone());
        return;
    }
    let ring = to_ring(poly);
    let Some(bbox) = ring.bounding_rect() else {
        return;
    };
    let vertical = bbox.width() >= bbox.height();
    let (min, max) = if vertical {
        (bbox.min().x, bbox.max().x)
    } else {
        (bbox.min().y, bbox.max().y)
    };
    let mut coords: Vec<f64> = poly
        .points
        .iter()
        .map(|p| if vertical { p.x } else { p.y })
        .collect();
    coords.sort_by(f64::total_cmp);
    let median = coords[coords.len() / 2];
    let cut = if median > min && median < max {
        median
    } else {
        (min + max) / 2.0
    };

    let whole = Region::from_polygon(poly);
    for half in halves(&bbox, cut, vertical).iter() {
        for piece in whole.intersection(&Region::from_rect(half)).polygons() {
            split_into(&piece, max_points, depth + 1, out);
        }
    }
}

impl From<Rect> for Region {
    fn from(value: Rect) -> Self {
        Region::from_rect(&value)
    }
}

impl From<&Polygon> for Region {
    fn from(value: &Polygon) -> Self {
        Region::from_polygon(value)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Region {
        Region::from_rect(&Rect::new(Point::new(x, y), Point::new(x + size, y + size)))
    }

    #[test]
    fn union_of_overlapping_squares() {
        let r = square(0.0, 0.0, 2.0).union(&square(1.0, 1.0, 2.0));
        assert_relative_eq!(r.area(), 7.0, epsilon = 1e-6);
        assert_eq!(r.polygons().len(), 1);
    }

    #[test]
    fn difference_and_intersection() {
        let a = square(0.0, 0.0, 4.0);
        let b = square(2.0, 0.0, 4.0);
        assert_relative_eq!(a.difference(&b).area(), 8.0, epsilon = 1e-6);
        assert_relative_eq!(a.intersection(&b).area(), 8.0, epsilon = 1e-6);
        assert_relative_eq!(a.xor(&b).area(), 16.0, epsilon = 1e-6);
    }

    #[test]
    fn fractures_holes() {
        let ring = square(0.0, 0.0, 10.0).difference(&square(4.0, 4.0, 2.0));
        assert_eq!(ring.num_holes(), 1);
        let polys = ring.polygons();
        assert!(polys.len() >= 2);
        let total: f64 = polys.iter().map(|p| p.area()).sum();
        assert_relative_eq!(total, 96.0, epsilon = 1e-6);
    }

    #[test]
    fn fractures_many_staggered_holes() {
        // Each hole sits alone in its column, so every cut opens only one.
        let n = 80;
        let size = 2.0 * n as f64 + 2.0;
        let mut r = square(0.0, 0.0, size);
        for i in 0..n {
            let at = 1.0 + 2.0 * i as f64;
            r = r.difference(&square(at, at, 0.5));
        }
        assert_eq!(r.num_holes(), n);
        let polys = r.polygons();
        let total: f64 = polys.iter().map(|p| p.area()).sum();
        assert_relative_eq!(total, size * size - 0.25 * n as f64, max_relative = 1e-4);
    }

    #[test]
    fn splits_long_polygons() {
        let n = 5000;
        let top = (0..=n).map(|i| Point::new(i as f64 * 0.1, 1.0 + (i % 2) as f64 * 0.01));
        let bottom = (0..=n).rev().map(|i| Point::new(i as f64 * 0.1, -1.0));
        let poly = Polygon::new(top.chain(bottom).collect());
        assert!(poly.len() > 10000);

        let pieces = split_polygon(&poly, 1000);
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|p| p.len() <= 1000));
        let total: f64 = pieces.iter().map(|p| p.area()).sum();
        assert_relative_eq!(total, poly.area(), max_relative = 1e-4);

        let small = Rect::from_size(1.0, 1.0).to_polygon();
        assert_eq!(split_polygon(&small, 1000), vec![small]);
    }

    #[test]
    fn offset_grows_and_shrinks() {
        let r = square(0.0, 0.0, 10.0);
        let grown = r.offset(1.0);
        let bbox = grown.bbox().unwrap();
        assert_relative_eq!(bbox.width(), 12.0, epsilon = 1e-6);
        assert!(grown.area() > 100.0);
        let shrunk = r.offset(-1.0);
        assert_relative_eq!(shrunk.area(), 64.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_polygons_are_empty() {
        let line = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        assert!(Region::from_polygon(&line).is_empty());
        assert!(Region::new().bbox().is_none());
    }
}
