use serde::{Deserialize, Serialize};

use super::point::Point;
use super::polygon::Polygon;

/// An axis-aligned rectangle.
///
/// `p0` is always the lower-left corner and `p1` the upper-right corner.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}

impl Rect {
    /// Creates a rectangle from any two opposite corners.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            p0: Point::new(a.x.min(b.x), a.y.min(b.y)),
            p1: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// A rectangle of the given size centered at `center`.
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        let half = Point::new(width / 2.0, height / 2.0);
        Self::new(center - half, center + half)
    }

    /// A rectangle of the given size with its lower-left corner at the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(Point::zero(), Point::new(width, height))
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.p1.y - self.p0.y
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.p0.x
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.p1.x
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.p0.y
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.p1.y
    }

    pub fn center(&self) -> Point {
        self.p0.midpoint(self.p1)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// The smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }

    /// Grows the rectangle by `d` on every side. Negative values shrink it.
    pub fn expand(&self, d: f64) -> Rect {
        Rect::new(self.p0 - Point::new(d, d), self.p1 + Point::new(d, d))
    }

    pub fn translate(&self, by: Point) -> Rect {
        Rect {
            p0: self.p0 + by,
            p1: self.p1 + by,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.p0.x && p.x <= self.p1.x && p.y >= self.p0.y && p.y <= self.p1.y
    }

    /// Returns `true` if the interiors of the two rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
    }

    /// The corners in counterclockwise order, starting at the lower left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.p0,
            Point::new(self.p1.x, self.p0.y),
            self.p1,
            Point::new(self.p0.x, self.p1.y),
        ]
    }

    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(self.corners().to_vec())
    }

    /// The bounding box of a set of points, or `None` if there are no points.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Rect::new(first, first), |r, p| {
            r.union(&Rect::new(p, p))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_corners() {
        let r = Rect::new(Point::new(4.0, -1.0), Point::new(-2.0, 3.0));
        assert_eq!(r.p0, Point::new(-2.0, -1.0));
        assert_eq!(r.p1, Point::new(4.0, 3.0));
        assert_eq!(r.width(), 6.0);
        assert_eq!(r.height(), 4.0);
        assert_eq!(r.center(), Point::new(1.0, 1.0));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::from_size(1.0, 1.0);
        let b = a.translate(Point::new(1.0, 0.0));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&b.translate(Point::new(-0.5, 0.5))));
    }

    #[test]
    fn bounding_box_of_points() {
        let pts = [
            Point::new(1.0, 2.0),
            Point::new(-1.0, 5.0),
            Point::new(3.0, 0.0),
        ];
        let r = Rect::bounding(pts).unwrap();
        assert_eq!(r, Rect::new(Point::new(-1.0, 0.0), Point::new(3.0, 5.0)));
        assert!(Rect::bounding(std::iter::empty()).is_none());
    }
}
