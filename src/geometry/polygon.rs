use serde::{Deserialize, Serialize};

use super::point::Point;
use super::rect::Rect;
use super::transform::Transform;

/// A simple polygon, stored as an open ring of vertices.
///
/// The first vertex is not repeated at the end.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bbox(&self) -> Option<Rect> {
        Rect::bounding(self.points.iter().copied())
    }

    /// Twice the signed area; positive for counterclockwise rings.
    fn signed_area2(&self) -> f64 {
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum()
    }

    pub fn area(&self) -> f64 {
        self.signed_area2().abs() / 2.0
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area2() > 0.0
    }

    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    pub fn transform(&self, t: &Transform) -> Self {
        Self {
            points: self.points.iter().map(|p| t.apply(*p)).collect(),
        }
    }

    pub fn translate(&self, by: Point) -> Self {
        Self {
            points: self.points.iter().map(|p| *p + by).collect(),
        }
    }
}

impl From<Rect> for Polygon {
    fn from(value: Rect) -> Self {
        value.to_polygon()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn drops_closing_vertex() {
        let p = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(p.len(), 3);
        assert_relative_eq!(p.area(), 0.5);
        assert!(p.is_ccw());
        assert!(!p.reversed().is_ccw());
    }

    #[test]
    fn transform_keeps_area() {
        let p = Rect::from_size(2.0, 3.0).to_polygon();
        let t = Transform::rotate(30.0).then(&Transform::translate(Point::new(5.0, 5.0)));
        assert_relative_eq!(p.transform(&t).area(), 6.0, epsilon = 1e-6);
    }
}
