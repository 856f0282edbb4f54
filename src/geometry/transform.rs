use serde::{Deserialize, Serialize};

use super::point::{normalize_angle, Point};

/// A rigid transformation: an optional reflection about the x axis, followed
/// by a counterclockwise rotation, followed by a translation.
///
/// This is the transformation model of a GDSII structure reference.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub offset: Point,
    /// Rotation in degrees, normalized to `[0, 360)`.
    pub angle: f64,
    pub reflect: bool,
}

impl Transform {
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn translate(offset: Point) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    pub fn rotate(angle: f64) -> Self {
        Self {
            angle: normalize_angle(angle),
            ..Default::default()
        }
    }

    /// A rotation by `angle` degrees about `center`.
    pub fn rotate_about(angle: f64, center: Point) -> Self {
        Self::translate(-center)
            .then(&Self::rotate(angle))
            .then(&Self::translate(center))
    }

    /// A reflection about the x axis.
    pub fn mirror_x() -> Self {
        Self {
            reflect: true,
            ..Default::default()
        }
    }

    /// Applies only the reflection and rotation.
    pub fn apply_linear(&self, p: Point) -> Point {
        let p = if self.reflect { Point::new(p.x, -p.y) } else { p };
        p.rotate(self.angle)
    }

    pub fn apply(&self, p: Point) -> Point {
        self.apply_linear(p) + self.offset
    }

    /// Maps a direction angle (degrees) through this transform.
    pub fn apply_angle(&self, angle: f64) -> f64 {
        let a = if self.reflect { -angle } else { angle };
        normalize_angle(a + self.angle)
    }

    /// The transform that applies `self` and then `next`.
    pub fn then(&self, next: &Transform) -> Transform {
        let angle = if next.reflect {
            next.angle - self.angle
        } else {
            next.angle + self.angle
        };
        Transform {
            offset: next.apply(self.offset),
            angle: normalize_angle(angle),
            reflect: self.reflect ^ next.reflect,
        }
    }

    pub fn inverse(&self) -> Transform {
        let linear = Transform {
            offset: Point::zero(),
            angle: if self.reflect {
                self.angle
            } else {
                normalize_angle(-self.angle)
            },
            reflect: self.reflect,
        };
        Transform {
            offset: -linear.apply_linear(self.offset),
            ..linear
        }
    }

    pub fn is_identity(&self) -> bool {
        !self.reflect && self.angle == 0.0 && self.offset == Point::zero()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn assert_points_eq(a: Point, b: Point) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-6);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-6);
    }

    #[test]
    fn reflect_then_rotate() {
        let t = Transform {
            offset: Point::new(10.0, 0.0),
            angle: 90.0,
            reflect: true,
        };
        // (1, 2) -> (1, -2) -> (2, 1) -> (12, 1)
        assert_eq!(t.apply(Point::new(1.0, 2.0)), Point::new(12.0, 1.0));
        assert_eq!(t.apply_angle(45.0), 45.0);
    }

    #[test]
    fn composition_matches_sequential_application() {
        let a = Transform {
            offset: Point::new(1.0, -2.0),
            angle: 30.0,
            reflect: true,
        };
        let b = Transform {
            offset: Point::new(-4.0, 0.5),
            angle: 125.0,
            reflect: false,
        };
        let c = Transform::mirror_x().then(&Transform::translate(Point::new(3.0, 3.0)));
        let p = Point::new(0.7, 1.9);
        assert_points_eq(a.then(&b).apply(p), b.apply(a.apply(p)));
        assert_points_eq(b.then(&a).apply(p), a.apply(b.apply(p)));
        assert_points_eq(a.then(&b).then(&c).apply(p), a.then(&b.then(&c)).apply(p));
        assert_relative_eq!(
            a.then(&b).apply_angle(10.0),
            b.apply_angle(a.apply_angle(10.0)),
            epsilon = 1e-6
        );
    }

    #[test]
    fn inverse_round_trips() {
        for reflect in [false, true] {
            let t = Transform {
                offset: Point::new(3.0, -7.0),
                angle: 63.0,
                reflect,
            };
            let p = Point::new(-1.5, 2.25);
            assert_points_eq(t.inverse().apply(t.apply(p)), p);
            assert_points_eq(t.apply(t.inverse().apply(p)), p);
        }
    }

    #[test]
    fn rotate_about_keeps_center() {
        let c = Point::new(5.0, 5.0);
        let t = Transform::rotate_about(90.0, c);
        assert_points_eq(t.apply(c), c);
        assert_points_eq(t.apply(Point::new(6.0, 5.0)), Point::new(5.0, 6.0));
    }
}
