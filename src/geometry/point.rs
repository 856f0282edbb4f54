use std::fmt::Display;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A point in layout space, in microns.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// The unit vector pointing at `angle` degrees from the positive x axis.
    pub fn unit(angle: f64) -> Self {
        Self::new(1.0, 0.0).rotate(angle)
    }

    /// Rotates this point counterclockwise about the origin by `angle` degrees.
    ///
    /// Multiples of 90 degrees are computed exactly.
    pub fn rotate(&self, angle: f64) -> Self {
        let a = normalize_angle(angle);
        if a == 0.0 {
            *self
        } else if a == 90.0 {
            Self::new(-self.y, self.x)
        } else if a == 180.0 {
            Self::new(-self.x, -self.y)
        } else if a == 270.0 {
            Self::new(self.y, -self.x)
        } else {
            let (sin, cos) = a.to_radians().sin_cos();
            Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
        }
    }

    /// Rotates this point counterclockwise about `center` by `angle` degrees.
    pub fn rotate_about(&self, angle: f64, center: Point) -> Self {
        (*self - center).rotate(angle) + center
    }

    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).norm()
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Rounds both coordinates to the nearest multiple of `grid`.
    pub fn snap(&self, grid: f64) -> Self {
        Self::new(
            (self.x / grid).round() * grid,
            (self.y / grid).round() * grid,
        )
    }

    pub fn midpoint(&self, other: Point) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Maps an angle in degrees onto `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // Guard against -1e-15 mapping to 360.0.
    if (360.0 - a).abs() < 1e-9 || a.abs() < 1e-9 {
        0.0
    } else {
        a
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from(value: (f64, f64)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn quarter_turns_are_exact() {
        let p = Point::new(3.0, 1.0);
        assert_eq!(p.rotate(90.0), Point::new(-1.0, 3.0));
        assert_eq!(p.rotate(-90.0), Point::new(1.0, -3.0));
        assert_eq!(p.rotate(540.0), Point::new(-3.0, -1.0));
    }

    #[test]
    fn arbitrary_rotation() {
        let p = Point::new(1.0, 0.0).rotate(45.0);
        assert_relative_eq!(p.x, 0.5f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn rotate_about_center() {
        let p = Point::new(2.0, 1.0).rotate_about(180.0, Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(0.0, 1.0));
    }

    #[test]
    fn angles_normalize() {
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(normalize_angle(-1e-12), 0.0);
    }

    #[test]
    fn snapping() {
        let p = Point::new(0.0014, -0.0016).snap(0.001);
        assert_relative_eq!(p.x, 0.001);
        assert_relative_eq!(p.y, -0.002);
    }
}
