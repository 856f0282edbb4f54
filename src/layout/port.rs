use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::layers::Layer;
use crate::geometry::{normalize_angle, Point, Transform};

/// A connection point on the edge of a shape.
///
/// The port is a line segment of length `width` centered at `center`.
/// `orientation` is the outward normal in degrees: a wire leaving the port
/// travels in that direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: ArcStr,
    pub center: Point,
    pub width: f64,
    pub orientation: f64,
    pub layer: Layer,
}

/// The side of a rectangle a port faces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    /// The outward normal of this side, in degrees.
    pub fn orientation(&self) -> f64 {
        match self {
            Side::East => 0.0,
            Side::North => 90.0,
            Side::West => 180.0,
            Side::South => 270.0,
        }
    }

    pub fn short_form(&self) -> &'static str {
        match self {
            Side::North => "N",
            Side::East => "E",
            Side::South => "S",
            Side::West => "W",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_form())
    }
}

impl Port {
    pub fn new(
        name: impl Into<ArcStr>,
        center: Point,
        width: f64,
        orientation: f64,
        layer: Layer,
    ) -> Self {
        Self {
            name: name.into(),
            center,
            width,
            orientation: normalize_angle(orientation),
            layer,
        }
    }

    /// The outward unit normal.
    #[inline]
    pub fn normal(&self) -> Point {
        Point::unit(self.orientation)
    }

    /// The two ends of the port edge.
    ///
    /// Looking outward along the normal, the first point is on the left.
    pub fn endpoints(&self) -> (Point, Point) {
        let half = Point::unit(self.orientation + 90.0) * (self.width / 2.0);
        (self.center + half, self.center - half)
    }

    pub fn transform(&self, t: &Transform) -> Port {
        Port {
            name: self.name.clone(),
            center: t.apply(self.center),
            width: self.width,
            orientation: t.apply_angle(self.orientation),
            layer: self.layer,
        }
    }

    /// The same port facing the opposite direction.
    pub fn flipped(&self) -> Port {
        Port {
            orientation: normalize_angle(self.orientation + 180.0),
            ..self.clone()
        }
    }

    pub fn with_name(&self, name: impl Into<ArcStr>) -> Port {
        Port {
            name: name.into(),
            ..self.clone()
        }
    }

    /// The side this port faces, rounding to the nearest quarter turn.
    pub fn side(&self) -> Side {
        let quadrant = ((self.orientation + 45.0) / 90.0).floor() as i64;
        match quadrant.rem_euclid(4) {
            0 => Side::East,
            1 => Side::North,
            2 => Side::West,
            _ => Side::South,
        }
    }
}
