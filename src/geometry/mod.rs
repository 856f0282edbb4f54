//! Layout geometry primitives, in microns.

pub mod point;
pub mod polygon;
pub mod rect;
pub mod region;
pub mod transform;

pub use point::{normalize_angle, Point};
pub use polygon::Polygon;
pub use rect::Rect;
pub use region::{split_polygon, BooleanOp, Region};
pub use transform::Transform;

/// The database resolution used when snapping and exporting, in microns.
pub const DB_GRID: f64 = 0.001;
