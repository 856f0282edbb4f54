//! The layout data model and its exporters.

pub mod cell;
pub mod error;
pub mod gds;
pub mod layers;
pub mod ops;
pub mod plot;
pub mod port;
pub mod tile;

pub use cell::{Cell, Element, Instance, Label};
pub use error::{LayoutError, LayoutResult};
pub use gds::{to_gds_library, write_gds};
pub use layers::{Layer, Layers};
pub use ops::{boolean, invert, outline, union_all};
pub use plot::write_svg;
pub use port::{Port, Side};
pub use tile::{grid_layout, Align};
