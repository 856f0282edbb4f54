//! Superconducting nanowire device recipes.
//!
//! Every recipe validates its parameters, then returns a [`Cell`](crate::layout::Cell)
//! centered near the origin with named ports for routing.

pub mod htron;
pub mod nmem;
pub mod ntron;
pub mod snspd;

pub use htron::{htron, HeaterKind, HtronParams};
pub use nmem::{nmem, NmemHeater, NmemParams};
pub use ntron::{ntron, ChokeShape, NtronParams};
pub use snspd::{snspd, snspd_vertical, SnspdParams};
