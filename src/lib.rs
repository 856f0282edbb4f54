//! Parametric layouts for superconducting nanowire devices, from single
//! devices up to diced chips, written out as GDSII.

pub use anyhow::{anyhow, Result};

pub mod chip;
pub mod circuits;
pub mod cli;
pub mod config;
pub mod devices;
pub mod die;
pub mod geometry;
pub mod layout;
pub mod paths;
pub mod plan;
pub mod route;
pub mod shapes;
pub mod test_structures;

pub const BUILD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

#[cfg(test)]
pub mod tests {
    use std::path::PathBuf;

    use super::BUILD_PATH;

    pub(crate) fn test_work_dir(name: &str) -> PathBuf {
        PathBuf::from(BUILD_PATH).join(name)
    }
}
