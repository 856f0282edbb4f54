use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::circuits::{snspd_ntron, SnspdNtronParams};
use crate::devices::{
    htron, nmem, ntron, snspd, snspd_vertical, HtronParams, NmemParams, NtronParams, SnspdParams,
};
use crate::die::{DieParams, PadCounts};
use crate::layout::{Cell, Layer, Layers};
use crate::test_structures::{
    alignment_mark, etch_test, resolution_test, vdp, AlignmentParams, EtchParams,
    ResolutionParams, VdpParams,
};

/// A complete chip design, as read from a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignConfig {
    pub name: String,
    #[serde(default)]
    pub layers: Layers,
    #[serde(default)]
    pub chip: ChipConfig,
    /// Parameters shared by every die.
    #[serde(default)]
    pub die: DieParams,
    #[serde(default)]
    pub dies: Vec<DieConfig>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    pub num_dies: (usize, usize),
    pub dicing_width: f64,
    pub annotations: bool,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            num_dies: (4, 4),
            dicing_width: 100.0,
            annotations: true,
        }
    }
}

/// One die and the device it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DieConfig {
    pub label: String,
    /// Fixed `(col, row)` position; dies without one fill the free slots.
    #[serde(default)]
    pub at: Option<(usize, usize)>,
    /// Overrides the design-wide pad counts.
    #[serde(default)]
    pub pads: Option<PadCounts>,
    /// Overrides the design-wide device area.
    #[serde(default)]
    pub device_max_size: Option<(f64, f64)>,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceConfig {
    Ntron(NtronParams),
    Snspd(SnspdParams),
    SnspdVertical {
        #[serde(default)]
        snspd: SnspdParams,
        lead_w: f64,
    },
    Htron(HtronParams),
    Nmem(NmemParams),
    SnspdNtron(SnspdNtronParams),
    Vdp(VdpParams),
    ResolutionTest(ResolutionParams),
    AlignmentMark {
        #[serde(default)]
        params: AlignmentParams,
        #[serde(default = "default_layer_names")]
        layers: Vec<String>,
    },
    EtchTest {
        #[serde(default)]
        params: EtchParams,
        #[serde(default = "default_layer_names")]
        layers: Vec<String>,
    },
}

fn default_layer_names() -> Vec<String> {
    vec!["device".to_string()]
}

fn resolve_layers(layers: &Layers, names: &[String]) -> Result<Vec<Layer>> {
    names
        .iter()
        .map(|name| {
            layers
                .get(name)
                .ok_or_else(|| anyhow!("unknown layer `{name}`"))
        })
        .collect()
}

impl DeviceConfig {
    /// A short name for the kind of device.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceConfig::Ntron(_) => "ntron",
            DeviceConfig::Snspd(_) => "snspd",
            DeviceConfig::SnspdVertical { .. } => "snspd_vertical",
            DeviceConfig::Htron(_) => "htron",
            DeviceConfig::Nmem(_) => "nmem",
            DeviceConfig::SnspdNtron(_) => "snspd_ntron",
            DeviceConfig::Vdp(_) => "vdp",
            DeviceConfig::ResolutionTest(_) => "resolution_test",
            DeviceConfig::AlignmentMark { .. } => "alignment_mark",
            DeviceConfig::EtchTest { .. } => "etch_test",
        }
    }

    /// Draws the device.
    pub fn build(&self, layers: &Layers) -> Result<Cell> {
        let cell = match self {
            DeviceConfig::Ntron(params) => ntron(params, layers.device)?,
            DeviceConfig::Snspd(params) => snspd(params, layers.device)?,
            DeviceConfig::SnspdVertical { snspd, lead_w } => {
                snspd_vertical(snspd, *lead_w, layers.device)?
            }
            DeviceConfig::Htron(params) => htron(params, layers.device, layers.heater)?,
            DeviceConfig::Nmem(params) => nmem(params, layers.device, layers.heater)?,
            DeviceConfig::SnspdNtron(params) => snspd_ntron(params, layers.device)?,
            DeviceConfig::Vdp(params) => vdp(params, layers.device)?,
            DeviceConfig::ResolutionTest(params) => {
                resolution_test(params, layers.device, layers.label)?
            }
            DeviceConfig::AlignmentMark {
                params,
                layers: names,
            } => alignment_mark(params, &resolve_layers(layers, names)?)?,
            DeviceConfig::EtchTest {
                params,
                layers: names,
            } => etch_test(params, &resolve_layers(layers, names)?, layers.label)?,
        };
        Ok(cell)
    }
}

pub fn parse_design_config(path: impl AsRef<Path>) -> Result<DesignConfig> {
    let contents = fs::read_to_string(path)?;
    let data = toml::from_str(&contents)?;
    Ok(data)
}
