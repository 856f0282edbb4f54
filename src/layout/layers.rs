use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A GDSII layer/datatype pair.
#[derive(
    Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Layer {
    pub layer: i16,
    #[serde(default)]
    pub datatype: i16,
}

impl Layer {
    #[inline]
    pub const fn new(layer: i16, datatype: i16) -> Self {
        Self { layer, datatype }
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.layer, self.datatype)
    }
}

impl From<(i16, i16)> for Layer {
    fn from(value: (i16, i16)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// The named layers a design draws on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Layers {
    /// Superconducting device film.
    pub device: Layer,
    /// Thick pad metal.
    pub pad: Layer,
    /// Heater metal for hTrons and memory cells.
    pub heater: Layer,
    /// Die borders.
    pub die: Layer,
    /// Die and structure labels.
    pub label: Layer,
    /// Non-fabricated annotations such as die indices.
    pub annotation: Layer,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            device: Layer::new(1, 0),
            pad: Layer::new(2, 0),
            heater: Layer::new(3, 0),
            die: Layer::new(4, 0),
            label: Layer::new(5, 0),
            annotation: Layer::new(99, 0),
        }
    }
}

impl Layers {
    /// Looks up a layer by its field name, such as `"device"`.
    pub fn get(&self, name: &str) -> Option<Layer> {
        match name {
            "device" => Some(self.device),
            "pad" => Some(self.pad),
            "heater" => Some(self.heater),
            "die" => Some(self.die),
            "label" => Some(self.label),
            "annotation" => Some(self.annotation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_layer_tables_fill_defaults() {
        let layers: Layers = toml::from_str("heater = { layer = 7 }").unwrap();
        assert_eq!(layers.heater, Layer::new(7, 0));
        assert_eq!(layers.device, Layers::default().device);
        assert_eq!(format!("{}", layers.annotation), "99/0");
        assert_eq!(layers.get("heater"), Some(Layer::new(7, 0)));
        assert_eq!(layers.get("metal5"), None);
    }
}
