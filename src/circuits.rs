//! Devices wired together into small circuits.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::devices::{ntron, snspd, NtronParams, SnspdParams};
use crate::geometry::Point;
use crate::layout::error::{ensure_positive, LayoutResult};
use crate::layout::{Cell, Instance, Layer};
use crate::route::route_manhattan;

/// An SNSPD read out by an nTron.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnspdNtronParams {
    pub snspd: SnspdParams,
    pub ntron: NtronParams,
    /// Horizontal gap between the detector and the nTron gate.
    pub spacing: f64,
}

impl Default for SnspdNtronParams {
    fn default() -> Self {
        Self {
            snspd: SnspdParams::default(),
            ntron: NtronParams::default(),
            spacing: 2.0,
        }
    }
}

/// Places an SNSPD west of an nTron and wires its port `2` to the gate.
///
/// Ports: `snspd` (the free detector terminal), `s` and `d`.
pub fn snspd_ntron(params: &SnspdNtronParams, layer: Layer) -> LayoutResult<Cell> {
    ensure_positive(&[("spacing", params.spacing)])?;
    let mut detector = params.snspd;
    if detector.terminals_same_side {
        warn!(
            "an SNSPD read out by an nTron needs terminals on opposite sides; ignoring `terminals_same_side`"
        );
        detector.terminals_same_side = false;
    }
    let detector = snspd(&detector, layer)?.finish();
    let nt = ntron(&params.ntron, layer)?.finish();

    let mut cell = Cell::new("snspd_ntron");
    let nt_inst = cell.add_instance(Instance::new("ntron", nt)).clone();
    let gate = nt_inst.port("g")?;

    let det_inst = cell.add_instance(Instance::new("snspd", detector));
    let right = det_inst.bbox().map(|b| b.right()).unwrap_or_default();
    det_inst.translate(Point::new(gate.center.x - params.spacing - right, 0.0));
    let det_inst = det_inst.clone();
    let out = det_inst.port("2")?;

    let wire = route_manhattan(&out, &gate, params.ntron.gate_w)?;
    cell.add_region(layer, &wire);

    cell.expose_port(&det_inst, "1", "snspd")?;
    cell.expose_port(&nt_inst, "s", "s")?;
    cell.expose_port(&nt_inst, "d", "d")?;
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const L: Layer = Layer::new(1, 0);

    #[test]
    fn detector_feeds_gate() -> LayoutResult<()> {
        let params = SnspdNtronParams::default();
        let cell = snspd_ntron(&params, L)?;
        assert_eq!(cell.ports().len(), 3);
        let snspd = cell.port("snspd")?;
        assert_eq!(snspd.orientation, 180.0);
        assert!(snspd.center.x < cell.port("s")?.center.x);
        // Detector, wire and nTron form a single conductor.
        assert_eq!(cell.region(L).polygons().len(), 1);
        let bbox = cell.bbox().unwrap();
        assert_relative_eq!(bbox.left(), snspd.center.x, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn same_side_request_is_overridden() -> LayoutResult<()> {
        let mut params = SnspdNtronParams::default();
        params.snspd.terminals_same_side = true;
        let cell = snspd_ntron(&params, L)?;
        assert_eq!(cell.region(L).polygons().len(), 1);
        // The detector's second terminal is consumed by the gate wire.
        assert!(cell.port("snspd")?.center.x < cell.port("s")?.center.x);
        assert_eq!(cell.ports().len(), 3);
        Ok(())
    }
}
