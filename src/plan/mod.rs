use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use log::{info, warn};
use serde::Serialize;

use crate::chip::{create_chip, ChipParams};
use crate::cli::progress::StepContext;
use crate::config::{DesignConfig, DeviceConfig};
use crate::die::{die_with_device, DieParams};
use crate::layout::{write_svg, Cell, Layers};
use crate::paths::{out_gds, out_json, out_map, out_svg};
use crate::Result;

/// Width in pixels of the rendered layout preview.
const PREVIEW_WIDTH_PX: u32 = 2000;

/// A validated design, ready to be drawn.
#[derive(Debug, Clone)]
pub struct DesignPlan {
    pub name: String,
    pub layers: Layers,
    pub chip: ChipParams,
    pub dies: Vec<DiePlan>,
}

#[derive(Debug, Clone)]
pub struct DiePlan {
    pub label: String,
    pub at: Option<(usize, usize)>,
    pub params: DieParams,
    pub device: DeviceConfig,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TaskKey {
    GeneratePlan,
    GenerateDies,
    PlaceDies,
    WriteGds,
    RenderLayout,
    RenderMap,
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a DesignPlan,
    pub tasks: &'a HashSet<TaskKey>,
    pub ctx: Option<&'a mut StepContext>,
}

/// Where each die ended up, written next to the GDS file.
#[derive(Debug, Serialize)]
struct PlacementReport<'a> {
    name: &'a str,
    num_dies: (usize, usize),
    die_size: (f64, f64),
    dies: Vec<PlacedDie<'a>>,
}

#[derive(Debug, Serialize)]
struct PlacedDie<'a> {
    label: &'a str,
    device: &'static str,
    col: usize,
    row: usize,
}

pub fn generate_plan(config: &DesignConfig) -> Result<DesignPlan> {
    if config.dies.is_empty() {
        bail!("Design `{}` has no dies", config.name);
    }

    let chip = ChipParams::builder()
        .name(config.name.as_str())
        .num_dies(config.chip.num_dies)
        .die_size(config.die.size)
        .dicing_width(config.chip.dicing_width)
        .annotations(config.chip.annotations)
        .build()?;
    chip.validate()?;

    let (nx, ny) = chip.num_dies;
    if config.dies.len() > nx * ny {
        bail!(
            "{} dies do not fit on a {nx} x {ny} chip",
            config.dies.len()
        );
    }

    let mut labels = HashSet::new();
    let mut positions = HashSet::new();
    let mut dies = Vec::with_capacity(config.dies.len());
    for die in config.dies.iter() {
        if die.label.is_empty() {
            bail!("Every die needs a label");
        }
        if !labels.insert(die.label.as_str()) {
            bail!("Die label `{}` is used more than once", die.label);
        }
        if let Some((col, row)) = die.at {
            if col >= nx || row >= ny {
                bail!(
                    "Die `{}` is placed at (col, row) = ({col}, {row}), outside the {nx} x {ny} chip",
                    die.label
                );
            }
            if !positions.insert((col, row)) {
                warn!("more than one die is placed at ({col}, {row})");
            }
        }

        let mut params = config.die.clone();
        params.text = die.label.clone();
        if let Some(pads) = die.pads {
            params.pads = pads;
        }
        if let Some(size) = die.device_max_size {
            params.device_max_size = size;
        }
        params.validate()?;

        dies.push(DiePlan {
            label: die.label.clone(),
            at: die.at,
            params,
            device: die.device.clone(),
        });
    }

    Ok(DesignPlan {
        name: config.name.clone(),
        layers: config.layers,
        chip,
        dies,
    })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

pub fn execute_plan(params: ExecutePlanParams) -> Result<()> {
    let ExecutePlanParams {
        work_dir,
        plan,
        tasks,
        mut ctx,
    } = params;

    std::fs::create_dir_all(work_dir)?;
    let name = plan.name.as_str();

    let mut cells: Vec<Arc<Cell>> = Vec::with_capacity(plan.dies.len());
    for die in plan.dies.iter() {
        info!("generating {} die `{}`", die.device.kind(), die.label);
        let device = die.device.build(&plan.layers)?;
        let cell = die_with_device(&die.params, &plan.layers, &device)?;
        cells.push(cell.finish());
    }
    try_finish_task!(ctx, TaskKey::GenerateDies);

    let mut chip = create_chip(&plan.chip, &plan.layers)?;
    let mut positions = vec![(0, 0); plan.dies.len()];
    let mut floating = Vec::new();
    for (i, (die, cell)) in plan.dies.iter().zip(cells).enumerate() {
        match die.at {
            Some(pos) => {
                chip.place_on_chip(cell, pos)?;
                positions[i] = pos;
            }
            None => floating.push((i, cell)),
        }
    }
    let (indices, floating): (Vec<_>, Vec<_>) = floating.into_iter().unzip();
    let placed = chip.place_remaining_devices(floating, (0, 0))?;
    for (i, pos) in indices.into_iter().zip(placed) {
        positions[i] = pos;
    }
    chip.log_map();
    try_finish_task!(ctx, TaskKey::PlaceDies);

    chip.write_gds(out_gds(work_dir, name))?;
    let report = PlacementReport {
        name,
        num_dies: plan.chip.num_dies,
        die_size: plan.chip.die_size,
        dies: plan
            .dies
            .iter()
            .zip(positions)
            .map(|(die, (col, row))| PlacedDie {
                label: &die.label,
                device: die.device.kind(),
                col,
                row,
            })
            .collect(),
    };
    std::fs::write(out_json(work_dir, name), serde_json::to_string_pretty(&report)?)?;
    try_finish_task!(ctx, TaskKey::WriteGds);

    if tasks.contains(&TaskKey::RenderLayout) {
        write_svg(chip.cell(), out_svg(work_dir, name), PREVIEW_WIDTH_PX)?;
        try_finish_task!(ctx, TaskKey::RenderLayout);
    }

    if tasks.contains(&TaskKey::RenderMap) {
        chip.plot_map(out_map(work_dir, name))?;
        try_finish_task!(ctx, TaskKey::RenderMap);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChipConfig, DieConfig};
    use crate::devices::{NtronParams, SnspdParams};
    use crate::tests::test_work_dir;

    fn die(label: &str, at: Option<(usize, usize)>, device: DeviceConfig) -> DieConfig {
        DieConfig {
            label: label.to_string(),
            at,
            pads: None,
            device_max_size: None,
            device,
        }
    }

    fn design() -> DesignConfig {
        DesignConfig {
            name: "nwgen_plan_test".to_string(),
            layers: Layers::default(),
            chip: ChipConfig {
                num_dies: (2, 2),
                ..Default::default()
            },
            die: DieParams::builder()
                .size((2000.0, 2000.0))
                .pad_size((150.0, 150.0))
                .pad_inset(100.0)
                .contact_w(10.0)
                .text_size(50.0)
                .build()
                .unwrap(),
            dies: vec![
                die("nt", None, DeviceConfig::Ntron(NtronParams::default())),
                die("det", Some((1, 1)), DeviceConfig::Snspd(SnspdParams::default())),
                die("nt2", None, DeviceConfig::Ntron(NtronParams::default())),
            ],
        }
    }

    #[test]
    fn plan_rejects_bad_designs() {
        let mut config = design();
        config.dies[1].at = Some((2, 0));
        assert!(generate_plan(&config).is_err());

        let mut config = design();
        config.dies[2].label = "nt".to_string();
        assert!(generate_plan(&config).is_err());

        let mut config = design();
        config.dies.clear();
        assert!(generate_plan(&config).is_err());

        let mut config = design();
        config.chip.num_dies = (1, 2);
        assert!(generate_plan(&config).is_err());
    }

    #[test]
    fn plan_applies_die_overrides() -> Result<()> {
        let mut config = design();
        config.dies[0].device_max_size = Some((50.0, 50.0));
        let plan = generate_plan(&config)?;
        assert_eq!(plan.chip.die_size, (2000.0, 2000.0));
        assert_eq!(plan.dies[0].params.text, "nt");
        assert_eq!(plan.dies[0].params.device_max_size, (50.0, 50.0));
        assert_eq!(plan.dies[1].params.device_max_size, (100.0, 100.0));
        Ok(())
    }

    #[test]
    fn execute_writes_artifacts() -> Result<()> {
        let plan = generate_plan(&design())?;
        let work_dir = test_work_dir("nwgen_plan_execute");
        let tasks = HashSet::from([TaskKey::RenderMap]);
        execute_plan(ExecutePlanParams {
            work_dir: &work_dir,
            plan: &plan,
            tasks: &tasks,
            ctx: None,
        })?;

        assert!(out_gds(&work_dir, &plan.name).exists());
        assert!(out_map(&work_dir, &plan.name).exists());

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out_json(&work_dir, &plan.name))?)?;
        let dies = report["dies"].as_array().unwrap();
        assert_eq!(dies.len(), 3);
        // Fixed dies are placed first; the rest fill from the bottom-left.
        assert_eq!(dies[0]["col"], 0);
        assert_eq!(dies[0]["row"], 0);
        assert_eq!(dies[1]["col"], 1);
        assert_eq!(dies[1]["row"], 1);
        assert_eq!(dies[2]["col"], 1);
        assert_eq!(dies[2]["row"], 0);
        assert_eq!(dies[2]["device"], "ntron");
        Ok(())
    }
}
