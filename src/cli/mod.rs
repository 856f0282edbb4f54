use std::collections::HashSet;
use std::fs::canonicalize;
use std::path::PathBuf;

use clap::Parser;

use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::config::parse_design_config;
use crate::plan::{execute_plan, generate_plan, ExecutePlanParams, TaskKey};
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
 _   _ __        __ ____  _____  _   _ 
| \ | |\ \      / // ___|| ____|| \ | |
|  \| | \ \ /\ / /| |  _ |  _|  |  \| |
| |\  |  \ V  V / | |_| || |___ | |\  |
|_| \_|   \_/\_/   \____||_____||_| \_|

NWGEN v0.1
";

pub fn run() -> Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)?;

    println!("{BANNER}");

    println!("Reading configuration file...\n");
    let config = parse_design_config(&config_path)?;

    println!("Configuration file: {:?}", &config_path);
    println!("Design parameters:");
    println!("\tName: {}", config.name);
    println!(
        "\tDies: {} x {}",
        config.chip.num_dies.0, config.chip.num_dies.1
    );
    println!("\tDie size: {} x {} um", config.die.size.0, config.die.size.1);
    println!("\tDevices: {}", config.dies.len());

    let enabled_tasks = vec![
        (args.svg, TaskKey::RenderLayout),
        (args.map, TaskKey::RenderMap),
    ]
    .into_iter()
    .filter_map(|(a, b)| if a { Some(b) } else { None });

    let tasks = HashSet::from_iter(enabled_tasks);

    let mut ctx = StepContext::new(&tasks);

    let plan = ctx.check(generate_plan(&config))?;
    ctx.finish(TaskKey::GeneratePlan);

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(plan.name.as_str())
    };
    std::fs::create_dir_all(&work_dir)?;
    let work_dir = canonicalize(work_dir)?;

    let res = execute_plan(ExecutePlanParams {
        work_dir: &work_dir,
        plan: &plan,
        tasks: &tasks,
        ctx: Some(&mut ctx),
    });

    ctx.check(res)?;
    println!("Artifacts saved to: {:?}\n", &work_dir);

    Ok(())
}
