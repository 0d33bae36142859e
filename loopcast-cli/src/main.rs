mod demo;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use loopcast_engine::{Forecaster, PlanEntry, plan_from_json};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "loopcast", version)]
#[command(about = "Forecast mana, time, and level gains for an idle-game action plan")]
struct Args {
    /// Plan file: JSON array of { "action": ..., "count": ... }
    #[arg(long)]
    plan: Option<PathBuf>,

    /// List the demo catalog's action names and exit
    #[arg(long)]
    list_actions: bool,

    /// Starting mana override
    #[arg(long)]
    mana: Option<f64>,

    /// Starting town index
    #[arg(long, default_value_t = 0)]
    town: u8,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json"])]
    report: String,
}

fn load_plan(path: &PathBuf) -> Result<Vec<PlanEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading plan file {}", path.display()))?;
    plan_from_json(&text).with_context(|| format!("parsing plan file {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let catalog = demo::demo_catalog();
    if args.list_actions {
        for name in catalog.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let host = demo::demo_host(args.mana, args.town).context("assembling host context")?;
    let plan = match &args.plan {
        Some(path) => load_plan(path)?,
        None => demo::demo_plan(),
    };

    log::info!("forecasting {} plan entries", plan.len());
    let forecaster = Forecaster::new(catalog, host).context("validating catalog")?;
    let forecast = forecaster.run(&plan);
    log::debug!(
        "forecast complete: {:.1} mana, {:.2}s",
        forecast.total_mana,
        forecast.total_seconds
    );

    match args.report.as_str() {
        "json" => output::write_json(&forecast)?,
        _ => output::write_console(&forecast),
    }

    if !forecast.is_fully_valid() {
        std::process::exit(1);
    }
    Ok(())
}
