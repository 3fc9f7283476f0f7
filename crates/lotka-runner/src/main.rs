//! Headless runner for the predator/prey simulation.
//!
//! Drives the engine tick by tick and writes one JSON record per tick to
//! stdout for whatever renders or analyses the run.

mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use lotka_core::{AgentView, PopulationCounts, SimulationConfig};
use lotka_world::{Simulation, TickReport};
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lotka-runner", version, about = "Run the predator/prey grid simulation headless")]
struct Cli {
    /// JSON configuration file; missing fields take their defaults
    #[arg(short, long, env = "LOTKA_CONFIG")]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 500)]
    ticks: u64,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Emit every agent each tick instead of population counts
    #[arg(long)]
    snapshots: bool,

    /// Stop as soon as either species dies out
    #[arg(long)]
    stop_on_extinction: bool,

    /// Log as JSON instead of human-readable lines
    #[arg(long, env = "LOTKA_JSON_LOGS")]
    json_logs: bool,
}

impl Cli {
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        Ok(config)
    }
}

/// Full state of the world after a tick
#[derive(Debug, Serialize)]
struct Frame<'a> {
    tick: u64,
    counts: PopulationCounts,
    agents: &'a [AgentView],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_telemetry(cli.json_logs)?;

    let config = cli.simulation_config()?;
    info!(
        width = config.grid_width,
        height = config.grid_height,
        prey = config.initial_prey_count,
        predators = config.initial_predator_count,
        seed = config.seed,
        ticks = cli.ticks,
        "Starting Lotka runner"
    );

    let mut sim = Simulation::initialize(config).context("failed to initialize simulation")?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if cli.snapshots {
        write_frame(&mut out, &sim)?;
    }

    let mut last = None;
    for _ in 0..cli.ticks {
        let report = sim.advance_one_tick();

        if cli.snapshots {
            write_frame(&mut out, &sim)?;
        } else {
            write_report(&mut out, &report)?;
        }

        let extinct = sim.is_extinct();
        last = Some(report);
        if cli.stop_on_extinction && extinct {
            info!(tick = sim.tick(), "Stopping early: a species died out");
            break;
        }
    }

    out.flush().context("failed to flush output")?;

    let counts = last.map(|report| report.counts).unwrap_or_else(|| sim.counts());
    info!(
        event = "run_complete",
        final_tick = sim.tick(),
        prey = counts.prey,
        predators = counts.predators,
        "Run complete"
    );

    Ok(())
}

fn write_report(out: &mut impl Write, report: &TickReport) -> Result<()> {
    serde_json::to_writer(&mut *out, report).context("failed to encode tick report")?;
    writeln!(out)?;
    Ok(())
}

fn write_frame(out: &mut impl Write, sim: &Simulation) -> Result<()> {
    let agents = sim.snapshot();
    let frame = Frame {
        tick: sim.tick(),
        counts: sim.counts(),
        agents: &agents,
    };
    serde_json::to_writer(&mut *out, &frame).context("failed to encode frame")?;
    writeln!(out)?;
    Ok(())
}
