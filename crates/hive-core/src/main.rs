//! Combat Bees headless runner
//!
//! Loads the arena configuration, runs the simulation for a fixed number of
//! ticks and optionally writes population statistics as JSONL.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use hive_core::config::{SimConfig, DEFAULT_CONFIG_PATH};
use hive_core::output::StatsWriter;
use hive_core::{SimError, Simulation};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "combat_bees")]
#[command(about = "Headless Combat Bees arena simulation")]
struct Args {
    /// TOML tuning file (defaults to ./combat_bees.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,

    /// Write statistics samples to this JSONL file
    #[arg(long)]
    stats_out: Option<PathBuf>,

    /// Ticks between statistics samples
    #[arg(long)]
    stats_interval: Option<u64>,
}

fn load_config(args: &Args) -> Result<SimConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::load_or_default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.ticks = ticks;
    }
    if let Some(interval) = args.stats_interval {
        config.simulation.stats_interval = interval;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), SimError> {
    let config = load_config(&args)?;
    let ticks = config.simulation.ticks;
    let interval = config.simulation.stats_interval.max(1);

    let mut sim = Simulation::new(&config)?;
    let mut writer = args.stats_out.as_ref().map(StatsWriter::create).transpose()?;

    tracing::info!(
        seed = config.simulation.seed,
        ticks,
        config = %args.config.as_deref().map_or(DEFAULT_CONFIG_PATH.into(), |p| p.display().to_string()),
        "Starting run"
    );
    let started = Instant::now();

    for _ in 0..ticks {
        sim.tick()?;
        if sim.ticks_completed() % interval == 0 {
            let stats = sim.stats();
            tracing::info!(
                tick = stats.tick,
                blue = stats.live_bees[0],
                yellow = stats.live_bees[1],
                dead = stats.dead_bees,
                stacked = stats.resources_stacked,
                held = stats.resources_held,
                kills = stats.kills,
                deliveries = stats.deliveries,
                "Population"
            );
            if let Some(writer) = writer.as_mut() {
                writer.write(&stats)?;
            }
        }
    }

    if let Some(mut writer) = writer {
        writer.flush()?;
        tracing::info!(samples = writer.samples(), "Wrote statistics");
    }

    let elapsed = started.elapsed();
    tracing::info!(
        ticks,
        seconds = elapsed.as_secs_f64(),
        ticks_per_second = ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        "Run complete"
    );
    Ok(())
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Simulation halted");
            ExitCode::FAILURE
        }
    }
}
