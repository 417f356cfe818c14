#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs headless capture-the-flag matches.

mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use ctf_world::{generation, GridMap, World, WorldConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs an AI-only capture-the-flag match and prints the final scores.
#[derive(Debug, Parser)]
#[command(name = "ctf", version, about)]
struct Cli {
    /// Map file to play on.
    #[arg(long, conflicts_with = "generate")]
    map: Option<PathBuf>,
    /// Play on a randomly generated map instead of a file.
    #[arg(long)]
    generate: bool,
    /// Width of a generated map.
    #[arg(long, default_value_t = 16)]
    width: u32,
    /// Height of a generated map.
    #[arg(long, default_value_t = 12)]
    height: u32,
    /// Number of tanks on a generated map.
    #[arg(long, default_value_t = 2)]
    tanks: usize,
    /// Seed for map generation.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 3000)]
    ticks: u64,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 20)]
    tick_ms: u64,
    /// TOML file overriding the world configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WorldConfig::load(path)
            .with_context(|| format!("failed to load world config from {}", path.display()))?,
        None => WorldConfig::default(),
    };

    let map = match (&cli.map, cli.generate) {
        (Some(path), _) => GridMap::load(path)
            .with_context(|| format!("failed to load map from {}", path.display()))?,
        (None, true) => generation::generate(cli.width, cli.height, cli.tanks, cli.seed)
            .context("failed to generate map")?,
        (None, false) => bail!("either --map or --generate is required"),
    };

    info!(
        width = map.width(),
        height = map.height(),
        tanks = map.tank_starts().len(),
        ticks = cli.ticks,
        "starting match"
    );

    let mut world = World::new(map, config);
    let report = simulation::run_match(
        &mut world,
        cli.ticks,
        Duration::from_millis(cli.tick_ms),
    );

    if cli.json {
        let encoded =
            serde_json::to_string_pretty(&report).context("failed to encode match report")?;
        println!("{encoded}");
    } else {
        println!(
            "{} ticks, {} captures, {} shots, {} tanks destroyed, {} boxes destroyed",
            report.ticks,
            report.captures,
            report.shots,
            report.tanks_destroyed,
            report.boxes_destroyed
        );
        for entry in &report.scores {
            println!("tank {}: {}", entry.tank, entry.score);
        }
    }

    Ok(())
}
