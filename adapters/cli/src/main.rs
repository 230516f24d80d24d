#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Crystal Siege session.

mod config;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::{Overrides, SessionConfig},
    session::Session,
};

/// Runs the Crystal Siege simulation without a renderer.
#[derive(Debug, Parser)]
#[command(name = "crystal-siege", version, long_about = None)]
struct Cli {
    /// Session configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run.
    #[arg(long)]
    seconds: Option<f32>,

    /// Milliseconds per frame.
    #[arg(long = "tick-ms")]
    tick_ms: Option<u64>,

    /// Seed for the world and the spawn director.
    #[arg(long)]
    seed: Option<u64>,
}

/// Entry point for the Crystal Siege command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = SessionConfig::load(cli.config.as_deref())?;
    config.apply(Overrides {
        seconds: cli.seconds,
        tick_ms: cli.tick_ms,
        seed: cli.seed,
    });

    let summary = Session::new(config)?.run()?;
    info!(
        killed = summary.killed,
        structures = summary.structures_created,
        champions = summary.champions,
        "session finished"
    );
    println!("{summary}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
