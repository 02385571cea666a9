#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for skirmish scenarios.

mod report;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use skirmish_system_coordinator::Coordinator;
use skirmish_world::{apply, query, World};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{report::Summary, scenario::Scenario};

/// Runs a skirmish scenario without rendering and reports the outcome.
#[derive(Debug, Parser)]
#[command(name = "skirmish", version, about)]
struct Cli {
    /// Path to the TOML scenario file.
    scenario: PathBuf,
    /// Overrides the number of ticks to simulate.
    #[arg(long)]
    ticks: Option<u64>,
    /// Overrides the random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Log filter directive, e.g. `debug` or `skirmish_system_combat=trace`.
    /// Falls back to `RUST_LOG`, then `warn`.
    #[arg(long)]
    log: Option<String>,
    /// Print the final world snapshot as TOML after the summary.
    #[arg(long)]
    snapshot: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let scenario = Scenario::load(&cli.scenario)?;
    let seed = cli.seed.unwrap_or(scenario.seed);
    let ticks = cli.ticks.unwrap_or(scenario.ticks);

    let mut world = World::new();
    let mut coordinator = Coordinator::new(scenario.config.clone(), seed);
    let mut events = Vec::new();
    for command in scenario.commands()? {
        let mut applied = Vec::new();
        apply(&mut world, command, &mut applied);
        coordinator.observe(&applied);
        events.append(&mut applied);
    }
    info!(
        path = %cli.scenario.display(),
        seed,
        ticks,
        units = query::units(&world).len(),
        "scenario loaded"
    );

    for _ in 0..ticks {
        coordinator.step(&mut world, &mut events);
    }

    let summary = Summary::collect(&world, &events);
    let stats = coordinator.pathfinder_stats();
    info!(
        fingerprint = summary.fingerprint(),
        searches = stats.searches,
        cache_hits = stats.cache_hits,
        cache_misses = stats.cache_misses,
        exhausted = stats.exhausted,
        "run complete"
    );
    println!("{summary}");
    println!(
        "paths: {} searches, {} cache hits, {} misses, {} exhausted",
        stats.searches, stats.cache_hits, stats.cache_misses, stats.exhausted
    );

    if cli.snapshot {
        let rendered = toml::to_string_pretty(&query::snapshot(&world))
            .context("serialise final snapshot")?;
        println!("{rendered}");
    }
    Ok(())
}

fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
