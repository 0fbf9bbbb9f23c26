use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, info};
use std::path::PathBuf;

use crate::driver::run_scenario;
use crate::engine::stub::StubEngine;
use crate::scenario::{Scenario, couple_nodes, load_scenario};

mod driver;
mod engine;
mod noise;
mod scenario;
mod sink;

/// Scenario runner for discrete-event wireless-sensor-network simulations
#[derive(Parser, Debug)]
#[command(name = "moterun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a scenario JSON file; the stock two-node out-of-range
    /// scenario is used when omitted
    scenario: Option<PathBuf>,

    /// Validate the scenario and print its node couples without running
    #[arg(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("moterun"), LevelFilter::Debug)
        .init();

    let cli = Cli::parse();

    let scenario = match &cli.scenario {
        Some(path) => load_scenario(path)
            .with_context(|| format!("Failed to load scenario: {}", path.display()))?,
        None => Scenario::default(),
    };

    info!("Starting up with {} nodes", scenario.nodes.len());

    if cli.check {
        info!(
            "Scenario is valid: {} nodes, {} debug channels, {}+{} events",
            scenario.nodes.len(),
            scenario.channels.len(),
            scenario.phase_one_events,
            scenario.phase_two_events
        );
        info!("Couples of nodes:");
        for group in &couple_nodes(&scenario.nodes) {
            info!("  {:?}", group);
        }
        return Ok(());
    }

    let mut engine = StubEngine::new();
    let summary = run_scenario(&mut engine, &scenario)?;

    info!(
        "Run complete: {} nodes, {} links, {} trace readings, {} events ({} dispatched by the engine)",
        summary.nodes,
        summary.links_created,
        summary.trace_readings,
        summary.events_total(),
        engine.events_dispatched()
    );

    Ok(())
}
