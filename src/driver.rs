//! The scenario driver.
//!
//! Runs one scenario against an engine as a fixed linear sequence:
//! request the MAC and radio layers, initialize, bind the debug
//! channels, print the node couples, boot the nodes, build the link
//! topology, feed the noise trace, run phase one, power off the
//! configured node, run phase two. Every failure is fatal and aborts
//! the run where it happened; there is no retry and no partial
//! completion.

use log::info;

use crate::engine::{EngineError, NodeHandle, RadioModel, SimulationEngine};
use crate::noise::{NoiseTraceError, load_noise_trace};
use crate::scenario::{Scenario, ScenarioLoadError, couple_nodes, validate_scenario};
use crate::sink::ChannelSink;

/// Error type for a failed scenario run.
#[derive(Debug)]
pub enum DriverError {
    Scenario(ScenarioLoadError),
    Trace(NoiseTraceError),
    Engine(EngineError),
    Sink(String),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Scenario(e) => write!(f, "Scenario error: {}", e),
            DriverError::Trace(e) => write!(f, "Noise trace error: {}", e),
            DriverError::Engine(e) => write!(f, "Engine error: {}", e),
            DriverError::Sink(msg) => write!(f, "Simulation log error: {}", msg),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<ScenarioLoadError> for DriverError {
    fn from(e: ScenarioLoadError) -> Self {
        DriverError::Scenario(e)
    }
}

impl From<NoiseTraceError> for DriverError {
    fn from(e: NoiseTraceError) -> Self {
        DriverError::Trace(e)
    }
}

impl From<EngineError> for DriverError {
    fn from(e: EngineError) -> Self {
        DriverError::Engine(e)
    }
}

/// Counters gathered over a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub nodes: usize,
    pub links_created: usize,
    pub trace_readings: usize,
    pub events_phase_one: u64,
    pub events_phase_two: u64,
    pub powered_off: Option<u32>,
}

impl RunSummary {
    /// Events advanced across both phases.
    pub fn events_total(&self) -> u64 {
        self.events_phase_one + self.events_phase_two
    }
}

/// Run one scenario against an engine, start to finish.
///
/// The scenario is validated up front, so an engine never sees a
/// configuration the loader would have rejected. The simulation log is
/// opened before the channels are bound and flushed when the run
/// completes; on an early abort the sink closes when it goes out of
/// scope, so the log file is released on every path.
pub fn run_scenario<E: SimulationEngine>(
    engine: &mut E,
    scenario: &Scenario,
) -> Result<RunSummary, DriverError> {
    validate_scenario(scenario)
        .map_err(|e| DriverError::Scenario(ScenarioLoadError::ValidationError(e)))?;

    // Layer handles must be requested before init.
    info!("Initializing MAC layer");
    engine.mac();
    info!("Initializing radio channels");
    engine.radio();
    info!("Initializing engine");
    engine.init()?;

    let sink = ChannelSink::file(&scenario.log_path)
        .map_err(|e| DriverError::Sink(format!("{}: {}", scenario.log_path.display(), e)))?;
    for name in &scenario.channels {
        info!("Activating debug messages on channel {}", name);
        engine.register_channel(name, sink.clone())?;
    }

    // Informational only, nothing below consumes the grouping.
    let couples = couple_nodes(&scenario.nodes);
    info!("Creating the following couples of nodes:");
    for group in &couples {
        info!("  {:?}", group);
    }

    for &node_id in &scenario.nodes {
        engine.node(node_id)?.boot_at(scenario.boot_time)?;
    }

    info!("Creating radio channels (all nodes in range of each other)");
    let mut links_created = 0usize;
    let radio = engine.radio();
    for &src in &scenario.nodes {
        for &dst in &scenario.nodes {
            if src != dst {
                radio.add_link(src, dst, scenario.link_gain_dbm)?;
                links_created += 1;
            }
        }
    }

    // Every node receives the full trace in file order, reading by
    // reading, before any noise model is built.
    info!("Reading noise trace: {}", scenario.noise_trace.display());
    let readings = load_noise_trace(&scenario.noise_trace)?;
    for &value in &readings {
        for &node_id in &scenario.nodes {
            engine.node(node_id)?.add_noise_trace_reading(value);
        }
    }
    for &node_id in &scenario.nodes {
        info!("Creating noise model for node {}", node_id);
        engine.node(node_id)?.create_noise_model()?;
    }

    info!(
        "Starting simulation, phase one with {} events",
        scenario.phase_one_events
    );
    let mut events_phase_one = 0u64;
    for _ in 0..scenario.phase_one_events {
        engine.run_next_event()?;
        events_phase_one += 1;
    }

    if let Some(target) = scenario.power_off_node {
        info!("Turning off node {}", target);
        engine.node(target)?.power_off();
    }

    info!(
        "Resuming simulation, phase two with {} events",
        scenario.phase_two_events
    );
    let mut events_phase_two = 0u64;
    for _ in 0..scenario.phase_two_events {
        engine.run_next_event()?;
        events_phase_two += 1;
    }

    sink.flush().map_err(|e| DriverError::Sink(e.to_string()))?;
    info!("Simulation finished");

    Ok(RunSummary {
        nodes: scenario.nodes.len(),
        links_created,
        trace_readings: readings.len(),
        events_phase_one,
        events_phase_two,
        powered_off: scenario.power_off_node,
    })
}
