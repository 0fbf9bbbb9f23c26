//! Bookkeeping engine for dry runs and driver tests.
//!
//! `StubEngine` implements the full engine interface with no radio,
//! noise, or MAC model behind it. It records every accepted call in a
//! journal, tracks per-node power state, and dispatches synthetic
//! events: scheduled boots first, in time order, then idle ticks for as
//! long as at least one node is powered on. Assertions about runner
//! behavior are made against the journal and the state accessors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{EngineError, NodeHandle, RadioModel, SimulationEngine};
use crate::sink::ChannelSink;

/// Highest node id the stub can address.
const MAX_ADDRESSABLE_NODE_ID: u32 = 1000;

/// One accepted engine operation, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    MacRequested,
    RadioRequested,
    Init,
    RegisterChannel(String),
    AddLink { src: u32, dst: u32, gain_dbm: f32 },
    BootAt { node_id: u32, time: u64 },
    AddNoiseTraceReading { node_id: u32, value: i32 },
    CreateNoiseModel { node_id: u32 },
    PowerOff { node_id: u32 },
    RunNextEvent,
}

/// Journal shared between the engine and the handles it gives out.
#[derive(Clone, Default)]
struct Journal {
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl Journal {
    fn push(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn snapshot(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// Channel bindings shared between the engine and its node handles.
type ChannelTable = Arc<Mutex<HashMap<String, ChannelSink>>>;

/// Opaque MAC layer handle. The stub has nothing to configure on it.
pub struct StubMac;

/// Radio channel handle recording the link table.
pub struct StubRadio {
    links: Vec<(u32, u32, f32)>,
    journal: Journal,
}

impl RadioModel for StubRadio {
    fn add_link(&mut self, src: u32, dst: u32, gain_dbm: f32) -> Result<(), EngineError> {
        self.journal.push(EngineCall::AddLink { src, dst, gain_dbm });
        self.links.push((src, dst, gain_dbm));
        Ok(())
    }
}

/// Per-node bookkeeping state.
pub struct StubNode {
    node_id: u32,
    boot_time: Option<u64>,
    boot_dispatched: bool,
    powered_on: bool,
    powered_off: bool,
    noise_readings: Vec<i32>,
    noise_model_built: bool,
    journal: Journal,
    channels: ChannelTable,
}

impl StubNode {
    fn new(node_id: u32, journal: Journal, channels: ChannelTable) -> Self {
        Self {
            node_id,
            boot_time: None,
            boot_dispatched: false,
            powered_on: false,
            powered_off: false,
            noise_readings: Vec::new(),
            noise_model_built: false,
            journal,
            channels,
        }
    }

    /// Write one line to a bound debug channel. Lines on unbound
    /// channels are discarded, matching a channel nobody listens to.
    fn emit(&self, channel: &str, line: &str) {
        let channels = self.channels.lock().unwrap();
        if let Some(sink) = channels.get(channel) {
            sink.write_line(&format!("DEBUG ({}): {}", channel, line));
        }
    }
}

impl NodeHandle for StubNode {
    fn boot_at(&mut self, time: u64) -> Result<(), EngineError> {
        self.journal.push(EngineCall::BootAt {
            node_id: self.node_id,
            time,
        });
        self.boot_time = Some(time);
        Ok(())
    }

    fn add_noise_trace_reading(&mut self, value: i32) {
        self.journal.push(EngineCall::AddNoiseTraceReading {
            node_id: self.node_id,
            value,
        });
        self.noise_readings.push(value);
    }

    fn create_noise_model(&mut self) -> Result<(), EngineError> {
        self.journal.push(EngineCall::CreateNoiseModel {
            node_id: self.node_id,
        });
        self.noise_model_built = true;
        Ok(())
    }

    fn power_off(&mut self) {
        self.journal.push(EngineCall::PowerOff {
            node_id: self.node_id,
        });
        self.powered_off = true;
        self.powered_on = false;
        self.emit("boot", &format!("node {} powered off", self.node_id));
    }
}

/// Engine implementation that does pure bookkeeping.
pub struct StubEngine {
    mac: StubMac,
    radio: StubRadio,
    mac_requested: bool,
    radio_requested: bool,
    initialized: bool,
    nodes: HashMap<u32, StubNode>,
    channels: ChannelTable,
    journal: Journal,
    events_dispatched: u64,
}

impl StubEngine {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            mac: StubMac,
            radio: StubRadio {
                links: Vec::new(),
                journal: journal.clone(),
            },
            mac_requested: false,
            radio_requested: false,
            initialized: false,
            nodes: HashMap::new(),
            channels: ChannelTable::default(),
            journal,
            events_dispatched: 0,
        }
    }

    /// Every accepted call so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.snapshot()
    }

    /// The directed link table as built through the radio handle.
    pub fn links(&self) -> &[(u32, u32, f32)] {
        &self.radio.links
    }

    /// Noise readings accumulated for a node, in insertion order.
    pub fn noise_readings(&self, node_id: u32) -> &[i32] {
        self.nodes
            .get(&node_id)
            .map(|node| node.noise_readings.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `create_noise_model` has run for a node.
    pub fn noise_model_built(&self, node_id: u32) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|node| node.noise_model_built)
    }

    /// Whether a node is currently powered on.
    pub fn is_on(&self, node_id: u32) -> bool {
        self.nodes.get(&node_id).is_some_and(|node| node.powered_on)
    }

    /// Ids of the nodes whose boot event has been dispatched, ascending.
    pub fn booted_nodes(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .nodes
            .values()
            .filter(|node| node.boot_dispatched)
            .map(|node| node.node_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Names of the registered debug channels, ascending.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of events actually dispatched, not counting no-op calls.
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine for StubEngine {
    type Mac = StubMac;
    type Radio = StubRadio;
    type Node = StubNode;

    fn mac(&mut self) -> &mut StubMac {
        self.mac_requested = true;
        self.journal.push(EngineCall::MacRequested);
        &mut self.mac
    }

    fn radio(&mut self) -> &mut StubRadio {
        self.radio_requested = true;
        self.journal.push(EngineCall::RadioRequested);
        &mut self.radio
    }

    fn init(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        if !self.mac_requested || !self.radio_requested {
            return Err(EngineError::LayersNotRequested);
        }
        self.initialized = true;
        self.journal.push(EngineCall::Init);
        Ok(())
    }

    fn register_channel(&mut self, name: &str, sink: ChannelSink) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        {
            let mut channels = self.channels.lock().unwrap();
            if channels.contains_key(name) {
                return Err(EngineError::DuplicateChannel(name.to_string()));
            }
            channels.insert(name.to_string(), sink);
        }
        self.journal.push(EngineCall::RegisterChannel(name.to_string()));
        Ok(())
    }

    fn node(&mut self, node_id: u32) -> Result<&mut StubNode, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        if node_id == 0 || node_id > MAX_ADDRESSABLE_NODE_ID {
            return Err(EngineError::NodeNotFound(node_id));
        }
        Ok(self
            .nodes
            .entry(node_id)
            .or_insert_with(|| StubNode::new(node_id, self.journal.clone(), self.channels.clone())))
    }

    fn run_next_event(&mut self) -> Result<bool, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        self.journal.push(EngineCall::RunNextEvent);

        // Scheduled boots dispatch first, earliest time wins, node id
        // breaks ties. A boot for a node powered off in the meantime is
        // consumed without bringing the node up.
        let next_boot = self
            .nodes
            .values()
            .filter(|node| !node.boot_dispatched)
            .filter_map(|node| node.boot_time.map(|time| (time, node.node_id)))
            .min();
        if let Some((time, node_id)) = next_boot {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.boot_dispatched = true;
                if !node.powered_off {
                    node.powered_on = true;
                    node.emit("boot", &format!("node {} booted at time {}", node_id, time));
                }
            }
            self.events_dispatched += 1;
            return Ok(true);
        }

        // With every boot dispatched, the queue degenerates to idle
        // ticks for as long as at least one node is powered on.
        if self.nodes.values().any(|node| node.powered_on) {
            self.events_dispatched += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
