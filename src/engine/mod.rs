//! The simulation engine abstraction.
//!
//! The scenario runner never schedules events, models radio propagation,
//! or times a MAC layer itself. All of that lives behind the traits in
//! this module, implemented by whatever engine a run is pointed at. The
//! interface covers exactly the capabilities a scenario needs: request
//! the MAC and radio layers, initialize, bind debug channels, address
//! nodes, feed noise readings, advance events, and power nodes off.

pub mod stub;

use crate::sink::ChannelSink;

/// Error type for engine-reported failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A node id outside the engine's addressable range was requested.
    NodeNotFound(u32),
    /// `init` ran before the MAC and radio layers were requested.
    LayersNotRequested,
    /// `init` ran twice.
    AlreadyInitialized,
    /// A post-initialization operation ran before `init`.
    NotInitialized,
    /// A debug channel name was registered twice.
    DuplicateChannel(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NodeNotFound(node_id) => write!(f, "Node {} not found", node_id),
            EngineError::LayersNotRequested => {
                write!(f, "MAC and radio layers must be requested before init")
            }
            EngineError::AlreadyInitialized => write!(f, "Engine is already initialized"),
            EngineError::NotInitialized => write!(f, "Engine is not initialized"),
            EngineError::DuplicateChannel(name) => {
                write!(f, "Debug channel '{}' is already registered", name)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Radio channel handle used to build the link topology.
pub trait RadioModel {
    /// Register a directed link from `src` to `dst` with the given gain
    /// in dBm. A symmetric channel takes one call per direction.
    fn add_link(&mut self, src: u32, dst: u32, gain_dbm: f32) -> Result<(), EngineError>;
}

/// Handle to one simulated node.
pub trait NodeHandle {
    /// Schedule this node to boot at the given simulated time.
    fn boot_at(&mut self, time: u64) -> Result<(), EngineError>;

    /// Append one noise trace sample to this node's reading sequence.
    fn add_noise_trace_reading(&mut self, value: i32);

    /// Build the node's noise model from the readings added so far.
    fn create_noise_model(&mut self) -> Result<(), EngineError>;

    /// Remove this node from the simulation. What happens to traffic
    /// already in flight is up to the engine.
    fn power_off(&mut self);
}

/// A discrete-event simulation engine a scenario can be run against.
///
/// Implementations own all node, radio, and timing state; the runner
/// only ever talks to them through this interface. The call order is
/// part of the contract: the MAC and radio layers must be requested
/// before `init`, and every other operation requires `init` to have
/// succeeded.
pub trait SimulationEngine {
    /// Opaque MAC layer handle. Requesting it instantiates the engine's
    /// default MAC layer.
    type Mac;
    /// Radio channel handle.
    type Radio: RadioModel;
    /// Per-node handle.
    type Node: NodeHandle;

    /// Request the MAC layer. Must happen before `init`.
    fn mac(&mut self) -> &mut Self::Mac;

    /// Request the radio channel. Must happen before `init`.
    fn radio(&mut self) -> &mut Self::Radio;

    /// Finalize engine setup. Fails if the layers were not requested
    /// first or if the engine is already initialized.
    fn init(&mut self) -> Result<(), EngineError>;

    /// Bind a named debug channel to a sink. Everything the engine
    /// emits on that channel is written to the sink, interleaved with
    /// the other channels bound to it.
    fn register_channel(&mut self, name: &str, sink: ChannelSink) -> Result<(), EngineError>;

    /// Look up the handle for a node id.
    fn node(&mut self, node_id: u32) -> Result<&mut Self::Node, EngineError>;

    /// Advance the event queue by exactly one event. Returns whether an
    /// event was dispatched.
    fn run_next_event(&mut self) -> Result<bool, EngineError>;
}
