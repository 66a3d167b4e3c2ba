use super::{EngineError, EntityIds, VehicleRecord};
use crate::config::{EngineConfig, ScenarioConfig};

/// The traffic micro-simulator the environment drives.
///
/// Every call may block on the simulator and every error is treated as
/// fatal by the caller. Implementations own their session exclusively.
pub trait SimulationEngine: Send {
    /// Applies scenario parameters before the session starts.
    fn configure(&mut self, scenario: &ScenarioConfig, seed: Option<u64>)
    -> Result<(), EngineError>;

    /// Parses engine startup options, e.g. command-line flags.
    fn apply_options(&mut self, options: &[String]) -> Result<(), EngineError>;

    fn start(&mut self) -> Result<(), EngineError>;

    /// One-time initialization after `start`, e.g. inserting vehicles.
    fn initialize(&mut self) -> Result<(), EngineError>;

    fn entity_ids(&self) -> Result<EntityIds, EngineError>;

    /// Advances the simulation by one tick.
    fn advance(&mut self) -> Result<(), EngineError>;

    fn set_acceleration(&mut self, agent_id: &str, acceleration: f32) -> Result<(), EngineError>;

    /// Per-vehicle records for the current tick, indexed by vehicle slot.
    fn records(&self) -> Result<Vec<VehicleRecord>, EngineError>;

    fn is_terminated(&self) -> Result<bool, EngineError>;

    /// Restarts the episode inside a live session. Engines that cannot do
    /// this return [`EngineError::Unsupported`] and get rebuilt instead.
    fn reset_episode(&mut self, seed: Option<u64>) -> Result<(), EngineError>;

    fn shutdown(&mut self) -> Result<(), EngineError>;
}

/// Creates fresh engine sessions, both at construction and whenever the
/// environment has to rebuild its handle.
pub trait EngineLauncher: Send {
    type Engine: SimulationEngine;

    fn launch(&mut self, config: &EngineConfig) -> Result<Self::Engine, EngineError>;
}

impl<F, E> EngineLauncher for F
where
    F: FnMut(&EngineConfig) -> Result<E, EngineError> + Send,
    E: SimulationEngine,
{
    type Engine = E;

    fn launch(&mut self, config: &EngineConfig) -> Result<E, EngineError> {
        self(config)
    }
}
