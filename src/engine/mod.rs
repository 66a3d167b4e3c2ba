mod errors;
pub mod scripted;
mod traits;
mod types;

pub use errors::EngineError;
pub use scripted::{CallLog, EngineCall, ScriptedEngine, ScriptedLauncher};
pub use traits::{EngineLauncher, SimulationEngine};
pub use types::{EntityIds, VehicleRecord};
