//! A traffic micro-simulation exposed as a single-agent reinforcement
//! learning environment.
//!
//! [`traffic::TrafficEnv`] owns one [`engine::SimulationEngine`] session,
//! steps it one tick per action, and returns a fixed-length observation, a
//! mean-speed reward and the engine's termination flag.

pub mod config;
pub mod engine;
pub mod env;
pub mod runtime;
pub mod traffic;

#[cfg(feature = "python")]
pub mod python;

pub use config::{ActionPolicy, EngineConfig, EnvConfig, ScenarioConfig};
pub use env::{Action, Env, EnvError};
pub use traffic::TrafficEnv;
