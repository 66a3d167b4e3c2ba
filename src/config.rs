use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::env::EnvError;

/// Acceleration bounds for the controlled agent, in m/s².
pub const MIN_ACCELERATION: f32 = -3.0;
pub const MAX_ACCELERATION: f32 = 1.0;

/// Scenario parameters, fixed for the lifetime of an environment and reused
/// verbatim whenever the engine is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub vehicle_count: usize,
    pub agent_count: usize,
    pub route_id: String,
}

impl ScenarioConfig {
    pub fn new(vehicle_count: usize, agent_count: usize, route_id: impl Into<String>) -> Self {
        Self {
            vehicle_count,
            agent_count,
            route_id: route_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        if self.vehicle_count == 0 {
            return Err(EnvError::Config("vehicle_count must be positive".into()));
        }
        if self.route_id.trim().is_empty() {
            return Err(EnvError::Config("route_id must not be empty".into()));
        }
        Ok(())
    }

    /// Length of the observation vector: one `(x, y, speed)` triple per vehicle.
    pub fn observation_len(&self) -> usize {
        3 * self.vehicle_count
    }
}

/// Where and how to start the simulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the simulator project installation.
    pub install_path: Option<PathBuf>,
    /// Startup options handed to the engine, e.g. `["--no-gui"]`.
    #[serde(default)]
    pub options: Vec<String>,
}

impl EngineConfig {
    pub const INSTALL_PATH_VAR: &'static str = "SUMO_PROJECT_PATH";

    pub fn new(install_path: impl Into<PathBuf>) -> Self {
        Self {
            install_path: Some(install_path.into()),
            options: Vec::new(),
        }
    }

    /// Reads the install path from `SUMO_PROJECT_PATH`, if set.
    pub fn from_env() -> Self {
        Self::from_install_var(std::env::var_os(Self::INSTALL_PATH_VAR))
    }

    fn from_install_var(value: Option<OsString>) -> Self {
        Self {
            install_path: value.filter(|v| !v.is_empty()).map(PathBuf::from),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// What to do with an action outside the action space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPolicy {
    /// Fail the step before touching the engine.
    #[default]
    Reject,
    /// Clamp onto the nearest bound.
    Clamp,
    /// Forward unchanged and let the engine decide.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub action_policy: ActionPolicy,
}

impl EnvConfig {
    pub fn new(scenario: ScenarioConfig) -> Self {
        Self {
            scenario,
            engine: EngineConfig::default(),
            action_policy: ActionPolicy::default(),
        }
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_action_policy(mut self, policy: ActionPolicy) -> Self {
        self.action_policy = policy;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, EnvError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EnvError::Config(e.to_string()))?;
        config.scenario.validate()?;
        Ok(config)
    }
}
