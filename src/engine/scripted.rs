//! A deterministic in-memory engine.
//!
//! Vehicle `i` starts at `(10 * i, 0)` and moves along x at its current speed
//! every tick. Agents share identifiers with the first vehicles, so setting
//! an agent's acceleration changes that vehicle's speed. The episode ends
//! after a fixed number of ticks.
//!
//! Every collaborator call is appended to a shared [`CallLog`], and any call
//! can be made to fail, which is what the environment tests lean on.

use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{EngineError, EngineLauncher, EntityIds, SimulationEngine, VehicleRecord};
use crate::config::{EngineConfig, ScenarioConfig};

const DT: f32 = 1.0;
const SPACING: f32 = 10.0;
const DEFAULT_SPEED: f32 = 10.0;
const DEFAULT_HORIZON: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Launch,
    Configure,
    ApplyOptions,
    Start,
    Initialize,
    EntityIds,
    Advance,
    SetAcceleration,
    Records,
    IsTerminated,
    ResetEpisode,
    Shutdown,
}

impl EngineCall {
    fn name(self) -> &'static str {
        match self {
            EngineCall::Launch => "launch",
            EngineCall::Configure => "configure",
            EngineCall::ApplyOptions => "apply_options",
            EngineCall::Start => "start",
            EngineCall::Initialize => "initialize",
            EngineCall::EntityIds => "entity_ids",
            EngineCall::Advance => "advance",
            EngineCall::SetAcceleration => "set_acceleration",
            EngineCall::Records => "records",
            EngineCall::IsTerminated => "is_terminated",
            EngineCall::ResetEpisode => "reset_episode",
            EngineCall::Shutdown => "shutdown",
        }
    }
}

/// Shared, clonable record of engine calls across every session launched
/// from the same template.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<EngineCall>>>);

impl CallLog {
    fn push(&self, call: EngineCall) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn count(&self, call: EngineCall) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    initial_speeds: Vec<f32>,
    horizon: u64,
    vehicle_ids: Option<Vec<String>>,
    record_limit: Option<usize>,
    fail_on: Option<EngineCall>,
    episode_reset: bool,
    log: CallLog,

    vehicle_count: usize,
    agent_count: usize,
    options: Vec<String>,
    started: bool,
    tick: u64,
    vehicles: Vec<VehicleRecord>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            initial_speeds: Vec::new(),
            horizon: DEFAULT_HORIZON,
            vehicle_ids: None,
            record_limit: None,
            fail_on: None,
            episode_reset: true,
            log: CallLog::default(),
            vehicle_count: 0,
            agent_count: 0,
            options: Vec::new(),
            started: false,
            tick: 0,
            vehicles: Vec::new(),
        }
    }

    /// Initial speed per vehicle slot. Slots past the end use 10 m/s.
    pub fn with_speeds(mut self, speeds: Vec<f32>) -> Self {
        self.initial_speeds = speeds;
        self
    }

    /// Number of ticks after which the episode reports termination.
    pub fn with_horizon(mut self, ticks: u64) -> Self {
        self.horizon = ticks;
        self
    }

    /// Reports these vehicle identifiers instead of `0..vehicle_count`.
    pub fn with_vehicle_ids(mut self, ids: Vec<String>) -> Self {
        self.vehicle_ids = Some(ids);
        self
    }

    /// Reports at most `limit` per-tick records.
    pub fn with_record_limit(mut self, limit: usize) -> Self {
        self.record_limit = Some(limit);
        self
    }

    /// Makes every invocation of `call` fail.
    pub fn failing_on(mut self, call: EngineCall) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Reports `reset_episode` as unsupported, like a simulator that can
    /// only be restarted from scratch.
    pub fn without_episode_reset(mut self) -> Self {
        self.episode_reset = false;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// A launcher handing out copies of this engine that share its log.
    pub fn launcher(self) -> ScriptedLauncher {
        ScriptedLauncher { template: self }
    }

    fn enter(&self, call: EngineCall) -> Result<(), EngineError> {
        self.log.push(call);
        trace!(call = call.name(), tick = self.tick, "scripted engine call");
        if self.fail_on == Some(call) {
            return Err(EngineError::call(call.name(), "injected failure"));
        }
        Ok(())
    }

    fn ensure_started(&self) -> Result<(), EngineError> {
        if self.started {
            Ok(())
        } else {
            Err(EngineError::NotRunning)
        }
    }

    fn place_vehicles(&mut self) {
        self.tick = 0;
        self.vehicles = (0..self.vehicle_count)
            .map(|i| {
                let speed = self.initial_speeds.get(i).copied().unwrap_or(DEFAULT_SPEED);
                VehicleRecord::new(SPACING * i as f32, 0.0, speed)
            })
            .collect();
    }
}

impl SimulationEngine for ScriptedEngine {
    fn configure(
        &mut self,
        scenario: &ScenarioConfig,
        _seed: Option<u64>,
    ) -> Result<(), EngineError> {
        self.enter(EngineCall::Configure)?;
        self.vehicle_count = scenario.vehicle_count;
        self.agent_count = scenario.agent_count.min(scenario.vehicle_count);
        Ok(())
    }

    fn apply_options(&mut self, options: &[String]) -> Result<(), EngineError> {
        self.enter(EngineCall::ApplyOptions)?;
        self.options = options.to_vec();
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.enter(EngineCall::Start)?;
        self.started = true;
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), EngineError> {
        self.enter(EngineCall::Initialize)?;
        self.ensure_started()?;
        self.place_vehicles();
        Ok(())
    }

    fn entity_ids(&self) -> Result<EntityIds, EngineError> {
        self.enter(EngineCall::EntityIds)?;
        self.ensure_started()?;
        let vehicles = match &self.vehicle_ids {
            Some(ids) => ids.clone(),
            None => (0..self.vehicle_count).map(|i| i.to_string()).collect(),
        };
        let agents = (0..self.agent_count).map(|i| i.to_string()).collect();
        Ok(EntityIds { vehicles, agents })
    }

    fn advance(&mut self) -> Result<(), EngineError> {
        self.enter(EngineCall::Advance)?;
        self.ensure_started()?;
        self.tick += 1;
        for vehicle in &mut self.vehicles {
            if let (Some([x, _]), Some(speed)) = (vehicle.position.as_mut(), vehicle.speed) {
                *x += speed * DT;
            }
        }
        Ok(())
    }

    fn set_acceleration(&mut self, agent_id: &str, acceleration: f32) -> Result<(), EngineError> {
        self.enter(EngineCall::SetAcceleration)?;
        self.ensure_started()?;
        let vehicle = agent_id
            .parse::<usize>()
            .ok()
            .filter(|slot| *slot < self.agent_count)
            .and_then(|slot| self.vehicles.get_mut(slot))
            .ok_or_else(|| {
                EngineError::call("set_acceleration", format!("unknown agent {agent_id:?}"))
            })?;
        let speed = vehicle.speed.unwrap_or(0.0);
        vehicle.speed = Some((speed + acceleration * DT).max(0.0));
        Ok(())
    }

    fn records(&self) -> Result<Vec<VehicleRecord>, EngineError> {
        self.enter(EngineCall::Records)?;
        self.ensure_started()?;
        let limit = self.record_limit.unwrap_or(self.vehicles.len());
        Ok(self.vehicles.iter().take(limit).copied().collect())
    }

    fn is_terminated(&self) -> Result<bool, EngineError> {
        self.enter(EngineCall::IsTerminated)?;
        self.ensure_started()?;
        Ok(self.tick >= self.horizon)
    }

    fn reset_episode(&mut self, _seed: Option<u64>) -> Result<(), EngineError> {
        self.enter(EngineCall::ResetEpisode)?;
        if !self.episode_reset {
            return Err(EngineError::Unsupported("reset_episode"));
        }
        self.ensure_started()?;
        self.place_vehicles();
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), EngineError> {
        self.enter(EngineCall::Shutdown)?;
        self.started = false;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    template: ScriptedEngine,
}

impl ScriptedLauncher {
    pub fn log(&self) -> CallLog {
        self.template.log()
    }
}

impl EngineLauncher for ScriptedLauncher {
    type Engine = ScriptedEngine;

    fn launch(&mut self, _config: &EngineConfig) -> Result<ScriptedEngine, EngineError> {
        self.template.log.push(EngineCall::Launch);
        if self.template.fail_on == Some(EngineCall::Launch) {
            return Err(EngineError::Launch("injected failure".to_string()));
        }
        Ok(self.template.clone())
    }
}
