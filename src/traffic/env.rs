use std::io::{self, Write};

use tracing::{debug, info, trace, warn};

use super::observation::{ObservationBuilder, VehicleIndex};
use super::reward::mean_speed;
use crate::config::{
    ActionPolicy, EnvConfig, MAX_ACCELERATION, MIN_ACCELERATION, ScenarioConfig,
};
use crate::engine::{EngineError, EngineLauncher, SimulationEngine};
use crate::env::{Action, BoxSpace, Env, EnvError, Info};

/// Reset option that tears down the live engine and boots a fresh one.
pub const REBUILD_OPTION: &str = "rebuild";

/// Lifecycle of a [`TrafficEnv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Before the first engine boot. Only held inside `TrafficEnv::new`, so a
    /// constructed environment never reports it.
    Uninitialized,
    Running,
    Terminated,
    Closed,
}

/// One live engine handle and the identifiers fetched when it started.
struct Session<E> {
    engine: E,
    vehicles: VehicleIndex,
    agent_ids: Vec<String>,
}

/// Exposes one controlled vehicle of a traffic simulation as a single-agent
/// environment.
///
/// The observation is `(x, y, speed)` for every vehicle slot, zero-padded to
/// `3 * vehicle_count`. The action is the controlled agent's acceleration in
/// `[-3, 1]` m/s². The reward is the mean speed of the moving vehicles.
pub struct TrafficEnv<L: EngineLauncher> {
    config: EnvConfig,
    launcher: L,
    session: Option<Session<L::Engine>>,
    state: Lifecycle,
    action_space: BoxSpace,
    observation_space: BoxSpace,
    builder: ObservationBuilder,
    episode: u64,
    tick: u64,
}

impl<L: EngineLauncher> TrafficEnv<L> {
    /// Boots the engine. Any failure to launch, start or initialize it is
    /// returned as is.
    pub fn new(config: EnvConfig, launcher: L) -> Result<Self, EnvError> {
        config.scenario.validate()?;
        let vehicle_count = config.scenario.vehicle_count;

        let mut env = Self {
            action_space: BoxSpace::uniform(1, MIN_ACCELERATION, MAX_ACCELERATION),
            observation_space: BoxSpace::unbounded(config.scenario.observation_len()),
            builder: ObservationBuilder::new(vehicle_count),
            config,
            launcher,
            session: None,
            state: Lifecycle::Uninitialized,
            episode: 0,
            tick: 0,
        };

        env.session = Some(env.acquire(None)?);
        env.state = Lifecycle::Running;
        info!(
            vehicles = vehicle_count,
            agents = env.config.scenario.agent_count,
            route = %env.config.scenario.route_id,
            "traffic environment ready"
        );
        Ok(env)
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.config.scenario
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn vehicle_ids(&self) -> Vec<&str> {
        self.session
            .as_ref()
            .map(|s| s.vehicles.ids().collect())
            .unwrap_or_default()
    }

    pub fn agent_ids(&self) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.agent_ids.as_slice())
            .unwrap_or_default()
    }

    /// Configures, starts and initializes a fresh engine, then fetches and
    /// validates its identifiers. A launched engine that fails any later
    /// step is shut down before the error is returned.
    fn acquire(&mut self, seed: Option<u64>) -> Result<Session<L::Engine>, EnvError> {
        let mut engine = self.launcher.launch(&self.config.engine)?;

        match Self::boot(&mut engine, &self.config, seed) {
            Ok((vehicles, agent_ids)) => {
                debug!(
                    vehicles = vehicles.len(),
                    agents = agent_ids.len(),
                    "engine session acquired"
                );
                Ok(Session {
                    engine,
                    vehicles,
                    agent_ids,
                })
            }
            Err(e) => {
                if let Err(shutdown) = engine.shutdown() {
                    warn!(error = %shutdown, "failed to shut down partially booted engine");
                }
                Err(e)
            }
        }
    }

    fn boot(
        engine: &mut L::Engine,
        config: &EnvConfig,
        seed: Option<u64>,
    ) -> Result<(VehicleIndex, Vec<String>), EnvError> {
        engine.configure(&config.scenario, seed)?;
        engine.apply_options(&config.engine.options)?;
        engine.start()?;
        engine.initialize()?;
        let ids = engine.entity_ids()?;
        let vehicles = VehicleIndex::from_ids(&ids.vehicles, config.scenario.vehicle_count)?;
        Ok((vehicles, ids.agents))
    }

    fn release(&mut self) -> Result<(), EngineError> {
        match self.session.take() {
            Some(mut session) => session.engine.shutdown(),
            None => Ok(()),
        }
    }

    fn observe(&self) -> Result<Vec<f32>, EnvError> {
        let session = self.session.as_ref().ok_or(EnvError::NotRunning)?;
        let records = session.engine.records()?;
        self.builder.build(&session.vehicles, &records)
    }

    fn resolve_action(&self, action: Action) -> Result<f32, EnvError> {
        let value = action.value();
        match self.config.action_policy {
            ActionPolicy::Passthrough => Ok(value),
            _ if !value.is_finite() => Err(EnvError::ActionOutOfBounds {
                value,
                low: MIN_ACCELERATION,
                high: MAX_ACCELERATION,
            }),
            ActionPolicy::Clamp => {
                let mut clamped = [value];
                self.action_space.clamp(&mut clamped);
                Ok(clamped[0])
            }
            ActionPolicy::Reject if self.action_space.contains(&[value]) => Ok(value),
            ActionPolicy::Reject => Err(EnvError::ActionOutOfBounds {
                value,
                low: MIN_ACCELERATION,
                high: MAX_ACCELERATION,
            }),
        }
    }

    /// Writes a one-line status summary for `mode == "console"`.
    pub fn render_to<W: Write>(&self, mode: &str, out: &mut W) -> io::Result<()> {
        if mode != "console" {
            debug!(mode, "render mode not supported; ignoring");
            return Ok(());
        }
        writeln!(
            out,
            "traffic env [{:?}] route={} episode={} tick={} vehicles={}/{}",
            self.state,
            self.config.scenario.route_id,
            self.episode,
            self.tick,
            self.session.as_ref().map_or(0, |s| s.vehicles.len()),
            self.config.scenario.vehicle_count,
        )
    }
}

fn wants_rebuild(options: Option<&Info>) -> bool {
    options
        .and_then(|o| o.get(REBUILD_OPTION))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

impl<L: EngineLauncher> Env for TrafficEnv<L> {
    type Obs = Vec<f32>;
    type Act = Action;
    type Info = Info;

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&Info>,
    ) -> Result<(Vec<f32>, Info), EnvError> {
        if self.state == Lifecycle::Closed {
            return Err(EnvError::Closed);
        }

        if wants_rebuild(options) {
            info!("rebuilding engine on reset");
            self.release()?;
        }

        let restarted = match self.session.as_mut() {
            Some(session) => match session.engine.reset_episode(seed) {
                Ok(()) => true,
                Err(EngineError::Unsupported(_)) => {
                    debug!("engine cannot reset in place; rebuilding");
                    self.release()?;
                    false
                }
                Err(e) => return Err(e.into()),
            },
            None => false,
        };
        if !restarted {
            self.session = Some(self.acquire(seed)?);
        }

        self.episode += 1;
        self.tick = 0;
        self.state = Lifecycle::Running;
        debug!(episode = self.episode, ?seed, "episode reset");

        Ok((self.observe()?, Info::new()))
    }

    fn step(&mut self, act: Action) -> Result<(Vec<f32>, f32, bool, Info), EnvError> {
        match self.state {
            Lifecycle::Closed => return Err(EnvError::Closed),
            Lifecycle::Terminated => return Err(EnvError::EpisodeTerminated),
            Lifecycle::Uninitialized => return Err(EnvError::NotRunning),
            Lifecycle::Running => {}
        }
        let acceleration = self.resolve_action(act)?;

        let session = self.session.as_mut().ok_or(EnvError::NotRunning)?;
        session.engine.advance()?;
        match session.agent_ids.first() {
            Some(agent) => session.engine.set_acceleration(agent, acceleration)?,
            None => trace!("no controlled agent; action not applied"),
        }

        let records = session.engine.records()?;
        let obs = self.builder.build(&session.vehicles, &records)?;
        let reward = mean_speed(&records);
        let terminated = session.engine.is_terminated()?;

        self.tick += 1;
        if terminated {
            self.state = Lifecycle::Terminated;
            info!(episode = self.episode, ticks = self.tick, "episode terminated");
        }
        trace!(
            episode = self.episode,
            tick = self.tick,
            acceleration,
            reward,
            terminated,
            "step"
        );

        Ok((obs, reward, terminated, Info::new()))
    }

    fn render(&self, mode: &str) -> Result<(), EnvError> {
        if self.state == Lifecycle::Closed {
            return Ok(());
        }
        self.render_to(mode, &mut io::stdout().lock())
            .map_err(|e| EnvError::Other(Box::new(e)))
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if self.state == Lifecycle::Closed {
            return Ok(());
        }
        self.state = Lifecycle::Closed;
        self.release()?;
        info!(episodes = self.episode, "traffic environment closed");
        Ok(())
    }
}

impl<L: EngineLauncher> Drop for TrafficEnv<L> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close traffic environment on drop");
        }
    }
}
