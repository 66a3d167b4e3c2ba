use serde_json::json;
use traffic_gym::engine::{EngineCall, EngineError, ScriptedEngine, ScriptedLauncher};
use traffic_gym::env::{Action, Env, EnvError, Info, run_episode};
use traffic_gym::traffic::{Lifecycle, REBUILD_OPTION, TrafficEnv};
use traffic_gym::{ActionPolicy, EngineConfig, EnvConfig, ScenarioConfig};

fn config(vehicles: usize, agents: usize) -> EnvConfig {
    EnvConfig::new(ScenarioConfig::new(vehicles, agents, "r0"))
}

fn make_env(config: EnvConfig, engine: ScriptedEngine) -> TrafficEnv<ScriptedLauncher> {
    TrafficEnv::new(config, engine.launcher()).unwrap()
}

fn rebuild() -> Info {
    let mut options = Info::new();
    options.insert(REBUILD_OPTION.into(), json!(true));
    options
}

#[test]
fn three_vehicle_scenario_resets_and_steps() {
    let mut env = make_env(config(3, 1), ScriptedEngine::new());
    assert_eq!(env.state(), Lifecycle::Running);
    assert_eq!(env.observation_space().shape(), [9]);
    assert_eq!(env.action_space().low(), &[-3.0]);
    assert_eq!(env.action_space().high(), &[1.0]);

    let (obs, info) = env.reset(None, None).unwrap();
    assert_eq!(obs.len(), 9);
    assert!(obs.iter().all(|v| v.is_finite()));
    assert!(info.is_empty());

    let (obs, reward, terminated, info) = env.step(Action(0.0)).unwrap();
    assert_eq!(obs.len(), 9);
    assert!(!terminated);
    assert!(info.is_empty());
    let speeds = [obs[2], obs[5], obs[8]];
    assert_eq!(reward, speeds.iter().sum::<f32>() / 3.0);
}

#[test]
fn construction_boots_the_engine_in_order() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let env = make_env(
        config(2, 1).with_engine(EngineConfig::new("/opt/project").with_options(["--no-gui"])),
        engine,
    );

    assert_eq!(
        log.calls(),
        vec![
            EngineCall::Launch,
            EngineCall::Configure,
            EngineCall::ApplyOptions,
            EngineCall::Start,
            EngineCall::Initialize,
            EngineCall::EntityIds,
        ]
    );
    assert_eq!(env.vehicle_ids(), vec!["0", "1"]);
    assert_eq!(env.agent_ids(), &["0".to_string()]);
}

#[test]
fn step_advances_before_applying_the_action() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 1), engine);
    env.reset(None, None).unwrap();
    let before = log.calls().len();

    env.step(Action(0.5)).unwrap();

    assert_eq!(
        log.calls()[before..].to_vec(),
        vec![
            EngineCall::Advance,
            EngineCall::SetAcceleration,
            EngineCall::Records,
            EngineCall::IsTerminated,
        ]
    );
}

#[test]
fn observation_places_each_vehicle_at_its_slot() {
    let engine = ScriptedEngine::new().with_speeds(vec![1.0, 2.0, 3.0]);
    let mut env = make_env(config(3, 0), engine);
    env.reset(None, None).unwrap();

    let (obs, _, _, _) = env.step(Action(0.0)).unwrap();
    assert_eq!(obs, vec![1.0, 0.0, 1.0, 12.0, 0.0, 2.0, 23.0, 0.0, 3.0]);
}

#[test]
fn observation_is_zero_padded_when_fewer_vehicles_are_known() {
    let engine = ScriptedEngine::new().with_vehicle_ids(vec!["1".into(), "0".into()]);
    let mut env = make_env(config(5, 1), engine);

    let (obs, _) = env.reset(None, None).unwrap();
    assert_eq!(obs.len(), 15);
    assert!(obs[6..].iter().all(|v| *v == 0.0));

    for _ in 0..3 {
        let (obs, _, _, _) = env.step(Action(0.0)).unwrap();
        assert_eq!(obs.len(), 15);
        assert!(obs[..6].iter().any(|v| *v != 0.0));
        assert!(obs[6..].iter().all(|v| *v == 0.0));
    }
}

#[test]
fn reward_ignores_stopped_vehicles() {
    let engine = ScriptedEngine::new().with_speeds(vec![5.0, 0.0, 3.0]);
    let mut env = make_env(config(3, 0), engine);
    env.reset(None, None).unwrap();

    let (_, reward, _, _) = env.step(Action(0.0)).unwrap();
    assert_eq!(reward, 4.0);
}

#[test]
fn reward_is_zero_when_nothing_moves() {
    let engine = ScriptedEngine::new().with_speeds(vec![0.0, 0.0]);
    let mut env = make_env(config(2, 0), engine);
    env.reset(None, None).unwrap();

    let (_, reward, _, _) = env.step(Action(0.0)).unwrap();
    assert_eq!(reward, 0.0);
}

#[test]
fn engine_boot_failures_are_fatal() {
    for call in [
        EngineCall::Launch,
        EngineCall::Configure,
        EngineCall::Start,
        EngineCall::Initialize,
        EngineCall::EntityIds,
    ] {
        let engine = ScriptedEngine::new().failing_on(call);
        let result = TrafficEnv::new(config(3, 1), engine.launcher());
        assert!(
            matches!(result, Err(EnvError::Engine(_))),
            "{call:?} failure should surface"
        );
    }
}

#[test]
fn launch_failure_keeps_the_launch_error() {
    let engine = ScriptedEngine::new().failing_on(EngineCall::Launch);
    let result = TrafficEnv::new(config(3, 1), engine.launcher());
    assert!(matches!(
        result,
        Err(EnvError::Engine(EngineError::Launch(_)))
    ));
}

#[test]
fn half_started_engine_is_shut_down_when_initialization_fails() {
    let engine = ScriptedEngine::new().failing_on(EngineCall::Initialize);
    let log = engine.log();
    assert!(TrafficEnv::new(config(3, 1), engine.launcher()).is_err());
    assert_eq!(log.count(EngineCall::Shutdown), 1);
}

#[test]
fn engine_failing_to_start_is_shut_down() {
    let engine = ScriptedEngine::new().failing_on(EngineCall::Start);
    let log = engine.log();
    assert!(TrafficEnv::new(config(3, 1), engine.launcher()).is_err());
    assert_eq!(
        log.calls(),
        vec![
            EngineCall::Launch,
            EngineCall::Configure,
            EngineCall::ApplyOptions,
            EngineCall::Start,
            EngineCall::Shutdown,
        ]
    );
}

#[test]
fn every_boot_failure_after_launch_shuts_the_engine_down() {
    for call in [
        EngineCall::Configure,
        EngineCall::ApplyOptions,
        EngineCall::Start,
        EngineCall::Initialize,
        EngineCall::EntityIds,
    ] {
        let engine = ScriptedEngine::new().failing_on(call);
        let log = engine.log();
        assert!(TrafficEnv::new(config(3, 1), engine.launcher()).is_err());
        assert_eq!(log.count(EngineCall::Shutdown), 1, "{call:?}");
    }
}

#[test]
fn invalid_vehicle_ids_fail_construction() {
    let engine = ScriptedEngine::new().with_vehicle_ids(vec!["0".into(), "2".into()]);
    let log = engine.log();
    let result = TrafficEnv::new(config(3, 1), engine.launcher());
    assert!(matches!(result, Err(EnvError::InvalidIdentifiers(_))));
    assert_eq!(log.count(EngineCall::Shutdown), 1);
}

#[test]
fn invalid_scenario_is_rejected_before_launch() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let result = TrafficEnv::new(config(0, 0), engine.launcher());
    assert!(matches!(result, Err(EnvError::Config(_))));
    assert!(log.calls().is_empty());
}

#[test]
fn missing_records_surface_as_index_faults() {
    let engine = ScriptedEngine::new().with_record_limit(1);
    let mut env = make_env(config(3, 1), engine);

    assert!(matches!(
        env.reset(None, None),
        Err(EnvError::IndexOutOfRange { available: 1, .. })
    ));
    assert!(matches!(
        env.step(Action(0.0)),
        Err(EnvError::IndexOutOfRange {
            index: 1,
            available: 1,
            ..
        })
    ));
}

#[test]
fn engine_step_failure_propagates() {
    let engine = ScriptedEngine::new().failing_on(EngineCall::Advance);
    let mut env = make_env(config(2, 1), engine);
    env.reset(None, None).unwrap();

    assert!(matches!(env.step(Action(0.0)), Err(EnvError::Engine(_))));
    assert_eq!(env.state(), Lifecycle::Running);
}

#[test]
fn reset_restarts_the_episode_inside_the_live_engine() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 1), engine);

    let (first, _) = env.reset(Some(7), None).unwrap();
    env.step(Action(1.0)).unwrap();
    env.step(Action(1.0)).unwrap();
    let (second, _) = env.reset(Some(7), None).unwrap();

    assert_eq!(first, second);
    assert_eq!(log.count(EngineCall::Launch), 1);
    assert_eq!(log.count(EngineCall::ResetEpisode), 2);
    assert_eq!(env.episode(), 2);
    assert_eq!(env.tick(), 0);
}

#[test]
fn reset_rebuilds_engines_that_cannot_restart_in_place() {
    let engine = ScriptedEngine::new().without_episode_reset();
    let log = engine.log();
    let mut env = make_env(config(3, 1), engine);

    let (first, info) = env.reset(None, None).unwrap();
    assert_eq!(first.len(), 9);
    assert!(info.is_empty());
    env.step(Action(1.0)).unwrap();
    let (second, _) = env.reset(None, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(log.count(EngineCall::ResetEpisode), 2);
    assert_eq!(log.count(EngineCall::Launch), 3);
    assert_eq!(log.count(EngineCall::Shutdown), 2);
    assert_eq!(env.state(), Lifecycle::Running);

    env.close().unwrap();
    assert_eq!(log.count(EngineCall::Shutdown), 3);
}

#[test]
fn other_reset_failures_still_propagate() {
    let engine = ScriptedEngine::new().failing_on(EngineCall::ResetEpisode);
    let log = engine.log();
    let mut env = make_env(config(3, 1), engine);

    assert!(matches!(
        env.reset(None, None),
        Err(EnvError::Engine(EngineError::Call { .. }))
    ));
    assert_eq!(log.count(EngineCall::Launch), 1);
}

#[test]
fn rebuild_option_replaces_the_engine() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 1), engine);

    let (obs, _) = env.reset(None, Some(&rebuild())).unwrap();
    assert_eq!(obs.len(), 6);
    assert_eq!(log.count(EngineCall::Shutdown), 1);
    assert_eq!(log.count(EngineCall::Launch), 2);
    assert_eq!(log.count(EngineCall::ResetEpisode), 0);
    assert_eq!(env.state(), Lifecycle::Running);
}

#[test]
fn termination_blocks_steps_until_reset() {
    let mut env = make_env(config(2, 1), ScriptedEngine::new().with_horizon(2));
    env.reset(None, None).unwrap();

    assert!(!env.step(Action(0.0)).unwrap().2);
    assert!(env.step(Action(0.0)).unwrap().2);
    assert_eq!(env.state(), Lifecycle::Terminated);
    assert!(matches!(
        env.step(Action(0.0)),
        Err(EnvError::EpisodeTerminated)
    ));

    env.reset(None, None).unwrap();
    assert_eq!(env.state(), Lifecycle::Running);
    assert!(!env.step(Action(0.0)).unwrap().2);
}

#[test]
fn reject_policy_accepts_bounds_and_refuses_values_outside() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 1), engine);
    env.reset(None, None).unwrap();

    assert!(env.step(Action(-3.0)).is_ok());
    assert!(env.step(Action(1.0)).is_ok());
    let advances = log.count(EngineCall::Advance);

    for value in [-3.01, 1.01, f32::NAN] {
        assert!(matches!(
            env.step(Action(value)),
            Err(EnvError::ActionOutOfBounds { .. })
        ));
    }
    assert_eq!(log.count(EngineCall::Advance), advances);
}

#[test]
fn clamp_policy_pulls_actions_onto_the_bounds() {
    let mut env = make_env(
        config(2, 1).with_action_policy(ActionPolicy::Clamp),
        ScriptedEngine::new(),
    );

    env.reset(None, None).unwrap();
    let (obs, _, _, _) = env.step(Action(1.01)).unwrap();
    assert_eq!(obs[2], 11.0);

    env.reset(None, None).unwrap();
    let (obs, _, _, _) = env.step(Action(-3.01)).unwrap();
    assert_eq!(obs[2], 7.0);

    env.reset(None, None).unwrap();
    let (obs, _, _, _) = env.step(Action(-3.0)).unwrap();
    assert_eq!(obs[2], 7.0);

    assert!(matches!(
        env.step(Action(f32::INFINITY)),
        Err(EnvError::ActionOutOfBounds { .. })
    ));
}

#[test]
fn passthrough_policy_forwards_actions_unchanged() {
    let mut env = make_env(
        config(2, 1).with_action_policy(ActionPolicy::Passthrough),
        ScriptedEngine::new(),
    );
    env.reset(None, None).unwrap();

    let (obs, _, _, _) = env.step(Action(1.01)).unwrap();
    assert!((obs[2] - 11.01).abs() < 1e-5);
}

#[test]
fn actions_are_not_applied_without_a_controlled_agent() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 0), engine);
    env.reset(None, None).unwrap();

    env.step(Action(1.0)).unwrap();
    assert_eq!(log.count(EngineCall::SetAcceleration), 0);
}

#[test]
fn close_is_idempotent_and_final() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 1), engine);
    env.reset(None, None).unwrap();

    env.close().unwrap();
    env.close().unwrap();
    assert_eq!(log.count(EngineCall::Shutdown), 1);
    assert_eq!(env.state(), Lifecycle::Closed);

    assert!(matches!(env.step(Action(0.0)), Err(EnvError::Closed)));
    assert!(matches!(env.reset(None, None), Err(EnvError::Closed)));
    assert!(env.render("console").is_ok());

    drop(env);
    assert_eq!(log.count(EngineCall::Shutdown), 1);
}

#[test]
fn dropping_an_open_env_shuts_the_engine_down_once() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let env = make_env(config(2, 1), engine);

    drop(env);
    assert_eq!(log.count(EngineCall::Shutdown), 1);
}

#[test]
fn every_rebuilt_engine_is_shut_down_exactly_once() {
    let engine = ScriptedEngine::new();
    let log = engine.log();
    let mut env = make_env(config(2, 1), engine);

    env.reset(None, Some(&rebuild())).unwrap();
    env.reset(None, Some(&rebuild())).unwrap();
    env.close().unwrap();

    assert_eq!(log.count(EngineCall::Launch), 3);
    assert_eq!(log.count(EngineCall::Shutdown), 3);
}

#[test]
fn console_render_writes_a_status_line() {
    let env = make_env(config(3, 1), ScriptedEngine::new());

    let mut out = Vec::new();
    env.render_to("console", &mut out).unwrap();
    let line = String::from_utf8(out).unwrap();
    assert!(line.contains("route=r0"));
    assert!(line.contains("vehicles=3/3"));
    assert!(line.ends_with('\n'));

    let mut out = Vec::new();
    env.render_to("rgb_array", &mut out).unwrap();
    assert!(out.is_empty());
}

#[test]
fn run_episode_stops_at_termination() {
    let mut env = make_env(config(3, 1), ScriptedEngine::new().with_horizon(5));

    let episode = run_episode(&mut env, |_obs| Action(0.0), None, None).unwrap();
    assert_eq!(episode.steps.len(), 5);
    assert!(episode.terminated);
    assert!(episode.steps.last().unwrap().done);
    let total: f32 = episode.steps.iter().map(|s| s.rew).sum();
    assert_eq!(episode.total_reward, total);
}

#[test]
fn run_episode_respects_the_step_cap() {
    let mut env = make_env(config(3, 1), ScriptedEngine::new());

    let episode = run_episode(&mut env, |_obs| Action(0.5), Some(3), Some(3)).unwrap();
    assert_eq!(episode.steps.len(), 3);
    assert!(!episode.terminated);
    assert!(episode.steps.iter().all(|s| s.act == Action(0.5)));
}
