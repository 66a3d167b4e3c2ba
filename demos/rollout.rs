use std::time::Duration;

use traffic_gym::engine::ScriptedEngine;
use traffic_gym::env::{Action, AsyncEnv, Env, run_episode};
use traffic_gym::runtime::EnvWorker;
use traffic_gym::{ActionPolicy, EngineConfig, EnvConfig, ScenarioConfig, TrafficEnv};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EnvConfig::new(ScenarioConfig::new(4, 1, "r0"))
        .with_engine(EngineConfig::from_env())
        .with_action_policy(ActionPolicy::Clamp);

    // Blocking: drive the env directly with a proportional speed controller.
    let engine = ScriptedEngine::new()
        .with_speeds(vec![4.0, 12.0, 9.0, 0.0])
        .with_horizon(20);
    let mut env = TrafficEnv::new(config.clone(), engine.launcher())?;
    let target = 8.0;
    let episode = run_episode(
        &mut env,
        |obs: &Vec<f32>| Action(0.5 * (target - obs[2])),
        Some(0),
        None,
    )?;
    env.render("console")?;
    println!(
        "episode {}: {} steps, total reward {:.2}, terminated {}",
        episode.id,
        episode.steps.len(),
        episode.total_reward,
        episode.terminated
    );
    println!("last step: {}", serde_json::to_string(&episode.steps.last())?);
    env.close()?;

    // Async: the same env on a worker thread, every call bounded by a timeout.
    let launcher = ScriptedEngine::new().with_horizon(5).launcher();
    let mut worker = EnvWorker::spawn(move || TrafficEnv::new(config, launcher))
        .await?
        .with_timeout(Duration::from_secs(1));
    println!("worker {} started", worker.id());

    let (obs, _) = worker.reset(None, None).await?;
    println!("reset: {:?}", obs);
    loop {
        let (obs, reward, terminated, _) = worker.step(Action(1.0)).await?;
        println!("obs {:?} reward {:.2}", obs, reward);
        if terminated {
            break;
        }
    }
    worker.render("console").await?;
    worker.shutdown().await?;

    Ok(())
}
