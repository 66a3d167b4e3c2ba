use tracing::debug;
use uuid::Uuid;

use super::{Env, EnvError, Episode, Step};

/// Runs one episode: reset, then step with `policy` until the environment
/// reports termination or `max_steps` steps have been taken.
pub fn run_episode<E, P>(
    env: &mut E,
    mut policy: P,
    seed: Option<u64>,
    max_steps: Option<u64>,
) -> Result<Episode<E::Obs, E::Act>, EnvError>
where
    E: Env,
    E::Info: Into<serde_json::Value>,
    P: FnMut(&E::Obs) -> E::Act,
{
    let id = Uuid::new_v4();
    let (mut obs, _) = env.reset(seed, None)?;
    let mut steps = Vec::new();
    let mut total_reward = 0.0;
    let mut terminated = false;

    while max_steps.is_none_or(|cap| (steps.len() as u64) < cap) {
        let act = policy(&obs);
        let (next_obs, rew, done, info) = env.step(act.clone())?;
        total_reward += rew;
        steps.push(Step {
            obs,
            act,
            rew,
            done,
            info: info.into(),
        });
        obs = next_obs;

        if done {
            terminated = true;
            break;
        }
    }

    debug!(episode = %id, steps = steps.len(), total_reward, terminated, "episode finished");

    Ok(Episode {
        id,
        steps,
        total_reward,
        terminated,
    })
}
