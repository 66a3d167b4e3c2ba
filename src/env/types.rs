use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EnvError;

/// Auxiliary per-call data returned alongside observations.
pub type Info = serde_json::Map<String, serde_json::Value>;

/// Render modes an environment understands.
pub const RENDER_MODES: &[&str] = &["console"];

/// A single continuous control value, e.g. a commanded acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub f32);

impl Action {
    pub fn value(self) -> f32 {
        self.0
    }
}

impl From<f32> for Action {
    fn from(value: f32) -> Self {
        Action(value)
    }
}

impl From<[f32; 1]> for Action {
    fn from([value]: [f32; 1]) -> Self {
        Action(value)
    }
}

impl TryFrom<&[f32]> for Action {
    type Error = EnvError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        match values {
            [value] => Ok(Action(*value)),
            _ => Err(EnvError::ActionShape {
                expected: 1,
                actual: values.len(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step<O, A> {
    pub obs: O,
    pub act: A,
    pub rew: f32,
    pub done: bool,
    pub info: serde_json::Value,
}

/// One recorded run from `reset` to termination or a step cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode<O, A> {
    pub id: Uuid,
    pub steps: Vec<Step<O, A>>,
    pub total_reward: f32,
    pub terminated: bool,
}
