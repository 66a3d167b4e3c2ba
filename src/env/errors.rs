use thiserror::Error;

use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("vehicle {id:?} maps to slot {index} but the engine reported {available} record(s)")]
    IndexOutOfRange {
        id: String,
        index: usize,
        available: usize,
    },

    #[error("invalid vehicle identifiers: {0}")]
    InvalidIdentifiers(String),

    #[error("action {value} outside [{low}, {high}]")]
    ActionOutOfBounds { value: f32, low: f32, high: f32 },

    #[error("action must have exactly {expected} element(s), got {actual}")]
    ActionShape { expected: usize, actual: usize },

    #[error("environment is closed")]
    Closed,

    #[error("episode has terminated; call reset before stepping")]
    EpisodeTerminated,

    #[error("no live simulation handle; call reset first")]
    NotRunning,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Environment error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
