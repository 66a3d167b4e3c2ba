use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine failed to launch: {0}")]
    Launch(String),

    #[error("engine call `{op}` failed: {reason}")]
    Call { op: &'static str, reason: String },

    #[error("engine does not support `{0}`")]
    Unsupported(&'static str),

    #[error("engine session is not running")]
    NotRunning,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub fn call(op: &'static str, reason: impl ToString) -> Self {
        EngineError::Call {
            op,
            reason: reason.to_string(),
        }
    }
}
