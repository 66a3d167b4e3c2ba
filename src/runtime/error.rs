use thiserror::Error;

use crate::env::EnvError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker canceled")]
    Canceled,

    #[error("timeout")]
    Timeout,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl From<tokio::sync::oneshot::error::RecvError> for WorkerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        WorkerError::Canceled
    }
}
