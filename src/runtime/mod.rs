//! Running blocking environments behind an async, time-bounded interface.

mod error;
mod worker;

pub use error::WorkerError;
pub use worker::EnvWorker;
