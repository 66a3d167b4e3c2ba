use async_trait::async_trait;

use super::{BoxSpace, EnvError};

/// Single-agent environment contract: reset, step, render, close.
///
/// Calls are blocking and take `&mut self`; an implementation is driven by
/// exactly one caller at a time.
pub trait Env: Send {
    type Obs: Send + Clone + 'static;
    type Act: Send + Clone + 'static;
    type Info: Send + Clone + 'static;

    fn action_space(&self) -> &BoxSpace;
    fn observation_space(&self) -> &BoxSpace;

    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&Self::Info>,
    ) -> Result<(Self::Obs, Self::Info), EnvError>;
    fn step(&mut self, act: Self::Act) -> Result<(Self::Obs, f32, bool, Self::Info), EnvError>;
    fn render(&self, mode: &str) -> Result<(), EnvError>;
    fn close(&mut self) -> Result<(), EnvError>;
}

/// The same contract, driven from async code.
#[async_trait]
pub trait AsyncEnv: Send {
    type Obs: Send + 'static;
    type Act: Send + 'static;
    type Info: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<Self::Info>,
    ) -> Result<(Self::Obs, Self::Info), Self::Error>;
    async fn step(
        &mut self,
        act: Self::Act,
    ) -> Result<(Self::Obs, f32, bool, Self::Info), Self::Error>;
    async fn close(&mut self) -> Result<(), Self::Error>;
}
