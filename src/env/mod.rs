mod errors;
mod rollout;
mod spaces;
mod traits;
mod types;

pub use errors::EnvError;
pub use rollout::run_episode;
pub use spaces::BoxSpace;
pub use traits::{AsyncEnv, Env};
pub use types::{Action, Episode, Info, RENDER_MODES, Step};
