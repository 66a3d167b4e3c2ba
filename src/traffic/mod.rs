//! The traffic environment: engine lifecycle, observation layout and reward.

mod env;
mod observation;
mod reward;

pub use env::{Lifecycle, REBUILD_OPTION, TrafficEnv};
pub use observation::{ObservationBuilder, VehicleIndex};
pub use reward::mean_speed;
