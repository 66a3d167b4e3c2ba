use serde::{Deserialize, Serialize};

/// Identifier sets fetched once after an engine session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityIds {
    pub vehicles: Vec<String>,
    pub agents: Vec<String>,
}

/// Position and speed of one vehicle at the current tick.
///
/// Either field may be missing, e.g. for a vehicle that has not departed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub position: Option<[f32; 2]>,
    pub speed: Option<f32>,
}

impl VehicleRecord {
    pub fn new(x: f32, y: f32, speed: f32) -> Self {
        Self {
            position: Some([x, y]),
            speed: Some(speed),
        }
    }

    /// The `(x, y, speed)` triple written into an observation. Missing
    /// fields read as zero.
    pub fn triple(&self) -> [f32; 3] {
        let [x, y] = self.position.unwrap_or([0.0, 0.0]);
        [x, y, self.speed.unwrap_or(0.0)]
    }
}
