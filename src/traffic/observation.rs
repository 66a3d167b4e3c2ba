use std::collections::HashSet;

use crate::engine::VehicleRecord;
use crate::env::EnvError;

/// Vehicle identifiers paired with the dense slot each one occupies.
///
/// Built once per engine session. Identifiers must be the decimal integers
/// `0..n` in any order, and `n` may not exceed the scenario's vehicle count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIndex {
    entries: Vec<(String, usize)>,
}

impl VehicleIndex {
    pub fn from_ids(ids: &[String], capacity: usize) -> Result<Self, EnvError> {
        if ids.len() > capacity {
            return Err(EnvError::InvalidIdentifiers(format!(
                "engine reported {} vehicles but the scenario declares {capacity}",
                ids.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let slot: usize = id.trim().parse().map_err(|_| {
                EnvError::InvalidIdentifiers(format!("{id:?} is not a non-negative integer"))
            })?;
            if slot >= ids.len() {
                return Err(EnvError::InvalidIdentifiers(format!(
                    "{id:?} leaves a gap; expected identifiers 0..{}",
                    ids.len()
                )));
            }
            if !seen.insert(slot) {
                return Err(EnvError::InvalidIdentifiers(format!("{id:?} is duplicated")));
            }
            entries.push((id.clone(), slot));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(id, slot)| (id.as_str(), *slot))
    }
}

/// Lays per-vehicle records out as a flat `[x0, y0, v0, x1, y1, v1, ...]`
/// vector of fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationBuilder {
    len: usize,
}

impl ObservationBuilder {
    pub fn new(vehicle_count: usize) -> Self {
        Self {
            len: 3 * vehicle_count,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// An all-zero observation.
    pub fn zeros(&self) -> Vec<f32> {
        vec![0.0; self.len]
    }

    /// Writes vehicle `slot`'s triple at `[3 * slot, 3 * slot + 2]`; every
    /// other position stays zero.
    ///
    /// Fails when a known vehicle has no record this tick.
    pub fn build(
        &self,
        index: &VehicleIndex,
        records: &[VehicleRecord],
    ) -> Result<Vec<f32>, EnvError> {
        let mut obs = self.zeros();
        for (id, slot) in index.iter() {
            let record = records.get(slot).ok_or_else(|| EnvError::IndexOutOfRange {
                id: id.to_string(),
                index: slot,
                available: records.len(),
            })?;
            let start = 3 * slot;
            // VehicleIndex caps slots below vehicle_count.
            if let Some(dst) = obs.get_mut(start..start + 3) {
                dst.copy_from_slice(&record.triple());
            }
        }
        Ok(obs)
    }
}
