use serde::{Deserialize, Serialize};

/// A one-dimensional box of `f32` values with per-element bounds.
///
/// Bounds are inclusive. Infinite bounds are allowed and are how an
/// unbounded observation space is declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    low: Vec<f32>,
    high: Vec<f32>,
}

impl BoxSpace {
    /// A box of `len` elements, each in `(-inf, +inf)`.
    pub fn unbounded(len: usize) -> Self {
        Self {
            low: vec![f32::NEG_INFINITY; len],
            high: vec![f32::INFINITY; len],
        }
    }

    /// A box of `len` elements, each in `[low, high]`.
    pub fn uniform(len: usize, low: f32, high: f32) -> Self {
        Self {
            low: vec![low; len],
            high: vec![high; len],
        }
    }

    pub fn shape(&self) -> [usize; 1] {
        [self.low.len()]
    }

    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }

    pub fn low(&self) -> &[f32] {
        &self.low
    }

    pub fn high(&self) -> &[f32] {
        &self.high
    }

    /// True when `values` has this box's length and every element is within
    /// bounds. NaN is never contained.
    pub fn contains(&self, values: &[f32]) -> bool {
        values.len() == self.len()
            && values
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    /// Clamps `values` into the box in place. Extra elements are left alone.
    pub fn clamp(&self, values: &mut [f32]) {
        for (v, (lo, hi)) in values.iter_mut().zip(self.low.iter().zip(&self.high)) {
            *v = v.clamp(*lo, *hi);
        }
    }
}
