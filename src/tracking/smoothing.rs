//! Exponential smoothing of tracked head offsets.

use crate::pose::Pose6;

/// Accumulator for `smoothed = alpha * new + (1 - alpha) * smoothed_prev`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSmoother {
    alpha: f64,
    value: Pose6,
}

impl ExponentialSmoother {
    /// `alpha` is the weight of each new sample, in (0, 1].
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            value: Pose6::NEUTRAL,
        }
    }

    /// Back to the zero offset.
    pub fn reset(&mut self) {
        self.value = Pose6::NEUTRAL;
    }

    /// Start from an existing offset so the next update has no jump.
    pub fn seed(&mut self, value: Pose6) {
        self.value = value;
    }

    /// Fold in a new sample and return the smoothed value.
    pub fn update(&mut self, sample: Pose6) -> Pose6 {
        self.value = self.value.blend(sample, self.alpha);
        self.value
    }

    pub fn value(&self) -> Pose6 {
        self.value
    }
}
