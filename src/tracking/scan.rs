//! Scan sweep used while no subject is tracked.

use std::f64::consts::TAU;

use crate::config::ScanConfig;
use crate::pose::Pose6;

/// Sinusoidal yaw sweep with a constant pitch and no translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPattern {
    yaw_amplitude: f64,
    period_secs: f64,
    pitch: f64,
}

impl ScanPattern {
    pub fn new(yaw_amplitude: f64, period_secs: f64, pitch: f64) -> Self {
        Self {
            yaw_amplitude,
            period_secs,
            pitch,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.yaw_amplitude, config.period_secs, config.pitch)
    }

    /// Offset after `phase` seconds of scanning.
    pub fn offset(&self, phase: f64) -> Pose6 {
        let yaw = self.yaw_amplitude * (TAU * phase / self.period_secs).sin();
        Pose6::new(0.0, 0.0, 0.0, 0.0, self.pitch, yaw)
    }
}
