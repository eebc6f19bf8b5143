//! Pinhole look-at solver.

use glam::{DMat4, DQuat, EulerRot};

use super::PoseSolver;
use crate::config::CameraConfig;
use crate::error::TrackingError;

/// Look-at transform for a camera rigidly mounted in the head.
///
/// A pixel right of center yields a negative yaw (turn right); a pixel
/// below center yields a positive pitch (tilt down). The image center maps
/// to the identity transform. No translation is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeSolver {
    cx: f64,
    cy: f64,
    focal_px: f64,
}

impl PinholeSolver {
    pub fn new(width: u32, height: u32, horizontal_fov_rad: f64) -> Self {
        let half_width = width as f64 / 2.0;
        Self {
            cx: half_width,
            cy: height as f64 / 2.0,
            focal_px: half_width / (horizontal_fov_rad / 2.0).tan(),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.width,
            config.height,
            config.horizontal_fov_deg.to_radians(),
        )
    }
}

impl PoseSolver for PinholeSolver {
    fn pose_to_look_at(&self, pixel_x: f64, pixel_y: f64) -> Result<DMat4, TrackingError> {
        if !pixel_x.is_finite() || !pixel_y.is_finite() {
            return Err(TrackingError::Solver(format!(
                "non-finite pixel ({pixel_x}, {pixel_y})"
            )));
        }

        let yaw = -((pixel_x - self.cx) / self.focal_px).atan();
        let pitch = ((pixel_y - self.cy) / self.focal_px).atan();

        Ok(DMat4::from_quat(DQuat::from_euler(
            EulerRot::XYZ,
            0.0,
            pitch,
            yaw,
        )))
    }
}
