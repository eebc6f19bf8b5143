//! Six-DOF head offsets
//!
//! `Pose6` is the representation shared by the reader-visible offsets, the
//! smoothing accumulator and the return-to-neutral endpoints. Angles are
//! radians in `XYZ` Euler order, matching the rotation block of the 4x4
//! homogeneous transforms produced by pose solvers.

use glam::{DMat4, DQuat, DVec3, EulerRot};

/// Translation (x, y, z) and rotation (roll, pitch, yaw) offsets
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose6 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose6 {
    /// Looking straight ahead with no translation
    pub const NEUTRAL: Pose6 = Pose6 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        roll: 0.0,
        pitch: 0.0,
        yaw: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            roll,
            pitch,
            yaw,
        }
    }

    pub fn from_array(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }

    /// `[x, y, z, roll, pitch, yaw]`
    pub fn to_array(self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    /// Decompose a homogeneous transform (rotation block + translation column).
    pub fn from_matrix(m: &DMat4) -> Self {
        let (_, rotation, translation) = m.to_scale_rotation_translation();
        let (roll, pitch, yaw) = rotation.to_euler(EulerRot::XYZ);
        Self::new(translation.x, translation.y, translation.z, roll, pitch, yaw)
    }

    /// Build the homogeneous transform; last row is `[0, 0, 0, 1]`.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation(), self.translation())
    }

    pub fn translation(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    pub fn rotation(&self) -> DQuat {
        DQuat::from_euler(EulerRot::XYZ, self.roll, self.pitch, self.yaw)
    }

    /// Multiply every component by `k`.
    pub fn scale(self, k: f64) -> Self {
        Self::from_array(self.to_array().map(|v| v * k))
    }

    /// One exponential smoothing step: `alpha * target + (1 - alpha) * self`.
    pub fn blend(self, target: Pose6, alpha: f64) -> Self {
        let prev = self.to_array();
        let next = target.to_array();
        let mut out = [0.0; 6];
        for i in 0..6 {
            out[i] = alpha * next[i] + (1.0 - alpha) * prev[i];
        }
        Self::from_array(out)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    pub fn is_neutral(&self) -> bool {
        self.to_array().iter().all(|&v| v == 0.0)
    }

    /// Largest absolute component-wise difference.
    pub fn max_abs_diff(&self, other: &Pose6) -> f64 {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl std::fmt::Display for Pose6 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "xyz=({:+.3}, {:+.3}, {:+.3}) rpy=({:+.3}, {:+.3}, {:+.3})",
            self.x, self.y, self.z, self.roll, self.pitch, self.yaw
        )
    }
}
