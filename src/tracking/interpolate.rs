//! Linear pose interpolation.

use glam::DMat4;

use super::PoseInterpolator;

/// Lerps translation and slerps rotation between two transforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPoseInterpolator;

impl PoseInterpolator for LinearPoseInterpolator {
    fn interpolate(&self, start: &DMat4, end: &DMat4, t: f64) -> DMat4 {
        let t = t.clamp(0.0, 1.0);
        let (_, start_rot, start_pos) = start.to_scale_rotation_translation();
        let (_, end_rot, end_pos) = end.to_scale_rotation_translation();

        DMat4::from_rotation_translation(
            start_rot.slerp(end_rot, t),
            start_pos.lerp(end_pos, t),
        )
    }
}
