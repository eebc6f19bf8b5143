//! Tracking module
//!
//! The head-tracking control loop and the collaborator contracts it drives:
//! - `FrameSource` produces camera frames on demand
//! - `Detector` locates the subject in a frame (normalized coordinates)
//! - `PoseSolver` turns a pixel into the head transform that centers it
//! - `PoseInterpolator` eases between two transforms
//!
//! `TrackingController` is the state machine; `TrackingLoop` runs it on a
//! worker thread and publishes frames and offsets to readers.

pub mod controller;
pub mod interpolate;
pub mod scan;
pub mod smoothing;
pub mod solver;
pub mod state;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

use glam::DMat4;
use image::RgbImage;

use crate::error::TrackingError;

pub use controller::TrackingController;
pub use interpolate::LinearPoseInterpolator;
pub use scan::ScanPattern;
pub use smoothing::ExponentialSmoother;
pub use solver::PinholeSolver;
pub use state::TrackingState;
pub use worker::TrackingLoop;

/// A captured camera image
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Image-plane location in [-1, 1] per axis, origin at the image center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Map to pixel coordinates in an image of the given size.
    pub fn to_pixel(&self, width: u32, height: u32) -> (f64, f64) {
        (
            (self.x + 1.0) / 2.0 * width as f64,
            (self.y + 1.0) / 2.0 * height as f64,
        )
    }
}

/// Detector output for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Detection {
    /// Subject reference point, `None` when nothing was found
    pub point: Option<NormalizedPoint>,
    /// Backend-specific confidence, if the backend reports one
    pub confidence: Option<f32>,
}

impl Detection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at(x: f64, y: f64) -> Self {
        Self {
            point: Some(NormalizedPoint::new(x, y)),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Produces frames on demand. `Ok(None)` means no frame is ready yet.
pub trait FrameSource: Send {
    fn get_frame(&mut self) -> Result<Option<Frame>, TrackingError>;
}

/// Locates the tracked subject. A miss is `Detection::none()`, not an error.
pub trait Detector: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Detection, TrackingError>;
}

/// Computes, without moving anything, the head transform that would center
/// the given pixel.
pub trait PoseSolver: Send {
    fn pose_to_look_at(&self, pixel_x: f64, pixel_y: f64) -> Result<DMat4, TrackingError>;
}

/// Interpolates between two transforms; `t` is in [0, 1].
pub trait PoseInterpolator: Send {
    fn interpolate(&self, start: &DMat4, end: &DMat4, t: f64) -> DMat4;
}

/// Detection stack. A loop without one only scans.
pub struct Perception {
    pub detector: Box<dyn Detector>,
    pub solver: Box<dyn PoseSolver>,
}

impl Perception {
    pub fn new(detector: impl Detector + 'static, solver: impl PoseSolver + 'static) -> Self {
        Self {
            detector: Box::new(detector),
            solver: Box::new(solver),
        }
    }
}
