//! headtrack - Camera head-tracking control loop
//!
//! A background loop that samples a camera, looks for a subject and drives
//! the robot's head offsets through four behaviors:
//! - scanning the room with a slow yaw sweep
//! - following a detected subject with gain-limited, smoothed offsets
//! - holding still briefly after the subject is lost
//! - easing back to neutral before scanning again
//!
//! The latest frame and offsets are readable from any thread without
//! waiting on the loop.

pub mod config;
pub mod error;
pub mod pose;
pub mod sim;
pub mod tracking;

pub use config::Config;
pub use error::{HeadtrackError, Result};
pub use pose::Pose6;
pub use tracking::{
    Detection, Detector, Frame, FrameSource, NormalizedPoint, Perception, PoseInterpolator,
    PoseSolver, TrackingController, TrackingLoop, TrackingState,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
