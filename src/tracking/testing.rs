//! Scripted collaborators shared by the tracking tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::RgbImage;
use parking_lot::Mutex;

use super::{Detection, Detector, Frame, FrameSource};
use crate::error::TrackingError;

pub(crate) fn blank_frame() -> Frame {
    Frame::new(RgbImage::new(640, 480))
}

#[derive(Debug, Clone, Copy)]
enum Visibility {
    Hidden,
    At(f64, f64),
    Failing,
}

/// Detector whose answer is set from the test body.
#[derive(Clone)]
pub(crate) struct Subject {
    visibility: Arc<Mutex<Visibility>>,
    calls: Arc<AtomicUsize>,
}

impl Default for Subject {
    fn default() -> Self {
        Self {
            visibility: Arc::new(Mutex::new(Visibility::Hidden)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Subject {
    pub(crate) fn show(&self, x: f64, y: f64) {
        *self.visibility.lock() = Visibility::At(x, y);
    }

    pub(crate) fn hide(&self) {
        *self.visibility.lock() = Visibility::Hidden;
    }

    pub(crate) fn fail(&self) {
        *self.visibility.lock() = Visibility::Failing;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for Subject {
    fn locate(&mut self, _frame: &Frame) -> Result<Detection, TrackingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.visibility.lock() {
            Visibility::Hidden => Ok(Detection::none()),
            Visibility::At(x, y) => Ok(Detection::at(x, y)),
            Visibility::Failing => Err(TrackingError::Detector("scripted failure".to_string())),
        }
    }
}

/// Frame source that counts polls and can be told to withhold frames or fail.
#[derive(Clone)]
pub(crate) struct Camera {
    mode: Arc<Mutex<CameraMode>>,
    polls: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CameraMode {
    Streaming,
    Starved,
    Failing,
    Panicking,
    /// Block once for the given time, then go back to streaming
    Stalling(Duration),
}

impl Camera {
    pub(crate) fn new(mode: CameraMode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn set_mode(&self, mode: CameraMode) {
        *self.mode.lock() = mode;
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl FrameSource for Camera {
    fn get_frame(&mut self) -> Result<Option<Frame>, TrackingError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mode = {
            let mut current = self.mode.lock();
            let mode = *current;
            if let CameraMode::Stalling(_) = mode {
                *current = CameraMode::Streaming;
            }
            mode
        };
        match mode {
            CameraMode::Streaming => Ok(Some(blank_frame())),
            CameraMode::Starved => Ok(None),
            CameraMode::Failing => Err(TrackingError::FrameSource("device busy".to_string())),
            CameraMode::Panicking => panic!("camera driver fault"),
            CameraMode::Stalling(pause) => {
                thread::sleep(pause);
                Ok(Some(blank_frame()))
            }
        }
    }
}
