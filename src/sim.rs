//! Synthetic camera and bright-spot detector
//!
//! Lets the loop run end-to-end without hardware: the camera renders a
//! bright dot that wanders on a Lissajous path and periodically leaves the
//! frame, and the detector finds it by thresholding.

use image::{Rgb, RgbImage};
use std::time::Instant;

use crate::config::CameraConfig;
use crate::error::TrackingError;
use crate::tracking::{Detection, Detector, Frame, FrameSource, NormalizedPoint};

/// Frame source drawing a moving dot over a dark background
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    radius: f64,
    visible_secs: f64,
    hidden_secs: f64,
    epoch: Instant,
}

impl SyntheticCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            radius: (config.width.min(config.height) as f64 / 24.0).max(2.0),
            visible_secs: 6.0,
            hidden_secs: 4.0,
            epoch: Instant::now(),
        }
    }

    /// Dot visible for `visible_secs`, then absent for `hidden_secs`, repeating
    pub fn with_schedule(mut self, visible_secs: f64, hidden_secs: f64) -> Self {
        self.visible_secs = visible_secs.max(0.0);
        self.hidden_secs = hidden_secs.max(0.0);
        self
    }

    /// Dot position at `t` seconds, or `None` while it is out of view.
    pub fn subject_at(&self, t: f64) -> Option<NormalizedPoint> {
        let cycle = self.visible_secs + self.hidden_secs;
        if cycle <= 0.0 || t % cycle >= self.visible_secs {
            return None;
        }
        Some(NormalizedPoint::new(
            0.6 * (0.7 * t).sin(),
            0.4 * (1.1 * t).sin(),
        ))
    }

    /// Render the scene at `t` seconds.
    pub fn render(&self, t: f64) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb([16, 16, 24]));
        let Some(point) = self.subject_at(t) else {
            return image;
        };

        let (cx, cy) = point.to_pixel(self.width, self.height);
        let r = self.radius;
        let x0 = (cx - r).floor().max(0.0) as u32;
        let y0 = (cy - r).floor().max(0.0) as u32;
        let x1 = ((cx + r).ceil() as u32).min(self.width);
        let y1 = ((cy + r).ceil() as u32).min(self.height);

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    image.put_pixel(x, y, Rgb([255, 240, 220]));
                }
            }
        }
        image
    }
}

impl FrameSource for SyntheticCamera {
    fn get_frame(&mut self) -> Result<Option<Frame>, TrackingError> {
        let t = self.epoch.elapsed().as_secs_f64();
        Ok(Some(Frame::new(self.render(t))))
    }
}

/// Detector returning the centroid of pixels brighter than a threshold
#[derive(Debug, Clone)]
pub struct BrightSpotDetector {
    threshold: u8,
    min_pixels: usize,
}

impl Default for BrightSpotDetector {
    fn default() -> Self {
        Self {
            threshold: 200,
            min_pixels: 4,
        }
    }
}

impl BrightSpotDetector {
    pub fn new(threshold: u8, min_pixels: usize) -> Self {
        Self {
            threshold,
            min_pixels: min_pixels.max(1),
        }
    }
}

impl Detector for BrightSpotDetector {
    fn locate(&mut self, frame: &Frame) -> Result<Detection, TrackingError> {
        let (mut sum_x, mut sum_y, mut count) = (0.0f64, 0.0f64, 0usize);

        for (x, y, pixel) in frame.image().enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let luma = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
            if luma >= u16::from(self.threshold) {
                sum_x += x as f64 + 0.5;
                sum_y += y as f64 + 0.5;
                count += 1;
            }
        }

        if count < self.min_pixels {
            return Ok(Detection::none());
        }

        let (w, h) = (frame.width() as f64, frame.height() as f64);
        let cx = sum_x / count as f64;
        let cy = sum_y / count as f64;
        let coverage = count as f32 / (w * h) as f32;

        Ok(Detection::at(cx / w * 2.0 - 1.0, cy / h * 2.0 - 1.0).with_confidence(coverage))
    }
}
