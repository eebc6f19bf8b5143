//! Head-tracking state machine
//!
//! One `step` per loop cycle decides which of the four behaviors drives the
//! offset: scan sweep, smoothed follow, hold, or ease back to neutral. The
//! controller owns no clock; callers pass the current time in seconds, which
//! keeps every transition reproducible under a simulated clock.

use glam::DMat4;

use super::scan::ScanPattern;
use super::smoothing::ExponentialSmoother;
use super::state::{Phase, TrackingState};
use super::{Frame, LinearPoseInterpolator, Perception, PoseInterpolator};
use crate::config::{ScanConfig, TrackingConfig};
use crate::error::TrackingError;
use crate::pose::Pose6;

pub struct TrackingController {
    gain: f64,
    hold_delay: f64,
    return_duration: f64,
    scan: ScanPattern,
    smoother: ExponentialSmoother,
    perception: Option<Perception>,
    interpolator: Box<dyn PoseInterpolator>,
    phase: Phase,
    /// Last enabled flag observed by `step`
    enabled: bool,
    /// Last emitted offset
    offsets: Pose6,
}

impl TrackingController {
    /// Build a controller that starts disabled and settled at neutral. The
    /// first `step` with `enabled = true` enters scanning.
    pub fn new(
        tracking: &TrackingConfig,
        scan: &ScanConfig,
        perception: Option<Perception>,
    ) -> Self {
        Self {
            gain: tracking.gain,
            hold_delay: tracking.hold_delay_secs,
            return_duration: tracking.return_duration_secs,
            scan: ScanPattern::from_config(scan),
            smoother: ExponentialSmoother::new(tracking.smoothing),
            perception,
            interpolator: Box::new(LinearPoseInterpolator),
            phase: Phase::Idle,
            enabled: false,
            offsets: Pose6::NEUTRAL,
        }
    }

    /// Replace the default linear interpolator.
    pub fn with_interpolator(mut self, interpolator: impl PoseInterpolator + 'static) -> Self {
        self.interpolator = Box::new(interpolator);
        self
    }

    /// Forget all motion state; the next `step` starts from scratch.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.enabled = false;
        self.offsets = Pose6::NEUTRAL;
        self.smoother.reset();
    }

    pub fn state(&self) -> TrackingState {
        self.phase.state(self.enabled)
    }

    /// Most recently emitted offset
    pub fn offsets(&self) -> Pose6 {
        self.offsets
    }

    /// Current smoothing accumulator
    pub fn smoothed(&self) -> Pose6 {
        self.smoother.value()
    }

    pub fn has_perception(&self) -> bool {
        self.perception.is_some()
    }

    /// Advance one cycle at time `now` (seconds) with the given frame.
    ///
    /// On error nothing but the enabled-edge bookkeeping has changed, so the
    /// previous offset stays valid.
    pub fn step(&mut self, now: f64, enabled: bool, frame: &Frame) -> Result<Pose6, TrackingError> {
        self.observe_enabled(now, enabled);

        if self.enabled {
            if let Some(target) = self.look_at_subject(frame)? {
                self.follow(now, target);
                return Ok(self.offsets);
            }
        }

        match self.phase {
            Phase::Idle => {}
            Phase::Scanning { since } => {
                self.offsets = self.scan.offset(now - since);
            }
            Phase::Tracking { last_seen } => {
                tracing::debug!("Subject lost, holding offset");
                self.phase = Phase::Waiting { since: last_seen };
                self.hold_or_return(now);
            }
            Phase::Waiting { .. } => self.hold_or_return(now),
            Phase::Returning { started_at, from } => self.advance_return(now, started_at, from),
        }

        Ok(self.offsets)
    }

    fn observe_enabled(&mut self, now: f64, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;

        if enabled {
            tracing::info!("Head tracking enabled, scanning");
            self.smoother.reset();
            self.phase = Phase::Scanning { since: now };
        } else {
            tracing::info!("Head tracking disabled, easing to neutral");
            if self.phase != Phase::Idle {
                self.phase = Phase::Waiting { since: now };
            }
        }
    }

    /// Gain-scaled look-at pose for the subject in `frame`, if one is found.
    fn look_at_subject(&mut self, frame: &Frame) -> Result<Option<Pose6>, TrackingError> {
        let Some(perception) = self.perception.as_mut() else {
            return Ok(None);
        };

        let detection = perception.detector.locate(frame)?;
        let Some(point) = detection.point else {
            return Ok(None);
        };

        let (px, py) = point.to_pixel(frame.width(), frame.height());
        let look_at = perception.solver.pose_to_look_at(px, py)?;
        let target = Pose6::from_matrix(&look_at).scale(self.gain);

        tracing::trace!(
            x = point.x,
            y = point.y,
            confidence = ?detection.confidence,
            "Subject detected"
        );

        Ok(Some(target))
    }

    fn follow(&mut self, now: f64, target: Pose6) {
        if !matches!(self.phase, Phase::Tracking { .. }) {
            tracing::debug!(from = %self.state(), "Subject acquired");
            self.smoother.seed(self.offsets);
        }
        self.offsets = self.smoother.update(target);
        self.phase = Phase::Tracking { last_seen: now };
    }

    fn hold_or_return(&mut self, now: f64) {
        let Phase::Waiting { since } = self.phase else {
            return;
        };
        if now - since < self.hold_delay {
            return;
        }

        tracing::debug!("Hold elapsed, returning to neutral");
        let from = self.offsets.to_matrix();
        self.phase = Phase::Returning {
            started_at: now,
            from,
        };
        self.advance_return(now, now, from);
    }

    fn advance_return(&mut self, now: f64, started_at: f64, from: DMat4) {
        let t = ((now - started_at) / self.return_duration).clamp(0.0, 1.0);

        if t >= 1.0 {
            self.offsets = Pose6::NEUTRAL;
            self.smoother.reset();
            self.phase = if self.enabled {
                tracing::debug!("Back at neutral, scanning");
                Phase::Scanning { since: now }
            } else {
                tracing::debug!("Back at neutral, tracking disabled");
                Phase::Idle
            };
            return;
        }

        let pose = self.interpolator.interpolate(&from, &DMat4::IDENTITY, t);
        self.offsets = Pose6::from_matrix(&pose);
    }
}
