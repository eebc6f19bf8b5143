//! Tracking state machine states

use glam::DMat4;

/// Externally visible state of the tracking loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    /// Tracking administratively off (easing back to neutral, or settled there)
    Disabled,
    /// Sweeping the room looking for a subject
    Scanning,
    /// Following a detected subject
    Tracking,
    /// Subject lost, holding the last offset
    Waiting,
    /// Easing from the held offset back to neutral
    Returning,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::Disabled
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Disabled => write!(f, "disabled"),
            TrackingState::Scanning => write!(f, "scanning"),
            TrackingState::Tracking => write!(f, "tracking"),
            TrackingState::Waiting => write!(f, "waiting"),
            TrackingState::Returning => write!(f, "returning"),
        }
    }
}

/// Internal phase with the timestamps each state measures against.
/// Times are seconds on the controller's clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Phase {
    /// Settled at neutral with tracking disabled
    Idle,
    Scanning { since: f64 },
    Tracking { last_seen: f64 },
    /// `since` is the last detection, or the moment tracking was disabled
    Waiting { since: f64 },
    Returning { started_at: f64, from: DMat4 },
}

impl Phase {
    pub(crate) fn state(&self, enabled: bool) -> TrackingState {
        if !enabled {
            return TrackingState::Disabled;
        }
        match self {
            Phase::Idle => TrackingState::Disabled,
            Phase::Scanning { .. } => TrackingState::Scanning,
            Phase::Tracking { .. } => TrackingState::Tracking,
            Phase::Waiting { .. } => TrackingState::Waiting,
            Phase::Returning { .. } => TrackingState::Returning,
        }
    }
}
