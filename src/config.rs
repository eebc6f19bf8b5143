//! Configuration parsing and management for headtrack

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, HeadtrackError};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub scan: ScanConfig,
    pub worker: WorkerConfig,
    pub camera: CameraConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HeadtrackError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, HeadtrackError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, HeadtrackError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), HeadtrackError> {
        self.tracking.validate()?;
        self.scan.validate()?;
        self.worker.validate()?;
        self.camera.validate()?;
        Ok(())
    }
}

/// State machine tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Whether tracking is enabled when the loop starts
    pub start_enabled: bool,
    /// Multiplier applied to the raw look-at pose, in (0, 1]
    pub gain: f64,
    /// Exponential smoothing factor (weight of the new sample), in (0, 1]
    pub smoothing: f64,
    /// Seconds to hold the last offset after the subject is lost
    pub hold_delay_secs: f64,
    /// Seconds to ease from the held offset back to neutral
    pub return_duration_secs: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
            gain: 0.6,
            smoothing: 0.5,
            hold_delay_secs: 2.0,
            return_duration_secs: 1.0,
        }
    }
}

impl TrackingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !unit_interval(self.gain) {
            return Err(ConfigError::invalid(
                "tracking.gain",
                "Gain must be in (0.0, 1.0]",
            ));
        }
        if !unit_interval(self.smoothing) {
            return Err(ConfigError::invalid(
                "tracking.smoothing",
                "Smoothing factor must be in (0.0, 1.0]",
            ));
        }
        if !self.hold_delay_secs.is_finite() || self.hold_delay_secs < 0.0 {
            return Err(ConfigError::invalid(
                "tracking.hold_delay_secs",
                "Hold delay must be a non-negative number of seconds",
            ));
        }
        if !positive(self.return_duration_secs) {
            return Err(ConfigError::invalid(
                "tracking.return_duration_secs",
                "Return duration must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Scan sweep used while searching for a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Peak yaw of the sweep in radians
    pub yaw_amplitude: f64,
    /// Seconds for one full left-right-left sweep
    pub period_secs: f64,
    /// Constant pitch held while scanning, in radians (negative tilts up)
    pub pitch: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            yaw_amplitude: 0.5,
            period_secs: 8.0,
            pitch: -0.1,
        }
    }
}

impl ScanConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.yaw_amplitude.is_finite() || self.yaw_amplitude < 0.0 {
            return Err(ConfigError::invalid(
                "scan.yaw_amplitude",
                "Amplitude must be a non-negative angle in radians",
            ));
        }
        if !positive(self.period_secs) {
            return Err(ConfigError::invalid(
                "scan.period_secs",
                "Scan period must be greater than 0",
            ));
        }
        if !self.pitch.is_finite() {
            return Err(ConfigError::invalid("scan.pitch", "Pitch must be finite"));
        }
        Ok(())
    }
}

/// Worker thread pacing and lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Target cycle rate in Hz
    pub rate_hz: f64,
    /// Pause after a failed cycle, in milliseconds
    pub error_backoff_ms: u64,
    /// How long `stop` waits for the worker to exit, in milliseconds
    pub stop_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            rate_hz: 25.0,
            error_backoff_ms: 100,
            stop_timeout_ms: 2000,
        }
    }
}

impl WorkerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !positive(self.rate_hz) {
            return Err(ConfigError::invalid(
                "worker.rate_hz",
                "Rate must be greater than 0",
            ));
        }
        if Duration::try_from_secs_f64(1.0 / self.rate_hz).is_err() {
            return Err(ConfigError::invalid(
                "worker.rate_hz",
                "Rate is too small to give a representable cycle period",
            ));
        }
        Ok(())
    }

    /// Duration of one cycle. Saturates for rates `validate` rejects.
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate_hz).unwrap_or(Duration::MAX)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Camera geometry used by the pinhole solver and the synthetic camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Horizontal field of view in degrees
    pub horizontal_fov_deg: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            horizontal_fov_deg: 65.0,
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::invalid(
                "camera.width/height",
                "Image dimensions must be greater than 0",
            ));
        }
        if !(self.horizontal_fov_deg > 0.0 && self.horizontal_fov_deg < 180.0) {
            return Err(ConfigError::invalid(
                "camera.horizontal_fov_deg",
                "Field of view must be between 0 and 180 degrees",
            ));
        }
        Ok(())
    }
}

fn unit_interval(v: f64) -> bool {
    v > 0.0 && v <= 1.0
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("headtrack");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/headtrack");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/headtrack");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("headtrack");
        }
    }

    PathBuf::from(".")
}
