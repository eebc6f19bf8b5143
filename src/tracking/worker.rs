//! Tracking loop worker thread
//!
//! Polls the frame source at a fixed rate, runs the controller and publishes
//! the latest frame and offsets. Each published value has its own short
//! lock and readers always receive copies, so a slow collaborator only ever
//! delays the worker thread.
//!
//! Shutdown is cooperative: `stop` signals the worker and waits up to
//! `worker.stop_timeout_ms` for it to exit. A collaborator that blocks
//! without bound can outlast that wait. The thread is then left to drain
//! rather than killed, and `start` only spawns a new worker once the old one
//! has exited and handed its engine back.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::controller::TrackingController;
use super::state::TrackingState;
use super::{Frame, FrameSource};
use crate::config::{Config, WorkerConfig};
use crate::error::{HeadtrackError, TrackingError};
use crate::pose::Pose6;

/// State visible to reader threads
struct Shared {
    frame: Mutex<Option<Frame>>,
    offsets: Mutex<Pose6>,
    state: Mutex<TrackingState>,
    enabled: AtomicBool,
}

/// Everything the worker thread owns while it runs
struct Engine {
    source: Box<dyn FrameSource>,
    controller: TrackingController,
}

impl Engine {
    fn cycle(&mut self, shared: &Shared, now: f64) -> Result<(), TrackingError> {
        let Some(frame) = self.source.get_frame()? else {
            return Ok(());
        };
        *shared.frame.lock() = Some(frame.clone());

        let enabled = shared.enabled.load(Ordering::Acquire);
        let offsets = self.controller.step(now, enabled, &frame)?;

        *shared.offsets.lock() = offsets;
        *shared.state.lock() = self.controller.state();
        Ok(())
    }
}

/// Handles for a running worker
struct Worker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<Engine>,
}

/// Background head-tracking loop
pub struct TrackingLoop {
    shared: Arc<Shared>,
    config: WorkerConfig,
    engine: Mutex<Option<Engine>>,
    worker: Mutex<Option<Worker>>,
    /// Worker that overran the stop wait and has not been joined yet
    draining: Mutex<Option<Worker>>,
}

impl TrackingLoop {
    /// Create a stopped loop. Validates `config`.
    pub fn new(
        config: &Config,
        source: Box<dyn FrameSource>,
        controller: TrackingController,
    ) -> Result<Self, HeadtrackError> {
        config.validate()?;

        if !controller.has_perception() {
            tracing::warn!("No detector configured; head tracking will only scan");
        }

        Ok(Self {
            shared: Arc::new(Shared {
                frame: Mutex::new(None),
                offsets: Mutex::new(Pose6::NEUTRAL),
                state: Mutex::new(TrackingState::Disabled),
                enabled: AtomicBool::new(config.tracking.start_enabled),
            }),
            config: config.worker.clone(),
            engine: Mutex::new(Some(Engine { source, controller })),
            worker: Mutex::new(None),
            draining: Mutex::new(None),
        })
    }

    /// Copy of the most recent frame, or `None` before the first one arrives.
    pub fn get_latest_frame(&self) -> Option<Frame> {
        self.shared.frame.lock().clone()
    }

    /// Most recent head offsets.
    pub fn get_offsets(&self) -> Pose6 {
        *self.shared.offsets.lock()
    }

    /// State as of the last completed cycle.
    pub fn state(&self) -> TrackingState {
        *self.shared.state.lock()
    }

    pub fn is_tracking_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Toggle tracking. The loop reacts to the change on its next cycle.
    pub fn set_tracking_enabled(&self, enabled: bool) {
        let previous = self.shared.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            tracing::info!(
                "Head tracking {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Spawn the worker thread. Does nothing if it is already running, or
    /// if a previous worker is still draining after a timed-out `stop`.
    pub fn start(&self) -> Result<(), TrackingError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            tracing::debug!("Tracking loop already running");
            return Ok(());
        }

        let Some(mut engine) = self.reclaim_engine() else {
            return Ok(());
        };
        engine.controller.reset();
        *self.shared.frame.lock() = None;
        *self.shared.offsets.lock() = Pose6::NEUTRAL;
        *self.shared.state.lock() = TrackingState::Disabled;

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (done_tx, done_rx) = bounded::<()>(0);
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("head-tracking".to_string())
            .spawn(move || run_loop(engine, shared, config, stop_rx, done_tx))
            .map_err(|e| TrackingError::Spawn(e.to_string()))?;

        *worker = Some(Worker {
            stop_tx,
            done_rx,
            handle,
        });

        tracing::info!("Tracking loop started ({} Hz)", self.config.rate_hz);
        Ok(())
    }

    /// Signal the worker and wait (bounded) for it to exit. Safe to call
    /// when not running.
    pub fn stop(&self) {
        // Held until the engine is back so a concurrent `start` waits for us
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            tracing::debug!("Tracking loop not running");
            return;
        };

        let _ = worker.stop_tx.send(());

        match worker.done_rx.recv_timeout(self.config.stop_timeout()) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Tracking worker did not exit within {:?}; leaving it to drain",
                    self.config.stop_timeout()
                );
                *self.draining.lock() = Some(worker);
                return;
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
        }

        if let Some(engine) = join_worker(worker) {
            *self.engine.lock() = Some(engine);
        }

        tracing::info!("Tracking loop stopped");
    }

    /// Take the engine back, joining a drained worker if it has exited.
    fn reclaim_engine(&self) -> Option<Engine> {
        if let Some(engine) = self.engine.lock().take() {
            return Some(engine);
        }

        let mut draining = self.draining.lock();
        match draining.take() {
            Some(previous) if previous.handle.is_finished() => {
                tracing::debug!("Previous tracking worker has exited, reclaiming it");
                join_worker(previous)
            }
            Some(previous) => {
                tracing::warn!("Previous tracking worker is still running; not starting yet");
                *draining = Some(previous);
                None
            }
            None => {
                tracing::error!("Tracking engine was lost; loop cannot start");
                None
            }
        }
    }
}

fn join_worker(worker: Worker) -> Option<Engine> {
    match worker.handle.join() {
        Ok(engine) => Some(engine),
        Err(_) => {
            tracing::error!("Tracking worker panicked during shutdown");
            None
        }
    }
}

impl Drop for TrackingLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker thread body. `done_tx` is dropped on return, which tells `stop`
/// the thread is about to finish.
fn run_loop(
    mut engine: Engine,
    shared: Arc<Shared>,
    config: WorkerConfig,
    stop_rx: Receiver<()>,
    done_tx: Sender<()>,
) -> Engine {
    let period = config.period();
    let backoff = config.error_backoff();
    let epoch = Instant::now();

    tracing::debug!("Tracking worker started");

    loop {
        let cycle_start = Instant::now();
        let now = epoch.elapsed().as_secs_f64();

        let outcome = catch_unwind(AssertUnwindSafe(|| engine.cycle(&shared, now)))
            .unwrap_or_else(|panic| Err(TrackingError::Panicked(panic_message(&*panic))));

        let pause = match outcome {
            Ok(()) => period.saturating_sub(cycle_start.elapsed()),
            Err(e) => {
                tracing::error!("Tracking cycle failed: {}", e);
                backoff
            }
        };

        if should_stop(&stop_rx, pause) {
            break;
        }
    }

    tracing::debug!("Tracking worker exiting");
    drop(done_tx);
    engine
}

/// Sleep for `pause`, waking early on a stop signal.
fn should_stop(stop_rx: &Receiver<()>, pause: Duration) -> bool {
    match stop_rx.recv_timeout(pause) {
        Err(RecvTimeoutError::Timeout) => false,
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::testing::{Camera, CameraMode, Subject};
    use crate::tracking::{Perception, PinholeSolver};

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.worker.rate_hz = 200.0;
        config.worker.error_backoff_ms = 5;
        config.worker.stop_timeout_ms = 1000;
        config.tracking.hold_delay_secs = 0.05;
        config.tracking.return_duration_secs = 0.05;
        config
    }

    fn tracking_loop(config: &Config, camera: &Camera, subject: &Subject) -> TrackingLoop {
        let perception = Perception::new(
            subject.clone(),
            PinholeSolver::from_config(&config.camera),
        );
        let controller = TrackingController::new(&config.tracking, &config.scan, Some(perception));
        TrackingLoop::new(config, Box::new(camera.clone()), controller).unwrap()
    }

    /// Poll `cond` until it holds or two seconds pass.
    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_no_frame_before_start() {
        let config = fast_config();
        let tl = tracking_loop(&config, &Camera::new(CameraMode::Streaming), &Subject::default());

        assert!(tl.get_latest_frame().is_none());
        assert_eq!(tl.get_offsets(), Pose6::NEUTRAL);
        assert_eq!(tl.state(), TrackingState::Disabled);
    }

    #[test]
    fn test_starved_source_yields_no_frame() {
        let config = fast_config();
        let camera = Camera::new(CameraMode::Starved);
        let tl = tracking_loop(&config, &camera, &Subject::default());

        tl.start().unwrap();
        assert!(wait_for(|| camera.polls() > 5));
        assert!(tl.get_latest_frame().is_none());
        assert!(tl.is_running());
        tl.stop();
    }

    #[test]
    fn test_frames_and_tracking_published() {
        let config = fast_config();
        let camera = Camera::new(CameraMode::Streaming);
        let subject = Subject::default();
        let tl = tracking_loop(&config, &camera, &subject);

        tl.start().unwrap();
        assert!(wait_for(|| tl.get_latest_frame().is_some()));
        assert!(wait_for(|| tl.state() == TrackingState::Scanning));

        subject.show(0.5, 0.0);
        assert!(wait_for(|| tl.state() == TrackingState::Tracking));
        assert!(wait_for(|| tl.get_offsets().yaw < -0.01));
        assert!(tl.get_offsets().is_finite());

        let frame = tl.get_latest_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 480));
        tl.stop();
    }

    #[test]
    fn test_disable_settles_at_neutral() {
        let config = fast_config();
        let camera = Camera::new(CameraMode::Streaming);
        let subject = Subject::default();
        let tl = tracking_loop(&config, &camera, &subject);

        subject.show(-0.5, 0.2);
        tl.start().unwrap();
        assert!(wait_for(|| tl.state() == TrackingState::Tracking));

        tl.set_tracking_enabled(false);
        assert!(!tl.is_tracking_enabled());
        assert!(wait_for(|| tl.state() == TrackingState::Disabled));
        assert!(wait_for(|| tl.get_offsets().is_neutral()));

        tl.set_tracking_enabled(true);
        tl.set_tracking_enabled(true);
        assert!(wait_for(|| tl.state() == TrackingState::Tracking));
        tl.stop();
    }

    #[test]
    fn test_failures_do_not_kill_loop() {
        let config = fast_config();
        let camera = Camera::new(CameraMode::Streaming);
        let subject = Subject::default();
        let tl = tracking_loop(&config, &camera, &subject);

        subject.show(0.3, 0.3);
        tl.start().unwrap();
        assert!(wait_for(|| tl.state() == TrackingState::Tracking));
        assert!(wait_for(|| !tl.get_offsets().is_neutral()));

        subject.fail();
        camera.set_mode(CameraMode::Failing);
        let polls = camera.polls();
        assert!(wait_for(|| camera.polls() > polls + 3));
        let held = tl.get_offsets();
        assert!(held.is_finite());
        assert!(!held.is_neutral());
        assert!(tl.get_latest_frame().is_some());

        camera.set_mode(CameraMode::Panicking);
        let polls = camera.polls();
        assert!(wait_for(|| camera.polls() > polls + 3));

        camera.set_mode(CameraMode::Streaming);
        subject.show(0.3, 0.3);
        let polls = camera.polls();
        assert!(wait_for(|| camera.polls() > polls + 3));
        assert!(tl.is_running());
        assert_eq!(tl.state(), TrackingState::Tracking);
        tl.stop();
    }

    #[test]
    fn test_lifecycle_is_idempotent() {
        let config = fast_config();
        let camera = Camera::new(CameraMode::Streaming);
        let tl = tracking_loop(&config, &camera, &Subject::default());

        tl.stop();
        tl.start().unwrap();
        tl.start().unwrap();
        assert!(wait_for(|| tl.get_latest_frame().is_some()));
        tl.stop();
        tl.stop();
        assert!(!tl.is_running());

        let polls = camera.polls();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(camera.polls(), polls, "worker still polling after stop");

        // Restart runs a fresh controller
        tl.start().unwrap();
        assert!(wait_for(|| camera.polls() > polls + 3));
        assert!(wait_for(|| tl.state() == TrackingState::Scanning));
        tl.stop();
    }

    #[test]
    fn test_restart_after_stop_times_out() {
        let mut config = fast_config();
        config.worker.stop_timeout_ms = 50;
        let camera = Camera::new(CameraMode::Streaming);
        let tl = tracking_loop(&config, &camera, &Subject::default());

        tl.start().unwrap();
        assert!(wait_for(|| tl.get_latest_frame().is_some()));

        camera.set_mode(CameraMode::Stalling(Duration::from_millis(300)));
        let polls = camera.polls();
        assert!(wait_for(|| camera.polls() > polls));

        let begun = Instant::now();
        tl.stop();
        let waited = begun.elapsed();
        assert!(waited >= Duration::from_millis(45), "stop returned after {:?}", waited);
        assert!(waited < Duration::from_millis(250), "stop returned after {:?}", waited);
        assert!(!tl.is_running());

        // Old worker is still inside the stalled poll
        tl.start().unwrap();
        assert!(!tl.is_running());

        assert!(wait_for(|| {
            tl.start().unwrap();
            tl.is_running()
        }));
        let polls = camera.polls();
        assert!(wait_for(|| camera.polls() > polls + 3));
        assert!(wait_for(|| tl.state() == TrackingState::Scanning));

        tl.stop();
        assert!(!tl.is_running());
    }

    #[test]
    fn test_starts_disabled_when_configured() {
        let mut config = fast_config();
        config.tracking.start_enabled = false;
        let camera = Camera::new(CameraMode::Streaming);
        let subject = Subject::default();
        subject.show(0.5, 0.5);
        let tl = tracking_loop(&config, &camera, &subject);

        tl.start().unwrap();
        assert!(wait_for(|| camera.polls() > 5));
        assert_eq!(tl.state(), TrackingState::Disabled);
        assert!(tl.get_offsets().is_neutral());
        assert_eq!(subject.calls(), 0);
        tl.stop();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = fast_config();
        config.tracking.gain = 2.0;
        let controller = TrackingController::new(&config.tracking, &config.scan, None);
        let result = TrackingLoop::new(
            &config,
            Box::new(Camera::new(CameraMode::Streaming)),
            controller,
        );
        assert!(result.is_err());
    }
}
