//! CycleDriver: paces frame acquisition, detection and the state machine
//! into a real control loop.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{error, info, info_span, warn};

use crate::integration::worker::{TimedActuator, TimedDetector};
use crate::integration::{Actuator, Detector, FrameSource};
use crate::tracker::{
    CycleOutcome, DetectorError, StatusSnapshot, TrackerConfig, TrackerError, TrackingMode,
    TrackingStateMachine,
};

/// Everything the loop thread owns while it runs.
struct LoopParts<S, D, A> {
    frames: S,
    detector: TimedDetector<D>,
    actuator: TimedActuator<A>,
    machine: TrackingStateMachine,
}

impl<S, D, A> LoopParts<S, D, A>
where
    S: FrameSource,
    D: Detector + Send + 'static,
    A: Actuator + Send + 'static,
{
    fn cycle(&mut self) -> Result<CycleOutcome, TrackerError> {
        let detections = self
            .frames
            .next_frame()
            .map_err(|err| DetectorError::Frame(err.to_string()))
            .and_then(|frame| self.detector.detect(frame));
        self.machine
            .step(Instant::now(), detections, &mut self.actuator)
    }
}

/// Status shared between the loop thread and readers.
#[derive(Default)]
struct Published {
    snapshot: StatusSnapshot,
    started: Option<Instant>,
}

type SharedStatus = Arc<Mutex<Published>>;

fn publish(shared: &SharedStatus, snapshot: StatusSnapshot) {
    let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
    guard.snapshot = snapshot;
}

/// Runs the tracking loop on a dedicated thread.
///
/// Adapters are injected at construction and each runs behind a timed
/// worker, so a hung detector or servo bus turns into that adapter's failure
/// instead of stalling the loop.
pub struct CycleDriver<S, D, A>
where
    S: FrameSource + Send + 'static,
    D: Detector + Send + 'static,
    A: Actuator + Send + 'static,
{
    parts: Option<LoopParts<S, D, A>>,
    shared: SharedStatus,
    handle: Option<JoinHandle<LoopParts<S, D, A>>>,
    stop_tx: Option<Sender<()>>,
    cycle_period: Duration,
}

impl<S, D, A> CycleDriver<S, D, A>
where
    S: FrameSource + Send + 'static,
    D: Detector + Send + 'static,
    A: Actuator + Send + 'static,
{
    /// Validate `config` and take ownership of the adapters.
    pub fn new(config: TrackerConfig, frames: S, detector: D, actuator: A) -> Result<Self, TrackerError> {
        let cycle_period = config.cycle_period;
        let timeout = config.adapter_timeout;
        let machine = TrackingStateMachine::new(config)?;
        let detector = TimedDetector::spawn(detector, timeout)
            .map_err(|err| TrackerError::Initialization(format!("detector worker: {err}")))?;
        let actuator = TimedActuator::spawn(actuator, timeout)
            .map_err(|err| TrackerError::Initialization(format!("actuator worker: {err}")))?;

        let shared: SharedStatus = Arc::new(Mutex::new(Published {
            snapshot: machine.snapshot(Duration::ZERO, false),
            started: None,
        }));
        Ok(Self {
            parts: Some(LoopParts {
                frames,
                detector,
                actuator,
                machine,
            }),
            shared,
            handle: None,
            stop_tx: None,
            cycle_period,
        })
    }

    /// Initialize both adapters, center the actuator and enter scanning,
    /// without spawning the loop thread. [`CycleDriver::run_cycle`] can then
    /// drive cycles from the caller's own loop.
    pub fn initialize(&mut self) -> Result<(), TrackerError> {
        if self.is_running() {
            return Err(TrackerError::AlreadyRunning);
        }
        self.reclaim()?;
        let parts = self.parts.as_mut().ok_or(TrackerError::LoopPanicked)?;
        initialize_parts(parts)?;
        let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        guard.started = Some(Instant::now());
        guard.snapshot = parts.machine.snapshot(Duration::ZERO, false);
        Ok(())
    }

    /// Execute one synchronous cycle. Fails with `AlreadyRunning` while the
    /// background loop owns the adapters.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, TrackerError> {
        if self.is_running() {
            return Err(TrackerError::AlreadyRunning);
        }
        self.reclaim()?;
        let parts = self.parts.as_mut().ok_or(TrackerError::LoopPanicked)?;
        let result = parts.cycle();
        let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let uptime = guard.started.map(|at| at.elapsed()).unwrap_or_default();
        guard.snapshot = parts.machine.snapshot(uptime, false);
        result
    }

    /// Initialize the adapters (if not already) and spawn the loop thread.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        if self.is_running() {
            return Err(TrackerError::AlreadyRunning);
        }
        self.reclaim()?;
        // Parts are only missing after the loop thread panicked
        let mut parts = self.parts.take().ok_or(TrackerError::LoopPanicked)?;
        if parts.machine.mode() == TrackingMode::Standby {
            if let Err(err) = initialize_parts(&mut parts) {
                self.parts = Some(parts);
                return Err(err);
            }
        }

        let started = Instant::now();
        {
            let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            guard.started = Some(started);
            guard.snapshot = parts.machine.snapshot(Duration::ZERO, true);
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let shared = self.shared.clone();
        let period = self.cycle_period;
        let spawned = thread::Builder::new()
            .name("tracking-loop".into())
            .spawn(move || run_loop(parts, stop_rx, shared, period, started));
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.stop_tx = Some(stop_tx);
                info!(period = ?period, "tracking loop started");
                Ok(())
            }
            Err(err) => Err(TrackerError::Initialization(format!(
                "failed to spawn tracking loop: {err}"
            ))),
        }
    }

    /// Request a cooperative stop and wait for the in-flight cycle to finish.
    ///
    /// The actuator is returned to center and the machine left in standby.
    pub fn stop(&mut self) -> Result<(), TrackerError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        self.reclaim()?;
        if let Some(parts) = self.parts.as_mut() {
            if parts.machine.mode() != TrackingMode::Standby {
                parts.machine.stop(&mut parts.actuator);
            }
            let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            let uptime = guard.started.map(|at| at.elapsed()).unwrap_or_default();
            guard.snapshot = parts.machine.snapshot(uptime, false);
        }
        Ok(())
    }

    /// Stop the loop and hand back the adapters.
    ///
    /// Returns `None` when an adapter's worker thread died, in which case that
    /// adapter is lost.
    pub fn into_adapters(mut self) -> Result<Option<(S, D, A)>, TrackerError> {
        self.stop()?;
        let Some(parts) = self.parts.take() else {
            return Ok(None);
        };
        let detector = parts.detector.into_inner();
        let actuator = parts.actuator.into_inner();
        Ok(detector.zip(actuator).map(|(detector, actuator)| (parts.frames, detector, actuator)))
    }

    /// Whether the loop thread is currently cycling.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Consistent point-in-time snapshot of the loop state.
    pub fn status(&self) -> StatusSnapshot {
        let guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = guard.snapshot.clone();
        if snapshot.is_running {
            snapshot.uptime = guard.started.map(|at| at.elapsed()).unwrap_or_default();
        }
        snapshot
    }

    /// Join a finished or stopping loop thread and take its parts back.
    fn reclaim(&mut self) -> Result<(), TrackerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(parts) => {
                self.stop_tx = None;
                self.parts = Some(parts);
                Ok(())
            }
            Err(_) => {
                self.stop_tx = None;
                let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
                guard.snapshot.is_running = false;
                guard.snapshot.last_error = Some(TrackerError::LoopPanicked.to_string());
                Err(TrackerError::LoopPanicked)
            }
        }
    }
}

impl<S, D, A> Drop for CycleDriver<S, D, A>
where
    S: FrameSource + Send + 'static,
    D: Detector + Send + 'static,
    A: Actuator + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Ok(parts) = handle.join() {
                self.parts = Some(parts);
            }
        }
        // Leave the servos centered even when driven through run_cycle
        if let Some(parts) = self.parts.as_mut() {
            if parts.machine.mode() != TrackingMode::Standby {
                parts.machine.stop(&mut parts.actuator);
            }
        }
    }
}

fn initialize_parts<S, D, A>(parts: &mut LoopParts<S, D, A>) -> Result<(), TrackerError>
where
    S: FrameSource,
    D: Detector + Send + 'static,
    A: Actuator + Send + 'static,
{
    parts
        .detector
        .initialize()
        .map_err(|err| TrackerError::Initialization(format!("detector: {err}")))?;
    parts
        .actuator
        .initialize()
        .map_err(|err| TrackerError::Initialization(format!("actuator: {err}")))?;
    info!("adapters initialized");
    parts.machine.start(&mut parts.actuator)
}

fn run_loop<S, D, A>(
    mut parts: LoopParts<S, D, A>,
    stop_rx: Receiver<()>,
    shared: SharedStatus,
    period: Duration,
    started: Instant,
) -> LoopParts<S, D, A>
where
    S: FrameSource,
    D: Detector + Send + 'static,
    A: Actuator + Send + 'static,
{
    let span = info_span!("tracking.loop", period_ms = period.as_millis() as u64);
    let _guard = span.enter();

    loop {
        let cycle_start = Instant::now();
        let result = parts.cycle();
        let fatal = match result {
            Err(err) if err.is_fatal() => {
                error!("tracking suspended: {err}");
                true
            }
            Err(err) => {
                warn!("cycle failed: {err}");
                false
            }
            Ok(_) => false,
        };
        publish(&shared, parts.machine.snapshot(started.elapsed(), !fatal));
        if fatal {
            break;
        }

        // Sleep out the rest of the period; a stop request cuts the sleep short.
        let remaining = period.saturating_sub(cycle_start.elapsed());
        match stop_rx.recv_timeout(remaining) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                parts.machine.stop(&mut parts.actuator);
                publish(&shared, parts.machine.snapshot(started.elapsed(), false));
                info!("tracking loop stopped");
                break;
            }
        }
    }
    parts
}
