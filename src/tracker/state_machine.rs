//! Mode state machine driving the pan/tilt actuator.

use std::time::{Duration, Instant};

use nalgebra::Point2;
use tracing::{debug, error, info, warn};

use crate::integration::Actuator;
use crate::tracker::angles::{Angles, Axis};
use crate::tracker::config::{ACTUATOR_RETRIES, CorrectionLaw, TrackerConfig};
use crate::tracker::correction::{Correction, CorrectionStats, compute_correction, pixel_error};
use crate::tracker::detection::Detection;
use crate::tracker::error::{ConfigError, DetectorError, TrackerError};
use crate::tracker::mode::TrackingMode;
use crate::tracker::pid::PidCorrection;
use crate::tracker::scan::ScanPatternGenerator;
use crate::tracker::selection::{TargetFilter, select_target};
use crate::tracker::status::StatusSnapshot;

/// Mutable control state, updated once per cycle.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    pub mode: TrackingMode,
    /// Last commanded position; always inside the configured ranges
    pub angles: Angles,
    pub last_detection: Option<Instant>,
    pub total_detections: u64,
    pub last_correction: Correction,
    pub target_detected: bool,
    pub target_class: Option<String>,
    pub target_confidence: f32,
    pub last_error: Option<TrackerError>,
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// In standby; nothing was commanded.
    Idle,
    /// A target was corrected towards.
    Tracked { angles: Angles, correction: Correction },
    /// Target momentarily missing; last angle held.
    Holding { since_detection: Duration },
    /// A scan waypoint was commanded.
    Scanned { waypoint: Angles },
}

/// Owns the tracking mode and decides each cycle between correcting,
/// holding and scanning.
pub struct TrackingStateMachine {
    config: TrackerConfig,
    image_center: Point2<f64>,
    filter: TargetFilter,
    scan: ScanPatternGenerator,
    state: ControlState,
    stats: CorrectionStats,
    /// Present when the PID law is configured
    pid: Option<PidCorrection>,
    detector_failures: u32,
}

impl TrackingStateMachine {
    /// Validate `config` and build a machine in standby.
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pid = match &config.correction {
            CorrectionLaw::Proportional => None,
            CorrectionLaw::Pid(pid) => Some(PidCorrection::new(pid, config.controller.max_correction)),
        };
        let filter = TargetFilter {
            min_confidence: config.min_confidence,
            classes: config.target_classes.clone(),
        };
        Ok(Self {
            image_center: config.controller.image_center(),
            scan: ScanPatternGenerator::new(&config),
            filter,
            state: ControlState::default(),
            stats: CorrectionStats::default(),
            pid,
            detector_failures: 0,
            config,
        })
    }

    /// Current mode.
    pub fn mode(&self) -> TrackingMode {
        self.state.mode
    }

    /// Control state as of the last cycle.
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Validated configuration the machine runs with.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Diagnostics over every correction computed so far.
    pub fn correction_stats(&self) -> &CorrectionStats {
        &self.stats
    }

    /// PID controllers, when the PID correction law is configured.
    pub fn pid(&self) -> Option<&PidCorrection> {
        self.pid.as_ref()
    }

    /// Center the actuator, leave standby and begin scanning.
    ///
    /// The actuator must already be initialized. Centering goes through the
    /// machine so the cached angles match the hardware; if it fails the
    /// machine stays in standby.
    pub fn start<A: Actuator + ?Sized>(&mut self, actuator: &mut A) -> Result<(), TrackerError> {
        if self.state.mode != TrackingMode::Standby {
            return Ok(());
        }
        actuator
            .move_to_center()
            .map_err(|err| TrackerError::Initialization(format!("actuator: {err}")))?;
        self.state.angles = Angles::CENTER;
        self.state.last_detection = None;
        self.state.last_correction = Correction::ZERO;
        info!(mode = "scanning", "tracking started");
        self.state.mode = TrackingMode::Scanning;
        self.state.last_error = None;
        self.detector_failures = 0;
        self.scan.reset();
        Ok(())
    }

    /// Explicit stop request: enter standby and return to center.
    pub fn stop<A: Actuator + ?Sized>(&mut self, actuator: &mut A) {
        if self.state.mode != TrackingMode::Standby {
            info!(from = self.state.mode.label(), "stop requested");
        }
        self.state.mode = TrackingMode::Standby;
        self.state.target_detected = false;
        self.scan.reset();
        self.return_to_center(actuator);
    }

    /// Run one control cycle.
    ///
    /// `detections` is this cycle's detector result; `now` is the cycle's
    /// timestamp and drives the loss timeout. Adapter failures are converted
    /// into mode changes here: a returned error means the machine is now in
    /// standby.
    pub fn step<A: Actuator + ?Sized>(
        &mut self,
        now: Instant,
        detections: Result<Vec<Detection>, DetectorError>,
        actuator: &mut A,
    ) -> Result<CycleOutcome, TrackerError> {
        if self.state.mode == TrackingMode::Standby {
            return Ok(CycleOutcome::Idle);
        }

        let detections = match detections {
            Ok(detections) => {
                self.detector_failures = 0;
                detections
            }
            Err(err) => {
                self.detector_failures += 1;
                if !err.is_transient() || self.detector_failures > self.config.detector_retry_budget {
                    let fatal = TrackerError::Detector {
                        consecutive: self.detector_failures,
                        source: err,
                    };
                    return Err(self.enter_standby(actuator, fatal));
                }
                warn!(
                    consecutive = self.detector_failures,
                    budget = self.config.detector_retry_budget,
                    "detector failed, treating as empty cycle: {err}"
                );
                Vec::new()
            }
        };

        match select_target(&detections, &self.filter).cloned() {
            Some(target) => self.track(now, &target, actuator),
            None => self.without_target(now, actuator),
        }
    }

    /// Point-in-time status; `uptime` and `is_running` come from the driver.
    pub fn snapshot(&self, uptime: Duration, is_running: bool) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.state.mode,
            pan_angle: self.state.angles.pan,
            tilt_angle: self.state.angles.tilt,
            target_detected: self.state.target_detected,
            target_class: self.state.target_class.clone(),
            target_confidence: self.state.target_confidence,
            correction_applied: self.state.last_correction,
            total_detections: self.state.total_detections,
            uptime,
            is_running,
            last_error: self.state.last_error.as_ref().map(ToString::to_string),
        }
    }

    fn track<A: Actuator + ?Sized>(
        &mut self,
        now: Instant,
        target: &Detection,
        actuator: &mut A,
    ) -> Result<CycleOutcome, TrackerError> {
        if self.state.mode == TrackingMode::Scanning {
            info!(
                class = %target.class_name,
                confidence = target.confidence,
                "target acquired, tracking"
            );
            self.state.mode = TrackingMode::Tracking;
            self.scan.reset();
            if let Some(pid) = self.pid.as_mut() {
                pid.reset();
            }
        }

        self.state.last_detection = Some(now);
        self.state.total_detections += 1;
        self.state.target_detected = true;
        self.state.target_class = Some(target.class_name.clone());
        self.state.target_confidence = target.confidence;

        let center = target.center();
        let correction = match self.pid.as_mut() {
            Some(pid) => pid.update(
                pixel_error(center, self.image_center, self.config.controller.deadband),
                now,
            ),
            None => compute_correction(center, self.image_center, &self.config.controller),
        };
        self.stats.record(center, self.image_center, &correction);

        let controller = &self.config.controller;
        let next = Angles::new(
            self.state.angles.pan + correction.pan,
            self.state.angles.tilt + correction.tilt,
        )
        .clamped(&controller.pan_range, &controller.tilt_range);
        debug!(
            x = center.x,
            y = center.y,
            pan_delta = correction.pan,
            tilt_delta = correction.tilt,
            pan = next.pan,
            tilt = next.tilt,
            "correction"
        );

        self.command(next, actuator)?;
        self.state.last_correction = correction;
        Ok(CycleOutcome::Tracked {
            angles: next,
            correction,
        })
    }

    fn without_target<A: Actuator + ?Sized>(
        &mut self,
        now: Instant,
        actuator: &mut A,
    ) -> Result<CycleOutcome, TrackerError> {
        self.state.target_detected = false;

        if self.state.mode == TrackingMode::Tracking {
            let since_detection = self
                .state
                .last_detection
                .map(|at| now.saturating_duration_since(at))
                .unwrap_or(Duration::MAX);
            if since_detection <= self.config.loss_timeout {
                return Ok(CycleOutcome::Holding { since_detection });
            }
            info!(
                lost_for = ?since_detection,
                "target lost, scanning"
            );
            self.state.mode = TrackingMode::Scanning;
            self.scan.reset();
        }

        let waypoint = self.scan.next_waypoint();
        self.command(waypoint, actuator)?;
        Ok(CycleOutcome::Scanned { waypoint })
    }

    /// The single point where angles reach the actuator.
    fn command<A: Actuator + ?Sized>(
        &mut self,
        target: Angles,
        actuator: &mut A,
    ) -> Result<(), TrackerError> {
        if let Err(violation) = self.check_safety(target) {
            error!("{violation}; emergency stop");
            if let Err(err) = actuator.emergency_stop() {
                error!("emergency stop failed: {err}");
            }
            self.state.mode = TrackingMode::Standby;
            self.state.last_error = Some(violation.clone());
            return Err(violation);
        }

        let mut attempt = 0;
        loop {
            match actuator.set_angles(target.pan, target.tilt) {
                Ok(()) => {
                    self.state.angles = target;
                    return Ok(());
                }
                Err(err) if attempt < ACTUATOR_RETRIES => {
                    attempt += 1;
                    warn!(attempt, "actuator command failed, retrying: {err}");
                }
                Err(err) => {
                    let fatal = TrackerError::Actuator {
                        axis: err.axis(),
                        source: err,
                    };
                    return Err(self.enter_standby(actuator, fatal));
                }
            }
        }
    }

    fn check_safety(&self, target: Angles) -> Result<(), TrackerError> {
        let controller = &self.config.controller;
        for (axis, angle) in [(Axis::Pan, target.pan), (Axis::Tilt, target.tilt)] {
            let range = controller.range(axis);
            if !range.contains(angle) {
                return Err(TrackerError::SafetyViolation {
                    axis,
                    angle,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    fn enter_standby<A: Actuator + ?Sized>(
        &mut self,
        actuator: &mut A,
        cause: TrackerError,
    ) -> TrackerError {
        error!(from = self.state.mode.label(), "entering standby: {cause}");
        self.state.mode = TrackingMode::Standby;
        self.state.target_detected = false;
        self.scan.reset();
        self.return_to_center(actuator);
        self.state.last_error = Some(cause.clone());
        cause
    }

    fn return_to_center<A: Actuator + ?Sized>(&mut self, actuator: &mut A) {
        match actuator.move_to_center() {
            Ok(()) => self.state.angles = Angles::CENTER,
            Err(err) => warn!("could not return to center, holding last position: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::angles::AxisRange;
    use crate::tracker::config::{ControllerConfig, ScanConfig};
    use crate::tracker::error::ActuatorError;
    use crate::tracker::pid::{PidConfig, PidGains};
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct RecordingActuator {
        commands: Vec<Angles>,
        failures_left: u32,
        centered: u32,
        center_fails: bool,
        stopped: bool,
    }

    impl Actuator for RecordingActuator {
        fn set_angles(&mut self, pan: f64, tilt: f64) -> Result<(), ActuatorError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(ActuatorError::Hardware {
                    axis: Axis::Pan,
                    message: "bus error".into(),
                });
            }
            self.commands.push(Angles::new(pan, tilt));
            Ok(())
        }

        fn get_angles(&mut self) -> Result<Angles, ActuatorError> {
            Ok(self.commands.last().copied().unwrap_or_default())
        }

        fn move_to_center(&mut self) -> Result<(), ActuatorError> {
            if self.center_fails {
                return Err(ActuatorError::NotReady("bus down".into()));
            }
            self.centered += 1;
            Ok(())
        }

        fn emergency_stop(&mut self) -> Result<(), ActuatorError> {
            self.stopped = true;
            Ok(())
        }
    }

    fn started(config: TrackerConfig) -> TrackingStateMachine {
        let mut machine = TrackingStateMachine::new(config).unwrap();
        machine.start(&mut RecordingActuator::default()).unwrap();
        machine
    }

    fn machine() -> TrackingStateMachine {
        started(TrackerConfig::default())
    }

    fn dog_at(cx: f32, cy: f32) -> Detection {
        Detection::new(16, "dog", 0.9, cx - 20.0, cy - 20.0, cx + 20.0, cy + 20.0)
    }

    #[test]
    fn test_standby_is_idle() {
        let mut machine = TrackingStateMachine::new(TrackerConfig::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        let outcome = machine
            .step(Instant::now(), Ok(vec![dog_at(400.0, 240.0)]), &mut actuator)
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
        assert!(actuator.commands.is_empty());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = TrackerConfig::default();
        config.controller.image_width = 0;
        assert!(TrackingStateMachine::new(config).is_err());
    }

    #[test]
    fn test_scanning_to_tracking_applies_correction() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let outcome = machine
            .step(Instant::now(), Ok(vec![dog_at(340.0, 200.0)]), &mut actuator)
            .unwrap();
        assert_eq!(machine.mode(), TrackingMode::Tracking);
        match outcome {
            CycleOutcome::Tracked { angles, .. } => {
                assert_relative_eq!(angles.pan, 0.312, epsilon = 1e-9);
                assert_relative_eq!(angles.tilt, 0.832, epsilon = 1e-9);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(machine.state().total_detections, 1);
        assert_eq!(machine.state().target_class.as_deref(), Some("dog"));
    }

    #[test]
    fn test_corrections_accumulate() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let now = Instant::now();
        for _ in 0..3 {
            machine
                .step(now, Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
                .unwrap();
        }
        let expected = 3.0 * 100.0 * 0.0156;
        assert_relative_eq!(machine.state().angles.pan, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_loss_timeout_holds_then_scans() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        machine
            .step(t0, Ok(vec![dog_at(400.0, 240.0)]), &mut actuator)
            .unwrap();
        let held = machine.state().angles;
        let commands = actuator.commands.len();

        let outcome = machine
            .step(t0 + Duration::from_millis(2900), Ok(vec![]), &mut actuator)
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Holding { .. }));
        assert_eq!(machine.mode(), TrackingMode::Tracking);
        assert_eq!(machine.state().angles, held);
        assert_eq!(actuator.commands.len(), commands);

        let outcome = machine
            .step(t0 + Duration::from_millis(3100), Ok(vec![]), &mut actuator)
            .unwrap();
        assert_eq!(machine.mode(), TrackingMode::Scanning);
        // First scan waypoint after re-entering scanning
        assert_eq!(
            outcome,
            CycleOutcome::Scanned {
                waypoint: Angles::new(-90.0, 0.0)
            }
        );
    }

    #[test]
    fn test_detection_resets_loss_timer() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        let dog = || Ok(vec![dog_at(320.0, 240.0)]);
        machine.step(t0, dog(), &mut actuator).unwrap();
        machine
            .step(t0 + Duration::from_secs(2), dog(), &mut actuator)
            .unwrap();
        machine
            .step(t0 + Duration::from_millis(4500), Ok(vec![]), &mut actuator)
            .unwrap();
        assert_eq!(machine.mode(), TrackingMode::Tracking);
    }

    #[test]
    fn test_low_confidence_does_not_qualify() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let mut faint = dog_at(400.0, 240.0);
        faint.confidence = 0.2;
        let outcome = machine
            .step(Instant::now(), Ok(vec![faint]), &mut actuator)
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Scanned { .. }));
        assert_eq!(machine.state().total_detections, 0);
    }

    #[test]
    fn test_commanded_angles_stay_in_range() {
        let config = TrackerConfig {
            controller: ControllerConfig {
                pan_gain: 0.5,
                tilt_gain: 0.5,
                max_correction: 30.0,
                ..ControllerConfig::default()
            },
            scan: ScanConfig {
                tilt_bands: vec![-45.0, 45.0],
                ..ScanConfig::default()
            },
            ..TrackerConfig::default()
        };
        let mut machine = started(config);
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        // Drive hard into the top-right, then the bottom-left corner
        for i in 0..20u64 {
            let (x, y) = if i < 10 { (639.0, 0.0) } else { (0.0, 479.0) };
            let now = t0 + Duration::from_millis(100 * i);
            machine
                .step(now, Ok(vec![dog_at(x, y)]), &mut actuator)
                .unwrap();
        }
        for i in 0..30 {
            let now = t0 + Duration::from_secs(10 + i);
            machine.step(now, Ok(vec![]), &mut actuator).unwrap();
        }
        let pan = AxisRange::new(-90.0, 90.0);
        let tilt = AxisRange::new(-45.0, 45.0);
        assert!(
            actuator
                .commands
                .iter()
                .all(|a| pan.contains(a.pan) && tilt.contains(a.tilt))
        );
        assert!(actuator.commands.contains(&Angles::new(90.0, 45.0)));
        assert!(actuator.commands.contains(&Angles::new(-90.0, -45.0)));
    }

    #[test]
    fn test_actuator_retry_once_succeeds() {
        let mut machine = machine();
        let mut actuator = RecordingActuator {
            failures_left: 1,
            ..Default::default()
        };
        let outcome = machine.step(Instant::now(), Ok(vec![]), &mut actuator);
        assert!(matches!(outcome, Ok(CycleOutcome::Scanned { .. })));
        assert_eq!(machine.mode(), TrackingMode::Scanning);
        assert_eq!(actuator.commands.len(), 1);
    }

    #[test]
    fn test_actuator_second_failure_enters_standby() {
        let mut machine = machine();
        let mut actuator = RecordingActuator {
            failures_left: 2,
            ..Default::default()
        };
        let err = machine
            .step(Instant::now(), Ok(vec![]), &mut actuator)
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Actuator {
                axis: Some(Axis::Pan),
                ..
            }
        ));
        assert_eq!(machine.mode(), TrackingMode::Standby);
        assert_eq!(actuator.centered, 1);
        assert!(machine.state().last_error.is_some());
        let snapshot = machine.snapshot(Duration::ZERO, false);
        assert!(snapshot.last_error.unwrap().contains("bus error"));
    }

    #[test]
    fn test_detector_failures_within_budget_are_empty_cycles() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let now = Instant::now();
        for _ in 0..3 {
            let outcome = machine
                .step(now, Err(DetectorError::Inference("cuda".into())), &mut actuator)
                .unwrap();
            assert!(matches!(outcome, CycleOutcome::Scanned { .. }));
        }
        // A success resets the budget
        machine.step(now, Ok(vec![]), &mut actuator).unwrap();
        for _ in 0..3 {
            machine
                .step(now, Err(DetectorError::Inference("cuda".into())), &mut actuator)
                .unwrap();
        }
        let err = machine
            .step(now, Err(DetectorError::Inference("cuda".into())), &mut actuator)
            .unwrap_err();
        assert!(matches!(err, TrackerError::Detector { consecutive: 4, .. }));
        assert_eq!(machine.mode(), TrackingMode::Standby);
    }

    #[test]
    fn test_detector_unavailable_is_fatal() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let err = machine
            .step(
                Instant::now(),
                Err(DetectorError::Unavailable("model missing".into())),
                &mut actuator,
            )
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(machine.mode(), TrackingMode::Standby);
    }

    #[test]
    fn test_nan_box_never_reaches_actuator() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let bogus = Detection::new(16, "dog", 0.9, f32::NAN, 0.0, 10.0, 10.0);
        let outcome = machine
            .step(Instant::now(), Ok(vec![bogus]), &mut actuator)
            .unwrap();
        assert!(matches!(outcome, CycleOutcome::Scanned { .. }));
        assert!(actuator.commands.iter().all(|a| a.pan.is_finite()));
    }

    #[test]
    fn test_stop_returns_to_center() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        machine
            .step(Instant::now(), Ok(vec![dog_at(500.0, 100.0)]), &mut actuator)
            .unwrap();
        machine.stop(&mut actuator);
        assert_eq!(machine.mode(), TrackingMode::Standby);
        assert_eq!(machine.state().angles, Angles::CENTER);
        assert_eq!(actuator.centered, 1);
    }

    #[test]
    fn test_reacquire_after_scan_restarts_pattern() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        machine.step(t0, Ok(vec![]), &mut actuator).unwrap();
        machine.step(t0, Ok(vec![]), &mut actuator).unwrap();
        machine
            .step(t0, Ok(vec![dog_at(320.0, 240.0)]), &mut actuator)
            .unwrap();
        let outcome = machine
            .step(t0 + Duration::from_secs(4), Ok(vec![]), &mut actuator)
            .unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Scanned {
                waypoint: Angles::new(-90.0, 0.0)
            }
        );
    }

    #[test]
    fn test_start_centers_through_machine() {
        let mut machine = TrackingStateMachine::new(TrackerConfig::default()).unwrap();
        let mut actuator = RecordingActuator::default();
        machine.start(&mut actuator).unwrap();
        assert_eq!(actuator.centered, 1);
        assert_eq!(machine.mode(), TrackingMode::Scanning);
        assert_eq!(machine.state().angles, Angles::CENTER);
    }

    #[test]
    fn test_start_fails_when_centering_fails() {
        let mut machine = TrackingStateMachine::new(TrackerConfig::default()).unwrap();
        let mut actuator = RecordingActuator {
            center_fails: true,
            ..Default::default()
        };
        let err = machine.start(&mut actuator).unwrap_err();
        assert!(matches!(err, TrackerError::Initialization(_)));
        assert_eq!(machine.mode(), TrackingMode::Standby);
    }

    #[test]
    fn test_restart_after_failed_recenter_clears_stale_angles() {
        let mut machine = machine();
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        for i in 0..5u64 {
            machine
                .step(t0 + Duration::from_millis(100 * i), Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
                .unwrap();
        }
        assert_relative_eq!(machine.state().angles.pan, 5.0 * 1.56, epsilon = 1e-9);

        // Bus fails hard: command and the return to center both fail
        actuator.failures_left = 2;
        actuator.center_fails = true;
        machine
            .step(t0 + Duration::from_secs(1), Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
            .unwrap_err();
        assert_eq!(machine.mode(), TrackingMode::Standby);
        assert!(machine.state().angles.pan > 0.0);

        actuator.center_fails = false;
        machine.start(&mut actuator).unwrap();
        assert_eq!(machine.state().angles, Angles::CENTER);

        let outcome = machine
            .step(t0 + Duration::from_secs(2), Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
            .unwrap();
        let CycleOutcome::Tracked { angles, correction } = outcome else {
            panic!("expected a tracked cycle, got {outcome:?}");
        };
        assert_eq!(angles.pan, correction.pan);
        assert_relative_eq!(angles.pan, 1.56, epsilon = 1e-9);
    }

    fn pid_config(ki: f64) -> TrackerConfig {
        TrackerConfig {
            correction: CorrectionLaw::Pid(PidConfig {
                pan: PidGains {
                    kp: 0.0156,
                    ki,
                    kd: 0.0,
                },
                tilt: PidGains {
                    kp: 0.0208,
                    ki,
                    kd: 0.0,
                },
                ..PidConfig::default()
            }),
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_pid_without_integral_matches_proportional() {
        let mut pid = started(pid_config(0.0));
        let mut plain = machine();
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        for i in 0..3u64 {
            let now = t0 + Duration::from_millis(500 * i);
            let a = pid.step(now, Ok(vec![dog_at(340.0, 200.0)]), &mut actuator).unwrap();
            let b = plain.step(now, Ok(vec![dog_at(340.0, 200.0)]), &mut actuator).unwrap();
            assert_eq!(a, b);
        }
        assert!(pid.pid().is_some());
        assert!(plain.pid().is_none());
    }

    #[test]
    fn test_pid_integral_grows_under_steady_error() {
        let mut machine = started(pid_config(0.01));
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        let mut pans = Vec::new();
        for i in 0..3u64 {
            let now = t0 + Duration::from_millis(500 * i);
            machine
                .step(now, Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
                .unwrap();
            pans.push(machine.state().last_correction.pan);
        }
        assert_relative_eq!(pans[0], 1.56, epsilon = 1e-9);
        // 100 px held for 0.5 s adds ki * 50 per cycle
        assert_relative_eq!(pans[1], 1.56 + 0.5, epsilon = 1e-9);
        assert_relative_eq!(pans[2], 1.56 + 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pid_state_resets_on_reacquisition() {
        let mut machine = started(pid_config(0.01));
        let mut actuator = RecordingActuator::default();
        let t0 = Instant::now();
        for i in 0..3u64 {
            machine
                .step(t0 + Duration::from_millis(500 * i), Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
                .unwrap();
        }
        // Lose the target long enough to fall back to scanning, then reacquire
        machine
            .step(t0 + Duration::from_secs(10), Ok(vec![]), &mut actuator)
            .unwrap();
        assert_eq!(machine.mode(), TrackingMode::Scanning);
        machine
            .step(t0 + Duration::from_secs(11), Ok(vec![dog_at(420.0, 240.0)]), &mut actuator)
            .unwrap();
        assert_relative_eq!(machine.state().last_correction.pan, 1.56, epsilon = 1e-9);
    }
}
