//! Closed-loop pan/tilt camera tracking.
//!
//! Each cycle takes a frame, asks a [`Detector`] for objects, picks the best
//! target and steers an [`Actuator`] so the target drifts toward the image
//! center. With no target in view the loop holds position for a grace period
//! and then sweeps a scan pattern until something is reacquired.

pub mod integration;
pub mod tracker;

pub use integration::{
    Actuator, CycleDriver, DetectionBuilder, Detector, Frame, FrameSource, SimulatedActuator,
};
pub use tracker::{
    ActuatorError, Angles, Axis, ConfigError, ControllerConfig, Correction, CorrectionLaw, CycleOutcome,
    Detection, DetectorError, FrameError, PidConfig, PidGains, Rect, ScanConfig, ScanPatternKind, StatusSnapshot,
    TrackerConfig, TrackerError, TrackingMode, TrackingStateMachine,
};
