//! Error taxonomy for the tracking core and its adapters.

use std::time::Duration;

use thiserror::Error;

use crate::tracker::angles::Axis;

/// Invalid configuration, rejected before the core accepts it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("image dimensions must be positive, got {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{axis} range is empty: min {min} must be below max {max}")]
    EmptyRange { axis: Axis, min: f64, max: f64 },
    #[error("{axis} range [{min}, {max}] does not contain the center position 0")]
    CenterUnreachable { axis: Axis, min: f64, max: f64 },
    #[error("{field} must not be zero")]
    ZeroDuration { field: &'static str },
    #[error("scan needs at least 2 steps per sweep, got {0}")]
    TooFewScanSteps(usize),
    #[error("scan needs at least one tilt band")]
    NoTiltBands,
    #[error("scan tilt band {angle} lies outside tilt range [{min}, {max}]")]
    TiltBandOutOfRange { angle: f64, min: f64, max: f64 },
    #[error("scan pan limits [{min}, {max}] exceed pan range [{range_min}, {range_max}]")]
    ScanLimitsOutOfRange {
        min: f64,
        max: f64,
        range_min: f64,
        range_max: f64,
    },
    #[error("min_confidence must lie in [0, 1], got {0}")]
    InvalidConfidence(f32),
}

/// Failure reported by a detector adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    /// Model inference failed for this frame.
    #[error("inference failed: {0}")]
    Inference(String),
    /// No frame could be acquired for this cycle.
    #[error("frame unavailable: {0}")]
    Frame(String),
    /// The detector did not answer within the adapter timeout.
    #[error("detector did not respond within {0:?}")]
    Timeout(Duration),
    /// The detector cannot be used at all (model missing, worker gone).
    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

impl DetectorError {
    /// Transient failures count as "zero detections this cycle".
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

/// Failure reported by an actuator adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActuatorError {
    #[error("{axis} servo rejected command: {message}")]
    Hardware { axis: Axis, message: String },
    #[error("{axis} angle {angle} outside [{min}, {max}]")]
    OutOfRange {
        axis: Axis,
        angle: f64,
        min: f64,
        max: f64,
    },
    #[error("actuator not ready: {0}")]
    NotReady(String),
    #[error("actuator did not respond within {0:?}")]
    Timeout(Duration),
    #[error("actuator unavailable: {0}")]
    Unavailable(String),
}

impl ActuatorError {
    /// Axis the failure is attributed to, when the adapter reports one.
    pub fn axis(&self) -> Option<Axis> {
        match self {
            Self::Hardware { axis, .. } | Self::OutOfRange { axis, .. } => Some(*axis),
            _ => None,
        }
    }
}

/// Failure acquiring a frame from a [`FrameSource`](crate::integration::FrameSource).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("frame source exhausted")]
    Exhausted,
    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Error surfaced to callers of the state machine and the cycle driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("detector failed {consecutive} consecutive cycles: {source}")]
    Detector {
        consecutive: u32,
        #[source]
        source: DetectorError,
    },
    #[error("actuator command failed after retry{}: {source}", axis_suffix(.axis))]
    Actuator {
        axis: Option<Axis>,
        #[source]
        source: ActuatorError,
    },
    #[error("safety violation: {axis} angle {angle} outside [{min}, {max}]")]
    SafetyViolation {
        axis: Axis,
        angle: f64,
        min: f64,
        max: f64,
    },
    #[error("adapter initialization failed: {0}")]
    Initialization(String),
    #[error("tracking loop is already running")]
    AlreadyRunning,
    #[error("tracking loop thread panicked")]
    LoopPanicked,
}

impl TrackerError {
    /// Whether this error forces the machine into standby.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Detector { .. } | Self::Actuator { .. } | Self::SafetyViolation { .. }
        )
    }
}

fn axis_suffix(axis: &Option<Axis>) -> String {
    match axis {
        Some(axis) => format!(" on {axis} axis"),
        None => String::new(),
    }
}
