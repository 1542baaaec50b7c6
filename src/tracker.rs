mod angles;
mod config;
mod correction;
mod detection;
mod error;
mod mode;
mod pid;
mod rect;
mod scan;
mod selection;
mod state_machine;
mod status;

pub use angles::{Angles, Axis, AxisRange};
pub use config::{
    ACTUATOR_RETRIES, ControllerConfig, CorrectionLaw, ScanConfig, ScanPatternKind, TrackerConfig,
};
pub use correction::{Correction, CorrectionStats, compute_correction};
pub use detection::Detection;
pub use error::{ActuatorError, ConfigError, DetectorError, FrameError, TrackerError};
pub use mode::TrackingMode;
pub use pid::{PidConfig, PidController, PidCorrection, PidGains, PidStats, PidTerms};
pub use rect::Rect;
pub use scan::{Direction, ScanPatternGenerator, ScanState};
pub use selection::{TargetFilter, select_target};
pub use state_machine::{ControlState, CycleOutcome, TrackingStateMachine};
pub use status::StatusSnapshot;
