use std::time::Duration;

use serde::Serialize;

use crate::tracker::correction::Correction;
use crate::tracker::mode::TrackingMode;

/// Point-in-time view of the tracking loop, safe to hand to a UI or notifier.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatusSnapshot {
    pub mode: TrackingMode,
    pub pan_angle: f64,
    pub tilt_angle: f64,
    /// Whether the latest cycle saw a qualifying detection
    pub target_detected: bool,
    /// Class of the most recently tracked target
    pub target_class: Option<String>,
    pub target_confidence: f32,
    pub correction_applied: Correction,
    /// Cycles that contained a qualifying detection
    pub total_detections: u64,
    pub uptime: Duration,
    pub is_running: bool,
    pub last_error: Option<String>,
}
