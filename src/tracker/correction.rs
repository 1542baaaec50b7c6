//! Proportional correction from pixel error to angular deltas.

use nalgebra::{Point2, Vector2};
use serde::Serialize;

use crate::tracker::config::ControllerConfig;

/// Angular correction for one cycle, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Correction {
    pub pan: f64,
    pub tilt: f64,
}

impl Correction {
    pub const ZERO: Correction = Correction { pan: 0.0, tilt: 0.0 };

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.pan == 0.0 && self.tilt == 0.0
    }
}

/// Map the offset of `detection_center` from `image_center` to pan/tilt deltas.
///
/// Each axis is handled independently: errors strictly below the deadband
/// are zeroed, the rest are scaled by the axis gain and clamped to
/// `±max_correction`. Image rows grow downwards while positive tilt points
/// up, so the vertical error is negated.
pub fn compute_correction(
    detection_center: Point2<f64>,
    image_center: Point2<f64>,
    config: &ControllerConfig,
) -> Correction {
    let error = pixel_error(detection_center, image_center, config.deadband);
    let limit = config.max_correction;
    Correction {
        pan: (error.x * config.pan_gain).clamp(-limit, limit),
        tilt: (-error.y * config.tilt_gain).clamp(-limit, limit),
    }
}

/// Pixel offset of `detection_center` from `image_center`, deadband applied per axis.
pub(crate) fn pixel_error(
    detection_center: Point2<f64>,
    image_center: Point2<f64>,
    deadband: f64,
) -> Vector2<f64> {
    apply_deadband(detection_center - image_center, deadband)
}

fn apply_deadband(error: Vector2<f64>, deadband: f64) -> Vector2<f64> {
    error.map(|e| if e.abs() < deadband { 0.0 } else { e })
}

/// Running diagnostics over the corrections issued while tracking.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CorrectionStats {
    pub total_corrections: u64,
    /// Corrections where both axes fell inside the deadband
    pub in_deadband: u64,
    sum_abs_error_x: f64,
    sum_abs_error_y: f64,
}

impl CorrectionStats {
    /// Account for one correction computed for a target at `detection_center`.
    pub fn record(&mut self, detection_center: Point2<f64>, image_center: Point2<f64>, correction: &Correction) {
        let error = detection_center - image_center;
        self.total_corrections += 1;
        if correction.is_zero() {
            self.in_deadband += 1;
        }
        self.sum_abs_error_x += error.x.abs();
        self.sum_abs_error_y += error.y.abs();
    }

    /// Mean absolute pixel error (x, y) over all recorded corrections.
    pub fn mean_abs_error(&self) -> (f64, f64) {
        if self.total_corrections == 0 {
            return (0.0, 0.0);
        }
        let n = self.total_corrections as f64;
        (self.sum_abs_error_x / n, self.sum_abs_error_y / n)
    }

    /// Fraction of corrections that were fully suppressed by the deadband.
    pub fn deadband_rate(&self) -> f64 {
        if self.total_corrections == 0 {
            0.0
        } else {
            self.in_deadband as f64 / self.total_corrections as f64
        }
    }
}
