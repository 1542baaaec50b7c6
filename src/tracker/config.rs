//! Controller and loop configuration.
//!
//! Every config type deserializes with `#[serde(default)]`, so a partial
//! document only needs the fields that differ from the defaults. Durations
//! are written as fractional seconds. Call [`TrackerConfig::validate`] (the
//! state machine does this on construction) before using a loaded config.

use std::time::Duration;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracker::angles::{Axis, AxisRange};
use crate::tracker::error::ConfigError;
use crate::tracker::pid::PidConfig;

/// Immediate retries granted to a failed actuator command before escalating.
pub const ACTUATOR_RETRIES: u32 = 1;

/// Parameters of the proportional correction engine and the axis safety ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub image_width: u32,
    pub image_height: u32,
    /// Degrees of pan per pixel of horizontal error
    pub pan_gain: f64,
    /// Degrees of tilt per pixel of vertical error
    pub tilt_gain: f64,
    /// Largest correction applied in one cycle, degrees
    pub max_correction: f64,
    /// Pixel error below which an axis is left alone
    pub deadband: f64,
    pub pan_range: AxisRange,
    pub tilt_range: AxisRange,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            image_width: 640,
            image_height: 480,
            pan_gain: 0.0156,
            tilt_gain: 0.0208,
            max_correction: 15.0,
            deadband: 5.0,
            pan_range: AxisRange::new(-90.0, 90.0),
            tilt_range: AxisRange::new(-45.0, 45.0),
        }
    }
}

impl ControllerConfig {
    /// Pixel coordinates of the image center.
    pub fn image_center(&self) -> Point2<f64> {
        Point2::new(
            self.image_width as f64 / 2.0,
            self.image_height as f64 / 2.0,
        )
    }

    /// Permitted angles for `axis`.
    pub fn range(&self, axis: Axis) -> &AxisRange {
        match axis {
            Axis::Pan => &self.pan_range,
            Axis::Tilt => &self.tilt_range,
        }
    }

    /// Reject degenerate images, non-finite gains and ranges that exclude center.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigError::InvalidImageSize {
                width: self.image_width,
                height: self.image_height,
            });
        }
        finite("pan_gain", self.pan_gain)?;
        finite("tilt_gain", self.tilt_gain)?;
        finite("max_correction", self.max_correction)?;
        finite("deadband", self.deadband)?;
        if self.max_correction <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "max_correction",
                value: self.max_correction,
            });
        }
        if self.deadband < 0.0 {
            return Err(ConfigError::Negative {
                field: "deadband",
                value: self.deadband,
            });
        }
        validate_range(Axis::Pan, &self.pan_range)?;
        validate_range(Axis::Tilt, &self.tilt_range)
    }
}

/// Which waypoint sequence the scanner follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScanPatternKind {
    /// Evenly spaced pan sweep, ping-ponging between the ends.
    Sweep,
    /// Seeded pseudo-random waypoints; the same seed replays the same sequence.
    Random { seed: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub pattern: ScanPatternKind,
    pub steps_per_sweep: usize,
    /// Pan sub-range to sweep; the full pan range when unset.
    pub pan_limits: Option<AxisRange>,
    /// Tilt angles visited by the scan, one sweep per band.
    pub tilt_bands: Vec<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: ScanPatternKind::Sweep,
            steps_per_sweep: 9,
            pan_limits: None,
            tilt_bands: vec![0.0],
        }
    }
}

impl ScanConfig {
    /// Effective pan range swept by the scanner.
    pub fn pan_limits(&self, controller: &ControllerConfig) -> AxisRange {
        self.pan_limits.unwrap_or(controller.pan_range)
    }

    /// Validate against the controller's axis ranges, which the scan must stay inside.
    pub fn validate(&self, controller: &ControllerConfig) -> Result<(), ConfigError> {
        if self.steps_per_sweep < 2 {
            return Err(ConfigError::TooFewScanSteps(self.steps_per_sweep));
        }
        if self.tilt_bands.is_empty() {
            return Err(ConfigError::NoTiltBands);
        }
        let tilt = controller.tilt_range;
        if let Some(&angle) = self
            .tilt_bands
            .iter()
            .find(|angle| !angle.is_finite() || !tilt.contains(**angle))
        {
            return Err(ConfigError::TiltBandOutOfRange {
                angle,
                min: tilt.min,
                max: tilt.max,
            });
        }
        if let Some(limits) = self.pan_limits {
            if !(limits.min < limits.max) {
                return Err(ConfigError::EmptyRange {
                    axis: Axis::Pan,
                    min: limits.min,
                    max: limits.max,
                });
            }
            if !controller.pan_range.encloses(&limits) {
                return Err(ConfigError::ScanLimitsOutOfRange {
                    min: limits.min,
                    max: limits.max,
                    range_min: controller.pan_range.min,
                    range_max: controller.pan_range.max,
                });
            }
        }
        Ok(())
    }
}

/// How pixel error becomes an angular correction while tracking.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "lowercase")]
pub enum CorrectionLaw {
    /// Stateless gain per axis, see [`compute_correction`](crate::tracker::compute_correction).
    #[default]
    Proportional,
    /// Per-axis PID with integral anti-windup; state is reset on every acquisition.
    Pid(PidConfig),
}

/// Complete configuration of the tracking loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub controller: ControllerConfig,
    /// Time without a qualifying detection before tracking gives up.
    #[serde(with = "duration_secs")]
    pub loss_timeout: Duration,
    /// Target duration of one control cycle.
    #[serde(with = "duration_secs")]
    pub cycle_period: Duration,
    /// Consecutive transient detector failures tolerated before standby.
    pub detector_retry_budget: u32,
    /// Upper bound on any single detector or actuator call made by the driver.
    #[serde(with = "duration_secs")]
    pub adapter_timeout: Duration,
    /// Detections below this confidence are ignored.
    pub min_confidence: f32,
    /// Accepted class ids; empty accepts every class.
    pub target_classes: Vec<u32>,
    pub scan: ScanConfig,
    pub correction: CorrectionLaw,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            loss_timeout: Duration::from_secs(3),
            cycle_period: Duration::from_millis(500),
            detector_retry_budget: 3,
            adapter_timeout: Duration::from_secs(2),
            min_confidence: 0.5,
            target_classes: Vec::new(),
            scan: ScanConfig::default(),
            correction: CorrectionLaw::Proportional,
        }
    }
}

impl TrackerConfig {
    /// Check every field; the state machine refuses a config that fails this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        if self.loss_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "loss_timeout",
            });
        }
        if self.cycle_period.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "cycle_period",
            });
        }
        if self.adapter_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "adapter_timeout",
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidConfidence(self.min_confidence));
        }
        self.scan.validate(&self.controller)?;
        match &self.correction {
            CorrectionLaw::Proportional => Ok(()),
            CorrectionLaw::Pid(pid) => pid.validate(),
        }
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}

fn validate_range(axis: Axis, range: &AxisRange) -> Result<(), ConfigError> {
    // NaN bounds fail the comparison and are reported as empty
    if !(range.min < range.max) {
        return Err(ConfigError::EmptyRange {
            axis,
            min: range.min,
            max: range.max,
        });
    }
    if !range.contains(0.0) {
        return Err(ConfigError::CenterUnreachable {
            axis,
            min: range.min,
            max: range.max,
        });
    }
    Ok(())
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
