//! Angle pairs and per-axis safety ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two actuated axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Pan,
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pan => f.write_str("pan"),
            Self::Tilt => f.write_str("tilt"),
        }
    }
}

/// Closed interval of permitted angles for one axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `angle` into the range.
    #[inline]
    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }

    /// Whether `other` lies entirely inside this range.
    pub fn encloses(&self, other: &AxisRange) -> bool {
        other.min >= self.min && other.max <= self.max
    }
}

/// Absolute pan/tilt position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Angles {
    pub pan: f64,
    pub tilt: f64,
}

impl Angles {
    pub const CENTER: Angles = Angles { pan: 0.0, tilt: 0.0 };

    #[inline]
    pub const fn new(pan: f64, tilt: f64) -> Self {
        Self { pan, tilt }
    }

    /// Clamp both axes into their ranges.
    pub fn clamped(self, pan_range: &AxisRange, tilt_range: &AxisRange) -> Self {
        Self {
            pan: pan_range.clamp(self.pan),
            tilt: tilt_range.clamp(self.tilt),
        }
    }
}
