//! Stateful PID correction law, selectable instead of the proportional one.
//!
//! The controller works on the deadbanded pixel error and produces degrees,
//! so with `ki = kd = 0` it reproduces [`compute_correction`] exactly.
//!
//! [`compute_correction`]: crate::tracker::compute_correction

use std::collections::VecDeque;
use std::time::Instant;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tracker::correction::Correction;
use crate::tracker::error::ConfigError;

/// Outputs remembered for the stability check.
const HISTORY_LEN: usize = 100;

/// Gains for one axis. Units are degrees per pixel (P), per pixel-second (I)
/// and per pixel/second (D). Omitted gains are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    /// Gains tuned by the usual rule of thumb: `ki = kp / 10`, `kd = kp / 100`.
    pub fn proportional(kp: f64) -> Self {
        Self {
            kp,
            ki: kp / 10.0,
            kd: kp / 100.0,
        }
    }

    fn validate(&self, axis: &'static str) -> Result<(), ConfigError> {
        for (field, value) in [(axis, self.kp), (axis, self.ki), (axis, self.kd)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        Ok(())
    }
}

/// Parameters of the dual-axis PID law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub pan: PidGains,
    pub tilt: PidGains,
    /// Anti-windup bound on the accumulated error, pixel-seconds
    pub integral_limit: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            pan: PidGains::proportional(0.0156),
            tilt: PidGains::proportional(0.0208),
            integral_limit: 200.0,
        }
    }
}

impl PidConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pan.validate("pid.pan")?;
        self.tilt.validate("pid.tilt")?;
        if !self.integral_limit.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "pid.integral_limit",
                value: self.integral_limit,
            });
        }
        if self.integral_limit <= 0.0 {
            return Err(ConfigError::NotPositive {
                field: "pid.integral_limit",
                value: self.integral_limit,
            });
        }
        Ok(())
    }
}

/// Individual terms of the most recent update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PidTerms {
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub output: f64,
    /// Raw output exceeded the output limit and was clamped
    pub saturated: bool,
}

/// Aggregate behaviour of one axis controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PidStats {
    pub updates: u64,
    pub saturation_rate: f64,
    pub mean_output: f64,
    pub output_variance: f64,
}

/// Single-axis PID controller with clamped integral and output.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral_limit: f64,
    output_limit: f64,
    integral: f64,
    prev: Option<(f64, Instant)>,
    terms: PidTerms,
    history: VecDeque<f64>,
    updates: u64,
    saturated: u64,
}

impl PidController {
    pub fn new(gains: PidGains, integral_limit: f64, output_limit: f64) -> Self {
        Self {
            gains,
            integral_limit,
            output_limit,
            integral: 0.0,
            prev: None,
            terms: PidTerms::default(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            updates: 0,
            saturated: 0,
        }
    }

    /// Feed the error observed at `now` and return the clamped output.
    ///
    /// The first update after construction or [`reset`](Self::reset) has no
    /// elapsed time, so it contributes neither integral nor derivative.
    pub fn update(&mut self, error: f64, now: Instant) -> f64 {
        let dt = self
            .prev
            .map(|(_, at)| now.saturating_duration_since(at).as_secs_f64())
            .unwrap_or(0.0);

        if dt > 0.0 {
            self.integral =
                (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        }
        let derivative = match self.prev {
            Some((prev_error, _)) if dt > 0.0 => self.gains.kd * (error - prev_error) / dt,
            _ => 0.0,
        };
        let proportional = self.gains.kp * error;
        let integral = self.gains.ki * self.integral;
        let raw = proportional + integral + derivative;
        let output = raw.clamp(-self.output_limit, self.output_limit);
        let saturated = raw.abs() > self.output_limit;

        self.terms = PidTerms {
            proportional,
            integral,
            derivative,
            output,
            saturated,
        };
        self.prev = Some((error, now));
        self.updates += 1;
        if saturated {
            self.saturated += 1;
        }
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(output);
        output
    }

    /// Clear accumulated state and statistics; gains and limits are kept.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev = None;
        self.terms = PidTerms::default();
        self.history.clear();
        self.updates = 0;
        self.saturated = 0;
    }

    /// Terms of the most recent update.
    pub fn terms(&self) -> &PidTerms {
        &self.terms
    }

    /// Whether the last `window` outputs vary by less than `tolerance`
    /// (variance, degrees squared). Needs at least `window` updates.
    pub fn is_stable(&self, tolerance: f64, window: usize) -> bool {
        if window == 0 || self.history.len() < window {
            return false;
        }
        variance(self.history.iter().skip(self.history.len() - window)).1 < tolerance
    }

    pub fn stats(&self) -> PidStats {
        let (mean_output, output_variance) = variance(self.history.iter());
        PidStats {
            updates: self.updates,
            saturation_rate: if self.updates == 0 {
                0.0
            } else {
                self.saturated as f64 / self.updates as f64
            },
            mean_output,
            output_variance,
        }
    }
}

fn variance<'a>(values: impl Iterator<Item = &'a f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var)
}

/// Independent pan and tilt controllers producing a [`Correction`].
#[derive(Debug, Clone)]
pub struct PidCorrection {
    pub pan: PidController,
    pub tilt: PidController,
}

impl PidCorrection {
    /// `max_correction` bounds each axis output, as for the proportional law.
    pub fn new(config: &PidConfig, max_correction: f64) -> Self {
        Self {
            pan: PidController::new(config.pan, config.integral_limit, max_correction),
            tilt: PidController::new(config.tilt, config.integral_limit, max_correction),
        }
    }

    /// `error` is the deadbanded pixel offset of the target from image center.
    pub fn update(&mut self, error: Vector2<f64>, now: Instant) -> Correction {
        let correction = Correction {
            pan: self.pan.update(error.x, now),
            // Image rows grow downwards
            tilt: self.tilt.update(-error.y, now),
        };
        debug!(
            pan_i = self.pan.terms().integral,
            pan_d = self.pan.terms().derivative,
            tilt_i = self.tilt.terms().integral,
            tilt_d = self.tilt.terms().derivative,
            "pid terms"
        );
        correction
    }

    pub fn reset(&mut self) {
        self.pan.reset();
        self.tilt.reset();
    }

    pub fn is_stable(&self, tolerance: f64, window: usize) -> bool {
        self.pan.is_stable(tolerance, window) && self.tilt.is_stable(tolerance, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn p_only(kp: f64) -> PidController {
        PidController::new(
            PidGains {
                kp,
                ki: 0.0,
                kd: 0.0,
            },
            100.0,
            15.0,
        )
    }

    #[test]
    fn test_proportional_only() {
        let mut pid = p_only(0.5);
        let t0 = Instant::now();
        assert_relative_eq!(pid.update(10.0, t0), 5.0);
        assert_relative_eq!(pid.update(-4.0, t0 + Duration::from_millis(100)), -2.0);
    }

    #[test]
    fn test_first_update_has_no_integral_or_derivative() {
        let mut pid = PidController::new(
            PidGains {
                kp: 1.0,
                ki: 1.0,
                kd: 1.0,
            },
            100.0,
            1000.0,
        );
        pid.update(10.0, Instant::now());
        assert_eq!(pid.terms().integral, 0.0);
        assert_eq!(pid.terms().derivative, 0.0);
    }

    #[test]
    fn test_integral_accumulates_and_is_clamped() {
        let gains = PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
        };
        let mut pid = PidController::new(gains, 3.0, 1000.0);
        let t0 = Instant::now();
        pid.update(10.0, t0);
        let out = pid.update(10.0, t0 + Duration::from_millis(100));
        assert_relative_eq!(out, 1.0, epsilon = 1e-9);
        // Two more seconds of error would reach 21 without the anti-windup bound
        let out = pid.update(10.0, t0 + Duration::from_millis(2100));
        assert_relative_eq!(out, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_derivative_opposes_change() {
        let gains = PidGains {
            kp: 0.0,
            ki: 0.0,
            kd: 0.5,
        };
        let mut pid = PidController::new(gains, 100.0, 1000.0);
        let t0 = Instant::now();
        pid.update(20.0, t0);
        // Error shrinks by 10 px over 0.5 s
        let out = pid.update(10.0, t0 + Duration::from_millis(500));
        assert_relative_eq!(out, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_output_saturates() {
        let mut pid = p_only(1.0);
        assert_eq!(pid.update(100.0, Instant::now()), 15.0);
        assert!(pid.terms().saturated);
        assert_relative_eq!(pid.stats().saturation_rate, 1.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut pid = PidController::new(PidGains::proportional(1.0), 100.0, 1000.0);
        let t0 = Instant::now();
        pid.update(10.0, t0);
        pid.update(10.0, t0 + Duration::from_secs(1));
        pid.reset();
        assert_relative_eq!(pid.update(10.0, t0 + Duration::from_secs(2)), 10.0);
        assert_eq!(pid.terms().derivative, 0.0);
    }

    #[test]
    fn test_stability_window() {
        let mut pid = p_only(1.0);
        let t0 = Instant::now();
        for i in 0..5u64 {
            pid.update(2.0, t0 + Duration::from_millis(10 * i));
        }
        assert!(!pid.is_stable(0.1, 10));
        assert!(pid.is_stable(0.1, 5));
        pid.update(12.0, t0 + Duration::from_millis(60));
        assert!(!pid.is_stable(0.1, 5));
    }

    #[test]
    fn test_dual_axis_inverts_tilt() {
        let config = PidConfig {
            pan: PidGains {
                kp: 0.0156,
                ki: 0.0,
                kd: 0.0,
            },
            tilt: PidGains {
                kp: 0.0208,
                ki: 0.0,
                kd: 0.0,
            },
            ..PidConfig::default()
        };
        let mut pid = PidCorrection::new(&config, 15.0);
        let c = pid.update(Vector2::new(20.0, -40.0), Instant::now());
        assert_relative_eq!(c.pan, 0.312, epsilon = 1e-9);
        assert_relative_eq!(c.tilt, 0.832, epsilon = 1e-9);
    }

    #[test]
    fn test_validate() {
        assert_eq!(PidConfig::default().validate(), Ok(()));
        let mut config = PidConfig::default();
        config.tilt.kd = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));
        let mut config = PidConfig::default();
        config.integral_limit = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::NotPositive { .. })));
    }
}
