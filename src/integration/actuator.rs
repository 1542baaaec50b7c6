//! Trait for pan/tilt actuator hardware, plus an in-memory simulator.

use crate::tracker::{ActuatorError, Angles, Axis, AxisRange, ControllerConfig};

/// Absolute-angle interface to a pan/tilt mechanism.
///
/// Implement this trait to connect a servo driver to the tracking loop. The
/// loop never requests an angle outside the configured ranges; an
/// implementation that receives one anyway must report
/// [`ActuatorError::OutOfRange`] rather than silently accept it.
///
/// # Example
///
/// ```ignore
/// use pantilt_tracker::{Actuator, ActuatorError, Angles};
///
/// struct Pca9685Servos { /* bus handle */ }
///
/// impl Actuator for Pca9685Servos {
///     fn set_angles(&mut self, pan: f64, tilt: f64) -> Result<(), ActuatorError> {
///         // Convert to servo pulse widths and write both channels
///         Ok(())
///     }
///
///     fn get_angles(&mut self) -> Result<Angles, ActuatorError> {
///         Ok(Angles::CENTER)
///     }
///
///     fn emergency_stop(&mut self) -> Result<(), ActuatorError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Actuator {
    /// Prepare the hardware. Called once before the loop starts.
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }

    /// Command both axes to absolute angles in degrees.
    fn set_angles(&mut self, pan: f64, tilt: f64) -> Result<(), ActuatorError>;

    /// Last position the actuator reports.
    fn get_angles(&mut self) -> Result<Angles, ActuatorError>;

    /// Return both axes to (0, 0).
    fn move_to_center(&mut self) -> Result<(), ActuatorError> {
        self.set_angles(Angles::CENTER.pan, Angles::CENTER.tilt)
    }

    /// Halt motion immediately; the actuator refuses commands afterwards
    /// until re-initialized.
    fn emergency_stop(&mut self) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        (**self).initialize()
    }

    fn set_angles(&mut self, pan: f64, tilt: f64) -> Result<(), ActuatorError> {
        (**self).set_angles(pan, tilt)
    }

    fn get_angles(&mut self) -> Result<Angles, ActuatorError> {
        (**self).get_angles()
    }

    fn move_to_center(&mut self) -> Result<(), ActuatorError> {
        (**self).move_to_center()
    }

    fn emergency_stop(&mut self) -> Result<(), ActuatorError> {
        (**self).emergency_stop()
    }
}

/// In-memory actuator that enforces the same ranges as real hardware.
///
/// Useful for dry runs without servos attached and as a test double. Faults
/// can be injected with [`SimulatedActuator::inject_failures`].
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    pan_range: AxisRange,
    tilt_range: AxisRange,
    angles: Angles,
    ready: bool,
    commands: u64,
    pending_failures: u32,
    failing_axis: Axis,
}

impl SimulatedActuator {
    pub fn new(pan_range: AxisRange, tilt_range: AxisRange) -> Self {
        Self {
            pan_range,
            tilt_range,
            angles: Angles::CENTER,
            ready: false,
            commands: 0,
            pending_failures: 0,
            failing_axis: Axis::Pan,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.pan_range, config.tilt_range)
    }

    /// Make the next `count` commands fail with a hardware error on `axis`.
    pub fn inject_failures(&mut self, count: u32, axis: Axis) {
        self.pending_failures = count;
        self.failing_axis = axis;
    }

    pub fn angles(&self) -> Angles {
        self.angles
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of accepted `set_angles` commands.
    pub fn command_count(&self) -> u64 {
        self.commands
    }

    fn check(axis: Axis, range: &AxisRange, angle: f64) -> Result<(), ActuatorError> {
        if range.contains(angle) {
            Ok(())
        } else {
            Err(ActuatorError::OutOfRange {
                axis,
                angle,
                min: range.min,
                max: range.max,
            })
        }
    }
}

impl Actuator for SimulatedActuator {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        self.ready = true;
        self.angles = Angles::CENTER;
        Ok(())
    }

    fn set_angles(&mut self, pan: f64, tilt: f64) -> Result<(), ActuatorError> {
        if !self.ready {
            return Err(ActuatorError::NotReady("not initialized".into()));
        }
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Err(ActuatorError::Hardware {
                axis: self.failing_axis,
                message: "injected fault".into(),
            });
        }
        Self::check(Axis::Pan, &self.pan_range, pan)?;
        Self::check(Axis::Tilt, &self.tilt_range, tilt)?;
        self.angles = Angles::new(pan, tilt);
        self.commands += 1;
        Ok(())
    }

    fn get_angles(&mut self) -> Result<Angles, ActuatorError> {
        Ok(self.angles)
    }

    fn emergency_stop(&mut self) -> Result<(), ActuatorError> {
        self.ready = false;
        Ok(())
    }
}
