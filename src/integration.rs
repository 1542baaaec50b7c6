//! Integration module for connecting detectors, actuators and frame sources
//! with the tracking state machine.
//!
//! This module provides the adapter traits, timed workers that bound every
//! adapter call, and the [`CycleDriver`] that runs the loop on its own thread.

mod actuator;
mod builder;
mod detector;
mod driver;
mod frame;
mod worker;

pub use actuator::{Actuator, SimulatedActuator};
pub use builder::DetectionBuilder;
pub use detector::Detector;
pub use driver::CycleDriver;
pub use frame::{Frame, FrameSource};
pub use worker::{AdapterWorker, TimedActuator, TimedDetector, WorkerError};
