//! Bounded-time access to blocking adapters.
//!
//! Each adapter lives on its own thread and is driven through a job channel.
//! A caller waits at most the configured timeout for the reply; a late reply
//! is discarded when it finally arrives, and later jobs queue behind it.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::warn;

use crate::integration::{Actuator, Detector, Frame};
use crate::tracker::{ActuatorError, Angles, Detection, DetectorError};

type Job<A> = Box<dyn FnOnce(&mut A) + Send>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkerError {
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("adapter thread has exited")]
    Disconnected,
}

/// Owns an adapter on a dedicated thread and runs calls against it with a timeout.
pub struct AdapterWorker<A> {
    jobs: Option<Sender<Job<A>>>,
    handle: Option<JoinHandle<A>>,
    timeout: Duration,
}

impl<A: Send + 'static> AdapterWorker<A> {
    pub fn spawn(name: &str, adapter: A, timeout: Duration) -> std::io::Result<Self> {
        let (jobs, queue) = crossbeam_channel::unbounded::<Job<A>>();
        let handle = thread::Builder::new()
            .name(format!("{name}-adapter"))
            .spawn(move || {
                let mut adapter = adapter;
                for job in queue.iter() {
                    job(&mut adapter);
                }
                adapter
            })?;
        Ok(Self {
            jobs: Some(jobs),
            handle: Some(handle),
            timeout,
        })
    }

    /// Run `f` on the adapter thread and wait up to the timeout for its result.
    pub fn call<R, F>(&self, f: F) -> Result<R, WorkerError>
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> R + Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(WorkerError::Disconnected)?;
        let (reply, result) = crossbeam_channel::bounded(1);
        jobs.send(Box::new(move |adapter: &mut A| {
            let _ = reply.send(f(adapter));
        }))
        .map_err(|_| WorkerError::Disconnected)?;

        match result.recv_timeout(self.timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(WorkerError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Shut the thread down and hand the adapter back, after queued jobs finish.
    pub fn into_inner(mut self) -> Option<A> {
        self.jobs.take();
        self.handle.take()?.join().ok()
    }
}

impl<A> Drop for AdapterWorker<A> {
    fn drop(&mut self) {
        // Closing the queue ends the thread; a hung adapter is left detached.
        self.jobs.take();
    }
}

/// A [`Detector`] driven through an [`AdapterWorker`].
pub struct TimedDetector<D> {
    worker: AdapterWorker<D>,
}

impl<D: Detector + Send + 'static> TimedDetector<D> {
    pub fn spawn(detector: D, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self {
            worker: AdapterWorker::spawn("detector", detector, timeout)?,
        })
    }

    pub fn initialize(&self) -> Result<(), DetectorError> {
        self.worker
            .call(|detector| detector.initialize())
            .unwrap_or_else(|err| Err(detector_error(err)))
    }

    pub fn detect(&self, frame: Frame) -> Result<Vec<Detection>, DetectorError> {
        self.worker
            .call(move |detector| detector.detect(&frame))
            .unwrap_or_else(|err| Err(detector_error(err)))
    }

    pub fn into_inner(self) -> Option<D> {
        self.worker.into_inner()
    }
}

fn detector_error(err: WorkerError) -> DetectorError {
    match err {
        WorkerError::Timeout(after) => {
            warn!("detector call timed out after {after:?}");
            DetectorError::Timeout(after)
        }
        WorkerError::Disconnected => DetectorError::Unavailable(err.to_string()),
    }
}

/// An [`Actuator`] driven through an [`AdapterWorker`], so a hung servo bus
/// surfaces as [`ActuatorError::Timeout`].
pub struct TimedActuator<A> {
    worker: AdapterWorker<A>,
}

impl<A: Actuator + Send + 'static> TimedActuator<A> {
    pub fn spawn(actuator: A, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self {
            worker: AdapterWorker::spawn("actuator", actuator, timeout)?,
        })
    }

    pub fn into_inner(self) -> Option<A> {
        self.worker.into_inner()
    }

    fn run<R, F>(&self, f: F) -> Result<R, ActuatorError>
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> Result<R, ActuatorError> + Send + 'static,
    {
        match self.worker.call(f) {
            Ok(result) => result,
            Err(WorkerError::Timeout(after)) => Err(ActuatorError::Timeout(after)),
            Err(err @ WorkerError::Disconnected) => Err(ActuatorError::Unavailable(err.to_string())),
        }
    }
}

impl<A: Actuator + Send + 'static> Actuator for TimedActuator<A> {
    fn initialize(&mut self) -> Result<(), ActuatorError> {
        self.run(|actuator| actuator.initialize())
    }

    fn set_angles(&mut self, pan: f64, tilt: f64) -> Result<(), ActuatorError> {
        self.run(move |actuator| actuator.set_angles(pan, tilt))
    }

    fn get_angles(&mut self) -> Result<Angles, ActuatorError> {
        self.run(|actuator| actuator.get_angles())
    }

    fn move_to_center(&mut self) -> Result<(), ActuatorError> {
        self.run(|actuator| actuator.move_to_center())
    }

    fn emergency_stop(&mut self) -> Result<(), ActuatorError> {
        self.run(|actuator| actuator.emergency_stop())
    }
}
