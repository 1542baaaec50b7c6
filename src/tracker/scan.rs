//! Waypoint generation while no target is in view.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tracker::angles::{Angles, AxisRange};
use crate::tracker::config::{ScanPatternKind, TrackerConfig};

/// Traversal direction through the sweep waypoint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Position of the scanner within its pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanState {
    /// Index of the next waypoint to emit (sweep), or waypoints emitted so far (random)
    pub index: usize,
    pub direction: Direction,
}

impl ScanState {
    /// Advance a ping-pong traversal over `len` waypoints. `len` must be at least 2.
    fn advance(self, len: usize) -> Self {
        match self.direction {
            Direction::Forward if self.index + 1 < len => Self {
                index: self.index + 1,
                ..self
            },
            Direction::Forward => Self {
                index: self.index.saturating_sub(1),
                direction: Direction::Backward,
            },
            Direction::Backward if self.index > 0 => Self {
                index: self.index - 1,
                ..self
            },
            Direction::Backward => Self {
                index: (self.index + 1).min(len - 1),
                direction: Direction::Forward,
            },
        }
    }
}

/// Produces an endless, restartable sequence of absolute scan waypoints.
#[derive(Debug, Clone)]
pub struct ScanPatternGenerator {
    kind: ScanPatternKind,
    /// Sweep waypoints, one `[pan, tilt]` row each
    waypoints: Array2<f64>,
    pan_limits: AxisRange,
    tilt_bands: Vec<f64>,
    pan_range: AxisRange,
    tilt_range: AxisRange,
    state: ScanState,
    rng: StdRng,
}

impl ScanPatternGenerator {
    /// Build the generator from a validated config.
    pub fn new(config: &TrackerConfig) -> Self {
        let controller = &config.controller;
        let pan_limits = config.scan.pan_limits(controller);
        let waypoints = sweep_waypoints(
            &pan_limits,
            &config.scan.tilt_bands,
            config.scan.steps_per_sweep,
        );
        Self {
            kind: config.scan.pattern,
            waypoints,
            pan_limits,
            tilt_bands: config.scan.tilt_bands.clone(),
            pan_range: controller.pan_range,
            tilt_range: controller.tilt_range,
            state: ScanState::default(),
            rng: StdRng::seed_from_u64(seed_of(config.scan.pattern)),
        }
    }

    /// Return the next waypoint and advance the pattern.
    ///
    /// Waypoints are always clamped into the configured axis ranges.
    pub fn next_waypoint(&mut self) -> Angles {
        let waypoint = match self.kind {
            ScanPatternKind::Sweep => {
                let index = self.state.index;
                let waypoint = Angles::new(self.waypoints[[index, 0]], self.waypoints[[index, 1]]);
                self.state = self.state.advance(self.waypoints.nrows());
                waypoint
            }
            ScanPatternKind::Random { .. } => {
                let pan = self.rng.gen_range(self.pan_limits.min..=self.pan_limits.max);
                let tilt = self.tilt_bands[self.rng.gen_range(0..self.tilt_bands.len())];
                self.state.index += 1;
                Angles::new(pan, tilt)
            }
        };
        waypoint.clamped(&self.pan_range, &self.tilt_range)
    }

    /// Restart the pattern from its first waypoint.
    pub fn reset(&mut self) {
        self.state = ScanState::default();
        self.rng = StdRng::seed_from_u64(seed_of(self.kind));
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Number of distinct waypoints in one sweep pass.
    pub fn sweep_len(&self) -> usize {
        self.waypoints.nrows()
    }
}

fn seed_of(kind: ScanPatternKind) -> u64 {
    match kind {
        ScanPatternKind::Random { seed } => seed,
        ScanPatternKind::Sweep => 0,
    }
}

/// Lay out evenly spaced pan stops for every tilt band in serpentine order.
fn sweep_waypoints(pan_limits: &AxisRange, tilt_bands: &[f64], steps: usize) -> Array2<f64> {
    let pans = Array1::linspace(pan_limits.min, pan_limits.max, steps);
    let mut waypoints = Array2::zeros((steps * tilt_bands.len(), 2));
    let mut row = 0;
    for (band, &tilt) in tilt_bands.iter().enumerate() {
        let mut ordered = pans.to_vec();
        if band % 2 == 1 {
            ordered.reverse();
        }
        for pan in ordered {
            waypoints[[row, 0]] = pan;
            waypoints[[row, 1]] = tilt;
            row += 1;
        }
    }
    waypoints
}
