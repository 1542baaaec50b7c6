//! Choosing the single target to follow out of a cycle's detections.

use std::cmp::Ordering;

use crate::tracker::detection::Detection;

/// Which detections are eligible to be tracked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetFilter {
    pub min_confidence: f32,
    /// Accepted class ids; empty accepts every class.
    pub classes: Vec<u32>,
}

impl TargetFilter {
    /// Confident enough, of an accepted class, and with a usable box.
    pub fn qualifies(&self, detection: &Detection) -> bool {
        let center = detection.center();
        detection.confidence >= self.min_confidence
            && (self.classes.is_empty() || self.classes.contains(&detection.class_id))
            && center.x.is_finite()
            && center.y.is_finite()
    }
}

/// Pick the qualifying detection with the highest confidence.
///
/// Confidence ties go to the larger bounding box; remaining ties keep the
/// detector's original order.
pub fn select_target<'a>(detections: &'a [Detection], filter: &TargetFilter) -> Option<&'a Detection> {
    detections
        .iter()
        .filter(|d| filter.qualifies(d))
        .fold(None, |best: Option<&Detection>, candidate| match best {
            Some(current) if rank(candidate, current) != Ordering::Greater => Some(current),
            _ => Some(candidate),
        })
}

fn rank(a: &Detection, b: &Detection) -> Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then_with(|| a.area().total_cmp(&b.area()))
}
