//! Fluent construction of [`Detection`]s for detector adapters.

use crate::tracker::{Detection, Rect};

/// Assembles a [`Detection`] from whatever box layout a model emits.
///
/// Detector adapters use it to normalize raw outputs before handing them to
/// the state machine.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    class_id: u32,
    class_name: String,
    bbox: Rect,
    confidence: f32,
}

impl DetectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the class id and label.
    pub fn class(mut self, class_id: u32, class_name: impl Into<String>) -> Self {
        self.class_id = class_id;
        self.class_name = class_name.into();
        self
    }

    /// Corners `(x1, y1, x2, y2)`.
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Center plus size `(cx, cy, w, h)`.
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_center(cx, cy, w, h);
        self
    }

    /// Top-left plus size `(l, t, w, h)`.
    pub fn tlwh(mut self, l: f32, t: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(l, t, w, h);
        self
    }

    /// Set the confidence score, clamped to [0, 1].
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> Detection {
        Detection::from_rect(self.class_id, self.class_name, self.confidence, self.bbox)
    }
}
