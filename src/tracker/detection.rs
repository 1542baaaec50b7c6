//! Detector output consumed by the tracking core.

use nalgebra::Point2;

use crate::tracker::rect::Rect;

/// A single detected object, valid for one control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Class index reported by the model
    pub class_id: u32,
    /// Human-readable class label
    pub class_name: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
    /// Bounding box (stored TLWH, constructed from TLBR)
    pub bbox: Rect,
}

impl Detection {
    pub fn new(
        class_id: u32,
        class_name: impl Into<String>,
        confidence: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    ) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
        }
    }

    pub fn from_rect(class_id: u32, class_name: impl Into<String>, confidence: f32, bbox: Rect) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    /// Center of the bounding box in pixel coordinates.
    pub fn center(&self) -> Point2<f64> {
        let (cx, cy) = self.bbox.center();
        Point2::new(cx, cy)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.bbox.area()
    }
}
