/// Axis-aligned bounding box in pixel coordinates.
///
/// Stored as TLWH (top-left x, top-left y, width, height); detectors usually
/// report TLBR (x1, y1, x2, y2), which [`Rect::from_tlbr`] accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box from opposite corners, as most detectors report it.
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Box from its center point (YOLO-style XYWH).
    #[inline]
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Corner form `[x1, y1, x2, y2]`.
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Center point, `((x1 + x2) / 2, (y1 + y2) / 2)`, widened to f64 for control math.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        let [x1, y1, x2, y2] = self.to_tlbr();
        (
            (x1 as f64 + x2 as f64) / 2.0,
            (y1 as f64 + y2 as f64) / 2.0,
        )
    }

    /// Area of the bounding box. Degenerate boxes report zero.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}
