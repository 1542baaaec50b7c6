//! Frame acquisition seam.

use crate::tracker::FrameError;

/// Raw image handed from the frame source to the detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Pixel bytes; layout is agreed between the frame source and the detector
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Monotonic capture counter
    pub sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            sequence,
        }
    }
}

/// Supplies one frame per control cycle (camera, video file, test fixture).
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, FrameError>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Result<Frame, FrameError>,
{
    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        self()
    }
}
