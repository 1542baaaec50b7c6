//! Detector seam: any model that turns a frame into labelled boxes.

use crate::integration::Frame;
use crate::tracker::{Detection, DetectorError};

/// Object detector consulted once per control cycle.
///
/// Implement this for an ONNX session, a Python bridge or a test fixture.
/// Return an empty vector, not an error, when nothing is in view; reserve
/// [`DetectorError::Unavailable`] for failures that make the detector unusable.
///
/// # Example
///
/// ```ignore
/// use pantilt_tracker::{Detection, Detector, DetectorError, Frame};
///
/// struct PersonDetector {
///     session: OnnxSession,
/// }
///
/// impl Detector for PersonDetector {
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
///         let boxes = self
///             .session
///             .run(&frame.data)
///             .map_err(|e| DetectorError::Inference(e.to_string()))?;
///         Ok(boxes.into_iter().map(|b| b.into_detection()).collect())
///     }
/// }
/// ```
pub trait Detector {
    /// Load the model. Called once before the loop starts.
    fn initialize(&mut self) -> Result<(), DetectorError> {
        Ok(())
    }

    /// Run inference on a frame and return detections.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn initialize(&mut self) -> Result<(), DetectorError> {
        (**self).initialize()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        (**self).detect(frame)
    }
}
