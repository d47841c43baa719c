use anyhow::Result;

use crate::detect::result::SegmentationResult;
use crate::frame::Frame;

/// Segmentation backend trait.
///
/// A backend owns a loaded model bound to one compute device for its whole
/// lifetime. Each `segment` call is independent: no state carries between
/// frames.
pub trait SegmenterBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Compute device the model was bound to at load time.
    fn device(&self) -> &'static str;

    /// Run segmentation on a BGR frame, keeping detections scoring above
    /// `confidence`.
    fn segment(&mut self, frame: &Frame, confidence: f32) -> Result<SegmentationResult>;
}
