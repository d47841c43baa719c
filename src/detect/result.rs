use crate::frame::Mask;

/// A single segmented detection.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Bounding box in frame pixels: `[x1, y1, x2, y2]`.
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
    /// Region mask at the backend's native resolution.
    pub mask: Mask,
}

/// Result of running segmentation on a frame.
///
/// Only the highest-confidence detection is materialised; the rest are
/// counted in `discarded` and dropped.
#[derive(Clone, Debug, Default)]
pub struct SegmentationResult {
    pub detection: Option<Detection>,
    pub discarded: usize,
}

impl SegmentationResult {
    pub fn first_mask(&self) -> Option<&Mask> {
        self.detection.as_ref().map(|d| &d.mask)
    }

    pub fn is_empty(&self) -> bool {
        self.detection.is_none()
    }
}
