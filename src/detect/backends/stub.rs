use anyhow::Result;

use crate::detect::backend::SegmenterBackend;
use crate::detect::result::{Detection, SegmentationResult};
use crate::frame::{Frame, Mask};

/// Confidence the stub reports for its fixed detection.
pub const STUB_CONFIDENCE: f32 = 0.9;

/// Stub backend for testing. Returns the same mask for every frame.
pub struct StubBackend {
    mask: Option<Mask>,
    calls: u64,
}

impl StubBackend {
    /// Backend that reports `mask` covering the whole frame, or nothing.
    pub fn new(mask: Option<Mask>) -> Self {
        Self { mask, calls: 0 }
    }

    /// Backend that never detects anything.
    pub fn empty() -> Self {
        Self::new(None)
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::empty()
    }
}

impl SegmenterBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn device(&self) -> &'static str {
        "cpu"
    }

    fn segment(&mut self, frame: &Frame, confidence: f32) -> Result<SegmentationResult> {
        self.calls += 1;

        let detection = self
            .mask
            .as_ref()
            .filter(|_| STUB_CONFIDENCE > confidence)
            .map(|mask| Detection {
                bbox: [0.0, 0.0, frame.width() as f32, frame.height() as f32],
                confidence: STUB_CONFIDENCE,
                class_id: 0,
                mask: mask.clone(),
            });

        Ok(SegmentationResult {
            detection,
            discarded: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_backend_respects_threshold() -> Result<()> {
        let mask = Mask::from_fn(4, 4, |x, _| x < 2);
        let mut backend = StubBackend::new(Some(mask));
        let frame = Frame::filled(8, 8, [0, 0, 0]);

        let r1 = backend.segment(&frame, 0.35)?;
        assert!(r1.first_mask().is_some());
        assert_eq!(r1.detection.as_ref().map(|d| d.bbox), Some([0.0, 0.0, 8.0, 8.0]));

        let r2 = backend.segment(&frame, 0.95)?;
        assert!(r2.is_empty());
        assert_eq!(backend.calls(), 2);
        Ok(())
    }
}
