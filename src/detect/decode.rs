//! YOLO segmentation output decoding.
//!
//! Segmentation exports emit two tensors:
//! - predictions `[1, 4 + classes + coeffs, anchors]`: box centre/size in
//!   model-input pixels, per-class scores, mask coefficients
//! - prototypes `[1, coeffs, proto_h, proto_w]`: the low-resolution mask basis
//!
//! A detection's mask is `sigmoid(coeffs . protos)` scaled to 0-255 and
//! cropped to its box; it is thresholded only after resizing to the frame. Only the best-scoring anchor is decoded into a mask.

use anyhow::{anyhow, Result};

use crate::detect::result::{Detection, SegmentationResult};
use crate::frame::Mask;

/// Padding value used when letterboxing.
pub const LETTERBOX_FILL: u8 = 114;

/// Aspect-preserving placement of a frame inside a square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    /// Side of the square model input.
    pub size: u32,
    /// Frame-to-input scale factor.
    pub scale: f32,
    /// Resized frame dimensions inside the input.
    pub new_width: u32,
    pub new_height: u32,
    /// Offset of the resized frame inside the input.
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, size: u32) -> Result<Self> {
        if width == 0 || height == 0 || size == 0 {
            return Err(anyhow!(
                "cannot letterbox {}x{} into {}x{}",
                width,
                height,
                size,
                size
            ));
        }
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        Ok(Self {
            size,
            scale,
            new_width,
            new_height,
            pad_x: (size - new_width) / 2,
            pad_y: (size - new_height) / 2,
        })
    }

    /// Map an input-space point back to frame pixels.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Borrowed view of the two raw output tensors.
pub struct SegOutputs<'a> {
    pub preds: &'a [f32],
    /// `[batch, channels, anchors]`
    pub preds_shape: [usize; 3],
    pub protos: &'a [f32],
    /// `[batch, coeffs, proto_h, proto_w]`
    pub protos_shape: [usize; 4],
}

impl SegOutputs<'_> {
    fn validate(&self) -> Result<(usize, usize)> {
        let [_, channels, anchors] = self.preds_shape;
        let [_, coeffs, ph, pw] = self.protos_shape;
        if channels <= 4 + coeffs {
            return Err(anyhow!(
                "prediction tensor has {} channels, expected more than {} (4 box + {} mask coefficients)",
                channels,
                4 + coeffs,
                coeffs
            ));
        }
        if ph == 0 || pw == 0 {
            return Err(anyhow!("prototype tensor has an empty {}x{} plane", ph, pw));
        }
        if self.preds.len() < channels * anchors {
            return Err(anyhow!(
                "prediction tensor holds {} values, shape needs {}",
                self.preds.len(),
                channels * anchors
            ));
        }
        if self.protos.len() < coeffs * ph * pw {
            return Err(anyhow!(
                "prototype tensor holds {} values, shape needs {}",
                self.protos.len(),
                coeffs * ph * pw
            ));
        }
        Ok((channels - 4 - coeffs, anchors))
    }

    fn pred(&self, channel: usize, anchor: usize) -> f32 {
        self.preds[channel * self.preds_shape[2] + anchor]
    }
}

/// Decode the best detection scoring strictly above `confidence`.
pub fn decode_first(
    outputs: &SegOutputs<'_>,
    letterbox: &Letterbox,
    frame_width: u32,
    frame_height: u32,
    confidence: f32,
) -> Result<SegmentationResult> {
    let (classes, anchors) = outputs.validate()?;

    let mut best: Option<(usize, usize, f32)> = None;
    let mut candidates = 0usize;
    for anchor in 0..anchors {
        let (class_id, score) = (0..classes)
            .map(|c| (c, outputs.pred(4 + c, anchor)))
            .fold((0, f32::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if score.is_nan() || score <= confidence {
            continue;
        }
        candidates += 1;
        if best.map_or(true, |(_, _, s)| score > s) {
            best = Some((anchor, class_id, score));
        }
    }

    let Some((anchor, class_id, score)) = best else {
        return Ok(SegmentationResult::default());
    };

    let cx = outputs.pred(0, anchor);
    let cy = outputs.pred(1, anchor);
    let w = outputs.pred(2, anchor);
    let h = outputs.pred(3, anchor);
    let input_box = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0];

    let coeffs: Vec<f32> = (0..outputs.protos_shape[1])
        .map(|j| outputs.pred(4 + classes + j, anchor))
        .collect();
    let mask = assemble_mask(outputs, &coeffs, input_box, letterbox)?;

    let (x1, y1) = letterbox.to_frame(input_box[0], input_box[1]);
    let (x2, y2) = letterbox.to_frame(input_box[2], input_box[3]);
    let (fw, fh) = (frame_width as f32, frame_height as f32);

    Ok(SegmentationResult {
        detection: Some(Detection {
            bbox: [x1.clamp(0.0, fw), y1.clamp(0.0, fh), x2.clamp(0.0, fw), y2.clamp(0.0, fh)],
            confidence: score,
            class_id,
            mask,
        }),
        discarded: candidates - 1,
    })
}

/// Build the soft mask at prototype resolution, restricted to the part of the
/// input covered by the frame (letterbox padding removed). Values stay
/// continuous so thresholding happens after upsampling to frame size.
fn assemble_mask(
    outputs: &SegOutputs<'_>,
    coeffs: &[f32],
    input_box: [f32; 4],
    letterbox: &Letterbox,
) -> Result<Mask> {
    let [_, _, ph, pw] = outputs.protos_shape;
    let sx = pw as f32 / letterbox.size as f32;
    let sy = ph as f32 / letterbox.size as f32;

    let x0 = ((letterbox.pad_x as f32 * sx).floor() as usize).min(pw.saturating_sub(1));
    let y0 = ((letterbox.pad_y as f32 * sy).floor() as usize).min(ph.saturating_sub(1));
    let x1 = (((letterbox.pad_x + letterbox.new_width) as f32 * sx).ceil() as usize).clamp(x0 + 1, pw);
    let y1 = (((letterbox.pad_y + letterbox.new_height) as f32 * sy).ceil() as usize).clamp(y0 + 1, ph);

    let bx1 = input_box[0] * sx;
    let by1 = input_box[1] * sy;
    let bx2 = input_box[2] * sx;
    let by2 = input_box[3] * sy;

    let plane = ph * pw;
    let (out_w, out_h) = (x1 - x0, y1 - y0);
    let mut data = Vec::with_capacity(out_w * out_h);
    for y in y0..y1 {
        for x in x0..x1 {
            let in_box = (x as f32) >= bx1 && (x as f32) < bx2 && (y as f32) >= by1 && (y as f32) < by2;
            if !in_box {
                data.push(0);
                continue;
            }
            let idx = y * pw + x;
            let logit: f32 = coeffs
                .iter()
                .enumerate()
                .map(|(j, c)| c * outputs.protos[j * plane + idx])
                .sum();
            data.push((sigmoid(logit) * 255.0).round() as u8);
        }
    }
    Mask::new(data, out_w as u32, out_h as u32)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One class, one coefficient, `anchors` columns; 8x8 protos for a 32px input.
    fn synth(anchors: &[[f32; 6]], proto_value: f32) -> (Vec<f32>, Vec<f32>) {
        let channels = 6;
        let mut preds = vec![0.0; channels * anchors.len()];
        for (a, values) in anchors.iter().enumerate() {
            for (c, v) in values.iter().enumerate() {
                preds[c * anchors.len() + a] = *v;
            }
        }
        (preds, vec![proto_value; 64])
    }

    #[test]
    fn letterbox_centres_wide_frames() -> Result<()> {
        let lb = Letterbox::fit(64, 32, 32)?;
        assert_eq!((lb.new_width, lb.new_height), (32, 16));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 8));
        assert_eq!(lb.to_frame(16.0, 8.0), (32.0, 0.0));
        Ok(())
    }

    #[test]
    fn picks_highest_score_above_threshold() -> Result<()> {
        // [cx, cy, w, h, score, coeff]
        let (preds, protos) = synth(
            &[
                [8.0, 8.0, 8.0, 8.0, 0.5, 1.0],
                [16.0, 16.0, 16.0, 16.0, 0.8, 1.0],
                [24.0, 24.0, 4.0, 4.0, 0.2, 1.0],
            ],
            1.0,
        );
        let outputs = SegOutputs {
            preds: &preds,
            preds_shape: [1, 6, 3],
            protos: &protos,
            protos_shape: [1, 1, 8, 8],
        };
        let lb = Letterbox::fit(32, 32, 32)?;
        let result = decode_first(&outputs, &lb, 32, 32, 0.35)?;
        let det = result.detection.expect("detection");
        assert_eq!(det.confidence, 0.8);
        assert_eq!(result.discarded, 1);
        assert_eq!(det.bbox, [8.0, 8.0, 24.0, 24.0]);

        // Box spans proto cells 2..6 on both axes.
        assert_eq!((det.mask.width(), det.mask.height()), (8, 8));
        assert!(det.mask.is_set(2, 2));
        assert!(det.mask.is_set(5, 5));
        assert!(!det.mask.is_set(6, 6));
        assert!(!det.mask.is_set(1, 1));
        Ok(())
    }

    #[test]
    fn nothing_above_threshold_yields_empty_result() -> Result<()> {
        let (preds, protos) = synth(&[[8.0, 8.0, 8.0, 8.0, 0.35, 1.0]], 1.0);
        let outputs = SegOutputs {
            preds: &preds,
            preds_shape: [1, 6, 1],
            protos: &protos,
            protos_shape: [1, 1, 8, 8],
        };
        let lb = Letterbox::fit(32, 32, 32)?;
        assert!(decode_first(&outputs, &lb, 32, 32, 0.35)?.is_empty());
        Ok(())
    }

    #[test]
    fn negative_logits_clear_the_mask() -> Result<()> {
        let (preds, protos) = synth(&[[16.0, 16.0, 32.0, 32.0, 0.9, 1.0]], -2.0);
        let outputs = SegOutputs {
            preds: &preds,
            preds_shape: [1, 6, 1],
            protos: &protos,
            protos_shape: [1, 1, 8, 8],
        };
        let lb = Letterbox::fit(32, 32, 32)?;
        let result = decode_first(&outputs, &lb, 32, 32, 0.35)?;
        let mask = result.first_mask().expect("mask");
        assert!((0..8).all(|y| (0..8).all(|x| !mask.is_set(x, y))));
        Ok(())
    }

    #[test]
    fn padding_rows_are_cropped() -> Result<()> {
        let (preds, protos) = synth(&[[16.0, 16.0, 32.0, 32.0, 0.9, 1.0]], 1.0);
        let outputs = SegOutputs {
            preds: &preds,
            preds_shape: [1, 6, 1],
            protos: &protos,
            protos_shape: [1, 1, 8, 8],
        };
        // 64x32 frame: rows 0..2 and 6..8 of the protos are padding.
        let lb = Letterbox::fit(64, 32, 32)?;
        let result = decode_first(&outputs, &lb, 64, 32, 0.35)?;
        let mask = result.first_mask().expect("mask");
        assert_eq!((mask.width(), mask.height()), (8, 4));
        Ok(())
    }

    #[test]
    fn rejects_malformed_shapes() {
        let preds = vec![0.0; 5];
        let protos = vec![0.0; 64];
        let outputs = SegOutputs {
            preds: &preds,
            preds_shape: [1, 5, 1],
            protos: &protos,
            protos_shape: [1, 1, 8, 8],
        };
        let lb = Letterbox::fit(32, 32, 32).expect("letterbox");
        assert!(decode_first(&outputs, &lb, 32, 32, 0.35).is_err());
    }

    #[test]
    fn soft_mask_edge_follows_upsampled_logits() -> Result<()> {
        // Logit ramp `x - 3` crosses zero exactly on proto column 3.
        let (preds, _) = synth(&[[16.0, 16.0, 32.0, 32.0, 0.9, 1.0]], 0.0);
        let protos: Vec<f32> = (0..64).map(|i| (i % 8) as f32 - 3.0).collect();
        let outputs = SegOutputs {
            preds: &preds,
            preds_shape: [1, 6, 1],
            protos: &protos,
            protos_shape: [1, 1, 8, 8],
        };
        let lb = Letterbox::fit(32, 32, 32)?;
        let result = decode_first(&outputs, &lb, 32, 32, 0.35)?;
        let mask = result.first_mask().expect("mask");
        assert_eq!(mask.value(3, 0), 128);
        assert!(mask.value(2, 0) > 0 && mask.value(2, 0) < 128);

        // Upsampling 8x: the zero crossing sits at x = 27.5 in the large
        // mask, so the region starts at column 28. Thresholding before the
        // resize would push the edge out to column 32.
        let large = mask.resized(64, 8);
        for y in 0..8 {
            assert!(!large.is_set(27, y), "row {y}");
            assert!(large.is_set(28, y), "row {y}");
        }
        Ok(())
    }
}
