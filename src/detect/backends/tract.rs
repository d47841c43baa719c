#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::backend::SegmenterBackend;
use crate::detect::decode::{decode_first, Letterbox, SegOutputs, LETTERBOX_FILL};
use crate::detect::result::SegmentationResult;
use crate::frame::Frame;

/// Tract-based backend for YOLO segmentation models exported to ONNX.
///
/// The model is loaded once, with a fixed square input of `input_size`
/// pixels, and executes on the CPU.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame, letterbox: &Letterbox) -> Result<Tensor> {
        let rgb = frame.to_rgb_image()?;
        let resized = imageops::resize(
            &rgb,
            letterbox.new_width,
            letterbox.new_height,
            FilterType::Triangle,
        );
        let mut canvas = RgbImage::from_pixel(
            self.input_size,
            self.input_size,
            Rgb([LETTERBOX_FILL; 3]),
        );
        imageops::replace(
            &mut canvas,
            &resized,
            letterbox.pad_x as i64,
            letterbox.pad_y as i64,
        );

        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            canvas.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }
}

/// Copy a tensor into a flat `f32` buffer along with its shape.
fn tensor_f32(tensor: &Tensor) -> Result<(Vec<f32>, Vec<usize>)> {
    let view = tensor
        .to_array_view::<f32>()
        .context("model output tensor was not f32")?;
    Ok((view.iter().copied().collect(), view.shape().to_vec()))
}

impl SegmenterBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn device(&self) -> &'static str {
        "cpu"
    }

    fn segment(&mut self, frame: &Frame, confidence: f32) -> Result<SegmentationResult> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), self.input_size)?;
        let input = self.build_input(frame, &letterbox)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        // Prediction and prototype tensors are told apart by rank.
        let mut preds = None;
        let mut protos = None;
        for output in outputs.iter() {
            let (data, shape) = tensor_f32(output)?;
            match shape.as_slice() {
                [b, c, a] => preds = Some((data, [*b, *c, *a])),
                [b, c, h, w] => protos = Some((data, [*b, *c, *h, *w])),
                _ => {}
            }
        }
        let (preds, preds_shape) =
            preds.ok_or_else(|| anyhow!("model produced no rank-3 prediction tensor"))?;
        let (protos, protos_shape) = protos.ok_or_else(|| {
            anyhow!("model produced no rank-4 prototype tensor (is this a segmentation model?)")
        })?;

        let result = decode_first(
            &SegOutputs {
                preds: &preds,
                preds_shape,
                protos: &protos,
                protos_shape,
            },
            &letterbox,
            frame.width(),
            frame.height(),
            confidence,
        )?;
        if result.discarded > 0 {
            log::debug!(
                "tract: kept first detection, discarded {} more",
                result.discarded
            );
        }
        Ok(result)
    }
}
