//! End-to-end processing of one input file.
//!
//! Each frame goes through the same stages with no state carried between
//! frames: segment, take the first mask, render the overlay, write.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::ProcessorConfig;
use crate::detect::SegmenterBackend;
use crate::frame::Frame;
use crate::ingest::{read_image, InputKind, VideoSource};
use crate::output::{normalize_image_output, write_image, VideoSink};
use crate::overlay::{render_overlay, DisplayMode};
use crate::ui::Ui;

pub const DEFAULT_CONFIDENCE: f32 = 0.35;

/// What to process and how to draw it.
#[derive(Clone, Debug)]
pub struct ProcessRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub confidence: f32,
    pub display_mode: DisplayMode,
}

impl ProcessRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            confidence: DEFAULT_CONFIDENCE,
            display_mode: DisplayMode::Draw,
        }
    }
}

/// Runs requests against one loaded model.
pub struct Processor {
    config: ProcessorConfig,
    backend: Box<dyn SegmenterBackend>,
    ui: Ui,
}

impl Processor {
    pub fn new(config: ProcessorConfig, backend: Box<dyn SegmenterBackend>, ui: Ui) -> Self {
        Self {
            config,
            backend,
            ui,
        }
    }

    /// Process one file. Returns the path actually written, which differs from
    /// the requested one when an image extension had to be normalised.
    pub fn process(&mut self, request: &ProcessRequest) -> Result<PathBuf> {
        log::info!(
            "processing {} -> {} (confidence {}, mode {})",
            request.input.display(),
            request.output.display(),
            request.confidence,
            request.display_mode
        );
        match InputKind::classify(&request.input) {
            InputKind::Video => self.process_video(request),
            InputKind::Image => self.process_image(request),
        }
    }

    /// Segment and annotate a single frame in place.
    pub fn annotate(&mut self, frame: &mut Frame, confidence: f32, mode: &DisplayMode) -> Result<()> {
        let result = self.backend.segment(frame, confidence)?;
        render_overlay(frame, result.first_mask(), mode, &self.config.overlay);
        Ok(())
    }

    /// Annotate every frame from `frames`, handing each to `write`. Returns the
    /// number of frames written.
    pub fn annotate_stream<I, W>(
        &mut self,
        frames: I,
        confidence: f32,
        mode: &DisplayMode,
        mut write: W,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = Frame>,
        W: FnMut(&Frame) -> Result<()>,
    {
        let mut count = 0u64;
        for mut frame in frames {
            self.annotate(&mut frame, confidence, mode)
                .with_context(|| format!("frame {}", count))?;
            write(&frame)?;
            count += 1;
        }
        Ok(count)
    }

    fn process_image(&mut self, request: &ProcessRequest) -> Result<PathBuf> {
        let mut frame = {
            let _stage = self.ui.stage("read image");
            read_image(&request.input)?
        };
        {
            let _stage = self.ui.stage("segment + overlay");
            self.annotate(&mut frame, request.confidence, &request.display_mode)?;
        }

        let output = normalize_image_output(&request.output);
        if output != request.output {
            log::info!(
                "unsupported image extension, writing {} instead",
                output.display()
            );
        }
        let _stage = self.ui.stage("write image");
        write_image(&frame, &output)?;
        Ok(output)
    }

    fn process_video(&mut self, request: &ProcessRequest) -> Result<PathBuf> {
        let mut source = VideoSource::open(&request.input)?;
        let info = source.info();
        let fps = info.fps_or(self.config.video.fallback_fps);
        if fps != info.fps {
            log::warn!(
                "{} reports no frame rate, writing at {} fps",
                request.input.display(),
                fps
            );
        }

        let mut sink = VideoSink::create(
            &request.output,
            self.config.video.codec,
            fps,
            info.width,
            info.height,
        )?;

        let written = {
            let _stage = self.ui.stage("segment + overlay video");
            let progress = self.ui.frames(info.total_frames);
            self.annotate_stream(&mut source, request.confidence, &request.display_mode, |frame| {
                sink.write(frame)?;
                progress.tick();
                Ok(())
            })?
        };
        sink.finish()?;
        log::info!(
            "decoded {} frames, wrote {} to {}",
            source.frames_read(),
            written,
            request.output.display()
        );
        Ok(request.output.clone())
    }
}
