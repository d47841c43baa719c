//! Video output sink.
//!
//! `VideoSink` accepts annotated frames one at a time and encodes them with
//! the configured four-character codec tag. The container is chosen by the
//! output path's extension.

use anyhow::{anyhow, Result};
use std::fmt;
use std::path::Path;

use crate::frame::Frame;

/// Four-character codec identifier, e.g. `mp4v`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const MP4V: FourCc = FourCc(*b"mp4v");

    pub fn parse(tag: &str) -> Result<Self> {
        let bytes = tag.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(anyhow!(
                "codec tag must be exactly four printable ASCII characters, got {:?}",
                tag
            ));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Lower-cased tag, for case-insensitive matching.
    pub fn normalized(&self) -> String {
        self.to_string().to_ascii_lowercase()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

/// Encoder for annotated video frames.
pub struct VideoSink {
    #[cfg(feature = "video-ffmpeg")]
    inner: super::video_ffmpeg::FfmpegVideoSink,
    frames_written: u64,
}

impl VideoSink {
    pub fn create(path: &Path, codec: FourCc, fps: u32, width: u32, height: u32) -> Result<Self> {
        if fps == 0 || width == 0 || height == 0 {
            return Err(anyhow!(
                "cannot open video writer at {} fps for {}x{} frames",
                fps,
                width,
                height
            ));
        }
        #[cfg(feature = "video-ffmpeg")]
        {
            let inner =
                super::video_ffmpeg::FfmpegVideoSink::new(path, codec, fps, width, height)?;
            log::info!(
                "VideoSink: writing {}x{} @ {} fps ({}) to {}",
                width,
                height,
                fps,
                codec,
                path.display()
            );
            Ok(Self {
                inner,
                frames_written: 0,
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            let _ = (path, codec);
            Err(anyhow!("video output requires the video-ffmpeg feature"))
        }
    }

    /// Encode one frame.
    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        #[cfg(feature = "video-ffmpeg")]
        self.inner.write(frame)?;
        #[cfg(not(feature = "video-ffmpeg"))]
        let _ = frame;
        self.frames_written += 1;
        Ok(())
    }

    /// Flush the encoder and close the container.
    pub fn finish(self) -> Result<u64> {
        #[cfg(feature = "video-ffmpeg")]
        self.inner.finish()?;
        Ok(self.frames_written)
    }
}
