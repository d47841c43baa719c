//! Video frame source.
//!
//! `VideoSource` yields decoded BGR frames until the stream ends. A decode
//! error mid-stream is logged and ends iteration exactly like end-of-stream;
//! callers cannot tell the two apart.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::frame::Frame;

/// Stream properties reported by the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoInfo {
    /// Whole frames per second (fractional rates are truncated). Zero when
    /// the container does not report a rate.
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    /// Frame count when the container reports one.
    pub total_frames: Option<u64>,
}

impl VideoInfo {
    /// Reported frame rate, or `fallback` when the stream reports none.
    pub fn fps_or(&self, fallback: u32) -> u32 {
        if self.fps == 0 {
            fallback
        } else {
            self.fps
        }
    }
}

/// Decoder behind a `VideoSource`.
pub(crate) trait FrameDecoder {
    /// Next decoded frame, `None` once the stream is exhausted.
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// Local video file frame source.
pub struct VideoSource {
    decoder: Box<dyn FrameDecoder>,
    path: PathBuf,
    info: VideoInfo,
    frames_read: u64,
    finished: bool,
}

impl VideoSource {
    pub fn open(path: &Path) -> Result<Self> {
        #[cfg(feature = "video-ffmpeg")]
        {
            let decoder = super::video_ffmpeg::FfmpegVideoSource::new(path)?;
            let info = decoder.info();
            log::info!(
                "VideoSource: opened {} ({}x{} @ {} fps)",
                path.display(),
                info.width,
                info.height,
                info.fps
            );
            Ok(Self::from_decoder(path, info, Box::new(decoder)))
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow::anyhow!(
                "cannot open video {}: video input requires the video-ffmpeg feature",
                path.display()
            ))
        }
    }

    pub(crate) fn from_decoder(path: &Path, info: VideoInfo, decoder: Box<dyn FrameDecoder>) -> Self {
        Self {
            decoder,
            path: path.to_path_buf(),
            info,
            frames_read: 0,
            finished: false,
        }
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl Iterator for VideoSource {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        match self.decoder.read_frame() {
            Ok(Some(frame)) => {
                self.frames_read += 1;
                Some(frame)
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                log::warn!(
                    "VideoSource: read failed on {} after {} frames, treating as end of stream: {:#}",
                    self.path.display(),
                    self.frames_read,
                    e
                );
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of decoder results.
    struct Scripted(VecDeque<Result<Option<Frame>>>);

    impl FrameDecoder for Scripted {
        fn read_frame(&mut self) -> Result<Option<Frame>> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    fn info() -> VideoInfo {
        VideoInfo {
            fps: 25,
            width: 4,
            height: 2,
            total_frames: None,
        }
    }

    #[test]
    fn decode_error_ends_the_stream() {
        let frame = Frame::filled(4, 2, [1, 2, 3]);
        let script = VecDeque::from(vec![
            Ok(Some(frame.clone())),
            Ok(Some(frame.clone())),
            Err(anyhow::anyhow!("corrupt packet")),
            Ok(Some(frame)),
        ]);
        let mut source =
            VideoSource::from_decoder(Path::new("clip.mp4"), info(), Box::new(Scripted(script)));

        assert_eq!(source.by_ref().count(), 2);
        assert_eq!(source.frames_read(), 2);
        assert!(source.next().is_none());
    }

    #[test]
    fn zero_fps_uses_fallback() {
        assert_eq!(info().fps_or(30), 25);
        let silent = VideoInfo { fps: 0, ..info() };
        assert_eq!(silent.fps_or(30), 30);
    }

    #[cfg(not(feature = "video-ffmpeg"))]
    #[test]
    fn open_without_ffmpeg_names_the_feature() {
        let err = match VideoSource::open(Path::new("clip.mp4")) {
            Ok(_) => panic!("video input must be unavailable"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("video-ffmpeg"), "{err}");
    }
}
