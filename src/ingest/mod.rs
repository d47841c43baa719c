//! Input sources.
//!
//! Inputs are classified once, by file extension:
//! - Video containers on the allow-list are decoded frame by frame
//!   (feature: video-ffmpeg)
//! - Everything else is read as a single still image
//!
//! No content sniffing decides between the two. A video file with an
//! unexpected extension is handed to the image decoder and fails there.

mod still;
pub mod video;
#[cfg(feature = "video-ffmpeg")]
pub(crate) mod video_ffmpeg;

use std::path::Path;

pub use still::read_image;
pub use video::VideoSource;

/// Extensions (lower-case, no dot) treated as video containers.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Image,
    Video,
}

impl InputKind {
    pub fn classify(path: &Path) -> Self {
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_video {
            Self::Video
        } else {
            Self::Image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension_case_insensitively() {
        assert_eq!(InputKind::classify(Path::new("clip.mp4")), InputKind::Video);
        assert_eq!(InputKind::classify(Path::new("clip.MOV")), InputKind::Video);
        assert_eq!(InputKind::classify(Path::new("a/b/clip.mkv")), InputKind::Video);
        assert_eq!(InputKind::classify(Path::new("clip.webm")), InputKind::Image);
        assert_eq!(InputKind::classify(Path::new("photo.png")), InputKind::Image);
        assert_eq!(InputKind::classify(Path::new("noext")), InputKind::Image);
    }
}
