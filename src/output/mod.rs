//! Result writers.
//!
//! - Images: one compressed file, extension normalised to a supported format.
//! - Video (feature: video-ffmpeg): frames encoded incrementally with a fixed
//!   four-character codec tag.

mod still;
pub mod video;
#[cfg(feature = "video-ffmpeg")]
pub(crate) mod video_ffmpeg;

pub use still::{normalize_image_output, write_image, IMAGE_OUTPUT_EXTENSIONS};
pub use video::{FourCc, VideoSink};
