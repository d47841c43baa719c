//! Segmentation mask overlay
//!
//! Runs a YOLO segmentation model over an image or every frame of a video and
//! draws the first detected region onto the frame: a translucent fill, a
//! boundary outline, or both, depending on the display mode.
//!
//! # Pipeline
//!
//! 1. `detect::load_model` resolves a model identifier to a file under the
//!    models directory and loads it onto the compute device.
//! 2. `ingest` classifies the input by extension and yields BGR frames.
//! 3. A `SegmenterBackend` returns at most one mask per frame.
//! 4. `overlay::render_overlay` composites the mask in place.
//! 5. `output` writes a single image or an encoded video.
//!
//! # Module Structure
//!
//! - `frame`: pixel containers (Frame, Mask)
//! - `detect`: backends, YOLO-seg decoding, model resolution
//! - `ingest` / `output`: file decoding and encoding
//! - `overlay`: display modes and compositing
//! - `pipeline`: per-file orchestration
//! - `config`, `report`, `ui`: ambient concerns for the binary

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod ui;

pub use config::{ModelSettings, ProcessorConfig, VideoSettings};
pub use detect::{
    list_models, load_model, resolve_model_path, Detection, SegmentationResult, SegmenterBackend,
    StubBackend,
};
pub use frame::{Frame, Mask};
pub use ingest::{read_image, InputKind, VideoSource};
pub use output::{normalize_image_output, write_image, FourCc, VideoSink};
pub use overlay::{render_overlay, DisplayMode, OverlayStyle};
pub use pipeline::{ProcessRequest, Processor, DEFAULT_CONFIDENCE};
pub use report::Report;
pub use ui::{Ui, UiMode};
