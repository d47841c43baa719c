mod backend;
mod backends;
pub mod decode;
mod loader;
mod result;

pub use backend::SegmenterBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decode::Letterbox;
pub use loader::{list_models, load_model, resolve_model_path};
pub use result::{Detection, SegmentationResult};
