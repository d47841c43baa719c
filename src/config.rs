use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::output::FourCc;
use crate::overlay::OverlayStyle;

const DEFAULT_MODELS_DIR: &str = "public/models";
const DEFAULT_MODEL_EXTENSION: &str = "onnx";
const DEFAULT_INPUT_SIZE: u32 = 1408;
const DEFAULT_FALLBACK_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
struct ProcessorConfigFile {
    models: Option<ModelsConfigFile>,
    overlay: Option<OverlayConfigFile>,
    video: Option<VideoConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    dir: Option<PathBuf>,
    extension: Option<String>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    fill_bgr: Option<[u8; 3]>,
    boundary_bgr: Option<[u8; 3]>,
    stroke_width: Option<u32>,
    draw_alpha: Option<f32>,
    highlight_alpha: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    codec: Option<String>,
    fallback_fps: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub models: ModelSettings,
    pub overlay: OverlayStyle,
    pub video: VideoSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Directory holding `<model>.<extension>` files.
    pub dir: PathBuf,
    pub extension: String,
    /// Side of the square model input, in pixels.
    pub input_size: u32,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub codec: FourCc,
    /// Frame rate used when the input stream reports none.
    pub fallback_fps: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            models: ModelSettings {
                dir: PathBuf::from(DEFAULT_MODELS_DIR),
                extension: DEFAULT_MODEL_EXTENSION.to_string(),
                input_size: DEFAULT_INPUT_SIZE,
            },
            overlay: OverlayStyle::default(),
            video: VideoSettings {
                codec: FourCc::MP4V,
                fallback_fps: DEFAULT_FALLBACK_FPS,
            },
        }
    }
}

impl ProcessorConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OVERLAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ProcessorConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let models = file.models.unwrap_or_default();
        let overlay = file.overlay.unwrap_or_default();
        let video = file.video.unwrap_or_default();

        let codec = match video.codec {
            Some(tag) => FourCc::parse(&tag)?,
            None => defaults.video.codec,
        };

        Ok(Self {
            models: ModelSettings {
                dir: models.dir.unwrap_or(defaults.models.dir),
                extension: models.extension.unwrap_or(defaults.models.extension),
                input_size: models.input_size.unwrap_or(defaults.models.input_size),
            },
            overlay: OverlayStyle {
                fill_bgr: overlay.fill_bgr.unwrap_or(defaults.overlay.fill_bgr),
                boundary_bgr: overlay.boundary_bgr.unwrap_or(defaults.overlay.boundary_bgr),
                stroke_width: overlay.stroke_width.unwrap_or(defaults.overlay.stroke_width),
                draw_alpha: overlay.draw_alpha.unwrap_or(defaults.overlay.draw_alpha),
                highlight_alpha: overlay
                    .highlight_alpha
                    .unwrap_or(defaults.overlay.highlight_alpha),
            },
            video: VideoSettings {
                codec,
                fallback_fps: video.fallback_fps.unwrap_or(defaults.video.fallback_fps),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("OVERLAY_MODELS_DIR") {
            if !dir.trim().is_empty() {
                self.models.dir = PathBuf::from(dir);
            }
        }
        if let Ok(ext) = std::env::var("OVERLAY_MODEL_EXT") {
            if !ext.trim().is_empty() {
                self.models.extension = ext.trim().to_string();
            }
        }
        if let Ok(size) = std::env::var("OVERLAY_INPUT_SIZE") {
            self.models.input_size = size
                .trim()
                .parse()
                .map_err(|_| anyhow!("OVERLAY_INPUT_SIZE must be an integer number of pixels"))?;
        }
        if let Ok(codec) = std::env::var("OVERLAY_VIDEO_CODEC") {
            if !codec.trim().is_empty() {
                self.video.codec = FourCc::parse(codec.trim())?;
            }
        }
        if let Ok(fps) = std::env::var("OVERLAY_FALLBACK_FPS") {
            self.video.fallback_fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("OVERLAY_FALLBACK_FPS must be an integer frame rate"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.models.extension = self.models.extension.trim_start_matches('.').to_string();
        if self.models.extension.is_empty() {
            return Err(anyhow!("model file extension must not be empty"));
        }
        if self.models.input_size == 0 || self.models.input_size % 32 != 0 {
            return Err(anyhow!(
                "model input size must be a positive multiple of 32, got {}",
                self.models.input_size
            ));
        }
        for (name, alpha) in [
            ("draw_alpha", self.overlay.draw_alpha),
            ("highlight_alpha", self.overlay.highlight_alpha),
        ] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, alpha));
            }
        }
        if self.overlay.stroke_width == 0 {
            return Err(anyhow!("stroke width must be at least 1 pixel"));
        }
        if self.video.fallback_fps == 0 {
            return Err(anyhow!("fallback fps must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ProcessorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
