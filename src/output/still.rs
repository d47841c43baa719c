use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::frame::Frame;

/// Extensions written as-is. Anything else is rewritten to `.jpg`.
pub const IMAGE_OUTPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Replace an unsupported (or missing) image extension with `.jpg`.
pub fn normalize_image_output(path: &Path) -> PathBuf {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_OUTPUT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if supported {
        path.to_path_buf()
    } else {
        path.with_extension("jpg")
    }
}

/// Encode `frame` to `path`, format chosen by extension.
pub fn write_image(frame: &Frame, path: &Path) -> Result<()> {
    let rgb = frame.to_rgb_image()?;
    rgb.save(path)
        .with_context(|| format!("failed to write image {}", path.display()))?;
    log::info!(
        "wrote {}x{} image to {}",
        frame.width(),
        frame.height(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_are_kept() {
        for name in ["out.jpg", "out.jpeg", "out.png", "out.PNG"] {
            assert_eq!(normalize_image_output(Path::new(name)), PathBuf::from(name));
        }
    }

    #[test]
    fn unsupported_extensions_become_jpg() {
        assert_eq!(
            normalize_image_output(Path::new("dir/out.bmp")),
            PathBuf::from("dir/out.jpg")
        );
        assert_eq!(
            normalize_image_output(Path::new("dir/out.webp")),
            PathBuf::from("dir/out.jpg")
        );
        assert_eq!(
            normalize_image_output(Path::new("dir/out")),
            PathBuf::from("dir/out.jpg")
        );
    }

    #[test]
    fn written_image_keeps_dimensions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["frame.png", "frame.jpg"] {
            let path = dir.path().join(name);
            write_image(&Frame::filled(7, 5, [10, 200, 30]), &path)?;
            let back = image::open(&path)?;
            assert_eq!((back.width(), back.height()), (7, 5));
        }
        Ok(())
    }
}
