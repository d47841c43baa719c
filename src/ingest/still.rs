use anyhow::{anyhow, Result};
use image::{DynamicImage, ImageReader};
use std::path::Path;

use crate::frame::Frame;

/// Read a still image into a BGR frame.
///
/// The decoder implied by the file extension is tried first; alpha is
/// flattened away. If that fails the file is decoded again with its format
/// guessed from content. When both fail the error carries the first
/// decoder's message.
pub fn read_image(path: &Path) -> Result<Frame> {
    match image::open(path) {
        Ok(image) => Ok(to_frame(image)),
        Err(primary) => {
            log::warn!(
                "extension-based decode of {} failed ({}), sniffing content",
                path.display(),
                primary
            );
            sniff_decode(path).map_err(|_| {
                anyhow!(
                    "Could not read image: {}. Error: {}",
                    path.display(),
                    primary
                )
            })
        }
    }
}

fn sniff_decode(path: &Path) -> Result<Frame> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(to_frame(image))
}

fn to_frame(image: DynamicImage) -> Frame {
    Frame::from_rgb_image(image.into_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn rgba_png_is_flattened_to_bgr() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 128])).save(&path)?;

        let frame = read_image(&path)?;
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.pixel(0, 0), [30, 20, 10]);
        Ok(())
    }

    #[test]
    fn mislabelled_file_falls_back_to_content_sniffing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let png = dir.path().join("real.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3])).save(&png)?;
        let mislabelled = dir.path().join("photo.jpg");
        std::fs::copy(&png, &mislabelled)?;

        let frame = read_image(&mislabelled)?;
        assert_eq!(frame.pixel(3, 3), [3, 2, 1]);
        Ok(())
    }

    #[test]
    fn unreadable_file_reports_path_and_cause() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image")?;

        let err = read_image(&path).expect_err("garbage must not decode");
        let message = err.to_string();
        assert!(message.starts_with("Could not read image: "), "{message}");
        assert!(message.contains("garbage.png"), "{message}");
        assert!(message.contains(". Error: "), "{message}");
        Ok(())
    }
}
