//! Pixel containers for the overlay pipeline.
//!
//! - `Frame`: 8-bit BGR pixel grid, the unit every stage passes along.
//! - `Mask`: single-channel 0-255 grid produced by a segmentation backend.
//!
//! Frames are mutated in place by the overlay renderer. Masks arrive at the
//! model's native resolution and must be resized to the frame before use.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Rgb, RgbImage};

/// Mask values above this count as "inside" the detected region.
pub const MASK_THRESHOLD: u8 = 128;

// ----------------------------------------------------------------------------
// Frame: BGR pixel grid
// ----------------------------------------------------------------------------

/// Row-major BGR frame, 3 bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap raw BGR bytes. Length must be exactly `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = bgr_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Frame with every pixel set to `bgr`.
    pub fn filled(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&bgr);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Convert from an RGB image, swapping channels into BGR order.
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = image.into_raw();
        swap_red_blue(&mut data);
        Self {
            data,
            width,
            height,
        }
    }

    /// Copy out as an RGB image for encoding.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let mut rgb = self.data.clone();
        swap_red_blue(&mut rgb);
        RgbImage::from_raw(self.width, self.height, rgb)
            .ok_or_else(|| anyhow!("failed to convert frame into image buffer"))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = self.index(x, y);
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Mutable access to all pixels as BGR triples.
    pub(crate) fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(3)
    }

    /// Borrow the pixels as an image buffer for in-place drawing. Channels keep
    /// BGR order, so colours passed to drawing routines must be BGR too.
    pub(crate) fn as_image_mut(&mut self) -> Option<ImageBuffer<Rgb<u8>, &mut [u8]>> {
        ImageBuffer::from_raw(self.width, self.height, self.data.as_mut_slice())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }
}

fn bgr_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn swap_red_blue(data: &mut [u8]) {
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
}

// ----------------------------------------------------------------------------
// Mask: single-channel detection region
// ----------------------------------------------------------------------------

/// Single-channel mask, 0 = outside, 255 = inside. Backends may emit soft
/// values; anything above `MASK_THRESHOLD` counts as inside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let image = GrayImage::from_raw(width, height, data).ok_or_else(|| {
            anyhow!(
                "mask buffer does not match {}x{} dimensions",
                width,
                height
            )
        })?;
        Ok(Self { image })
    }

    /// Build a mask from a per-pixel predicate.
    pub fn from_fn(width: u32, height: u32, mut inside: impl FnMut(u32, u32) -> bool) -> Self {
        let image = GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if inside(x, y) { 255 } else { 0 }])
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y).0[0]
    }

    /// True when the pixel counts as inside the region.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.value(x, y) > MASK_THRESHOLD
    }

    /// Bilinear resize to the given frame dimensions. No-op copy when the size
    /// already matches.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.image.dimensions() == (width, height) {
            return self.clone();
        }
        Self {
            image: imageops::resize(&self.image, width, height, FilterType::Triangle),
        }
    }

    pub(crate) fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    /// Binarised copy of the mask as a flat row-major bool grid.
    pub(crate) fn binarized(&self) -> Vec<bool> {
        self.image
            .as_raw()
            .iter()
            .map(|&v| v > MASK_THRESHOLD)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_round_trip_swaps_channels() -> Result<()> {
        let rgb = RgbImage::from_raw(1, 1, vec![10, 20, 30]).expect("1x1 image");
        let frame = Frame::from_rgb_image(rgb);
        assert_eq!(frame.pixel(0, 0), [30, 20, 10]);
        assert_eq!(frame.to_rgb_image()?.as_raw(), &vec![10, 20, 30]);
        Ok(())
    }

    #[test]
    fn frame_rejects_wrong_length() {
        assert!(Frame::new(vec![0u8; 11], 2, 2).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2).is_ok());
    }

    #[test]
    fn resized_mask_keeps_solid_region() {
        let mask = Mask::from_fn(4, 4, |_, _| true);
        let big = mask.resized(16, 8);
        assert_eq!((big.width(), big.height()), (16, 8));
        assert!(big.binarized().iter().all(|&inside| inside));
    }

    #[test]
    fn mask_threshold_is_exclusive() -> Result<()> {
        let mask = Mask::new(vec![128, 129], 2, 1)?;
        assert!(!mask.is_set(0, 0));
        assert!(mask.is_set(1, 0));
        Ok(())
    }
}
