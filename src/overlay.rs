//! Mask-to-overlay rendering.
//!
//! The renderer composes at most two elements onto a frame:
//! - a translucent fill over masked pixels (`draw`, `highlight`)
//! - the external boundary of the masked region (every mode except
//!   `none` and `highlight`)
//!
//! A missing mask leaves the frame untouched for every mode.

use image::Rgb;
use imageproc::contours::{find_contours_with_threshold, BorderType};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use imageproc::point::Point;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::frame::{Frame, Mask, MASK_THRESHOLD};

pub const DEFAULT_FILL_BGR: [u8; 3] = [255, 0, 0];
pub const DEFAULT_BOUNDARY_BGR: [u8; 3] = [0, 0, 255];
pub const DEFAULT_STROKE_WIDTH: u32 = 2;
pub const DEFAULT_DRAW_ALPHA: f32 = 0.1;
pub const DEFAULT_HIGHLIGHT_ALPHA: f32 = 0.3;

/// User-selected visualisation style.
///
/// Parsing never fails: unknown strings are kept as `Unrecognized` and render
/// a boundary without fill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Draw,
    Highlight,
    Outline,
    None,
    Unrecognized(String),
}

impl DisplayMode {
    pub fn parse(value: &str) -> Self {
        match value {
            "draw" => Self::Draw,
            "highlight" => Self::Highlight,
            "outline" => Self::Outline,
            "none" => Self::None,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Fill alpha for modes that paint the region, `None` otherwise.
    pub fn fill_alpha(&self, style: &OverlayStyle) -> Option<f32> {
        match self {
            Self::Draw => Some(style.draw_alpha),
            Self::Highlight => Some(style.highlight_alpha),
            _ => None,
        }
    }

    pub fn draws_boundary(&self) -> bool {
        !matches!(self, Self::None | Self::Highlight)
    }
}

impl FromStr for DisplayMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draw => f.write_str("draw"),
            Self::Highlight => f.write_str("highlight"),
            Self::Outline => f.write_str("outline"),
            Self::None => f.write_str("none"),
            Self::Unrecognized(other) => f.write_str(other),
        }
    }
}

/// Colours and weights used when compositing.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub fill_bgr: [u8; 3],
    pub boundary_bgr: [u8; 3],
    pub stroke_width: u32,
    pub draw_alpha: f32,
    pub highlight_alpha: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            fill_bgr: DEFAULT_FILL_BGR,
            boundary_bgr: DEFAULT_BOUNDARY_BGR,
            stroke_width: DEFAULT_STROKE_WIDTH,
            draw_alpha: DEFAULT_DRAW_ALPHA,
            highlight_alpha: DEFAULT_HIGHLIGHT_ALPHA,
        }
    }
}

/// Composite the mask onto `frame` in place.
///
/// The mask is resized to the frame's dimensions first. Fill is applied before
/// the boundary so the boundary stays fully opaque.
pub fn render_overlay(frame: &mut Frame, mask: Option<&Mask>, mode: &DisplayMode, style: &OverlayStyle) {
    let Some(mask) = mask else {
        return;
    };
    if *mode == DisplayMode::None {
        return;
    }

    let mask = mask.resized(frame.width(), frame.height());

    if let Some(alpha) = mode.fill_alpha(style) {
        blend_fill(frame, &mask.binarized(), style.fill_bgr, alpha);
    }
    if mode.draws_boundary() {
        let contours = external_contours(&mask);
        stroke_contours(frame, &contours, style.boundary_bgr, style.stroke_width);
    }
}

/// `dst = alpha * fill + (1 - alpha) * src`, rounded and saturated per channel.
pub fn blend_pixel(src: [u8; 3], fill: [u8; 3], alpha: f32) -> [u8; 3] {
    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = alpha * fill[c] as f32 + (1.0 - alpha) * src[c] as f32;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

fn blend_fill(frame: &mut Frame, inside: &[bool], fill: [u8; 3], alpha: f32) {
    for (px, &set) in frame.pixels_mut().zip(inside) {
        if !set {
            continue;
        }
        let blended = blend_pixel([px[0], px[1], px[2]], fill, alpha);
        px.copy_from_slice(&blended);
    }
}

// ----------------------------------------------------------------------------
// External contours
// ----------------------------------------------------------------------------

/// Outer borders of the top-level masked regions.
///
/// Hole borders are skipped, and so are regions nested inside a hole, which
/// matches external-only contour retrieval.
pub(crate) fn external_contours(mask: &Mask) -> Vec<Vec<Point<i32>>> {
    find_contours_with_threshold::<i32>(mask.as_gray(), MASK_THRESHOLD)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .map(|contour| contour.points)
        .collect()
}

/// Draw each contour as a closed polyline. Strokes wider than one pixel stamp
/// a filled disc centred on every contour point so the line straddles the
/// border evenly.
fn stroke_contours(frame: &mut Frame, contours: &[Vec<Point<i32>>], bgr: [u8; 3], stroke_width: u32) {
    let Some(mut canvas) = frame.as_image_mut() else {
        return;
    };
    let color = Rgb(bgr);
    let radius = (stroke_width / 2) as i32;
    for points in contours {
        let closing = points.first().zip(points.last());
        for (a, b) in points.iter().zip(points.iter().skip(1)).chain(closing) {
            draw_line_segment_mut(
                &mut canvas,
                (a.x as f32, a.y as f32),
                (b.x as f32, b.y as f32),
                color,
            );
        }
        if radius > 0 {
            for p in points {
                draw_filled_circle_mut(&mut canvas, (p.x, p.y), radius, color);
            }
        }
    }
}
