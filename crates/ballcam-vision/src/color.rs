use ballcam_core::{Hsv, HsvRange};
use image::{GrayImage, Luma, Rgb};
use imageproc::map::map_colors;

use crate::Frame;

/// Convert a pixel to 8-bit HSV: hue is halved to fit `0..180`, saturation and value
/// are scaled to `0..=255`.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> Hsv {
    let [r, g, b] = pixel.0.map(f64::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max > 0.0 { 255.0 * diff / max } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: ((h / 2.0).round() as u32 % 180) as u8,
        s: s.round() as u8,
        v: max as u8,
    }
}

/// Binary mask of the pixels whose colour lies inside `range` (255 inside, 0 outside).
pub fn color_mask(frame: &Frame, range: &HsvRange) -> GrayImage {
    map_colors(frame, |pixel| {
        if range.contains(rgb_to_hsv(pixel)) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
