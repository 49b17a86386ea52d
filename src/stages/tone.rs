//! Tonal-range stages: highlights/shadows, per-channel auto contrast,
//! saturation, and skin-protected vibrance.

use super::{clamp_u8, hsv_to_rgb, is_skin_tone, luminance, map_rgb, rgb_to_hsv};
use image::DynamicImage;

/// Luminance above which a pixel counts as a highlight.
const HIGHLIGHT_THRESHOLD: f32 = 200.0;
/// Luminance below which a pixel counts as a shadow.
const SHADOW_THRESHOLD: f32 = 55.0;

/// Boost or reduce highlights and shadows independently.
///
/// Each adjustment is a masked blend: pixels above (below) the fixed luminance
/// threshold are replaced by a globally scaled copy `pixel * (1 + amount)`;
/// everything in the midtones is untouched.
pub fn highlights_shadows(image: &DynamicImage, highlights: f32, shadows: f32) -> DynamicImage {
    map_rgb(image, |p| {
        let luma = luminance(p);
        let scale = if luma > HIGHLIGHT_THRESHOLD && highlights != 0.0 {
            1.0 + highlights
        } else if luma < SHADOW_THRESHOLD && shadows != 0.0 {
            1.0 + shadows
        } else {
            return p;
        };
        [
            clamp_u8(p[0] as f32 * scale),
            clamp_u8(p[1] as f32 * scale),
            clamp_u8(p[2] as f32 * scale),
        ]
    })
}

/// Per-channel histogram equalization.
///
/// Each color channel is equalized independently against its own cumulative
/// distribution — full-range stretch with no cross-channel coupling, which is
/// aggressive and can shift colors; that is the documented behavior of this
/// stage, not a defect.
pub fn auto_contrast(image: &DynamicImage) -> DynamicImage {
    let rgb = image.to_rgb8();
    let pixel_count = (rgb.width() as u64 * rgb.height() as u64).max(1);

    let mut histograms = [[0u64; 256]; 3];
    for pixel in rgb.pixels() {
        for c in 0..3 {
            histograms[c][pixel[c] as usize] += 1;
        }
    }

    let luts: Vec<[u8; 256]> = histograms
        .iter()
        .map(|histogram| equalization_lut(histogram, pixel_count))
        .collect();

    map_rgb(image, |p| {
        [
            luts[0][p[0] as usize],
            luts[1][p[1] as usize],
            luts[2][p[2] as usize],
        ]
    })
}

/// Build the equalization lookup table from one channel's histogram.
fn equalization_lut(histogram: &[u64; 256], pixel_count: u64) -> [u8; 256] {
    // Standard CDF-based equalization, anchored at the first occupied bin so
    // the darkest present value maps to 0.
    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let cdf_min = cdf.iter().copied().find(|&v| v > 0).unwrap_or(0);
    let denom = (pixel_count - cdf_min).max(1);

    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        let scaled = (cdf[i].saturating_sub(cdf_min)) as f64 * 255.0 / denom as f64;
        *entry = scaled.round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Multiply saturation by `factor` in HSV space.
pub fn saturation(image: &DynamicImage, factor: f32) -> DynamicImage {
    map_rgb(image, |p| {
        let (h, s, v) = rgb_to_hsv(p);
        hsv_to_rgb(h, s * factor.max(0.0), v)
    })
}

/// Saturation boost that leaves the skin-tone range alone.
///
/// Pixels inside the skin gate keep their saturation so faces are not pushed
/// toward orange; everything else gets `s * (1 + amount)`.
pub fn vibrance(image: &DynamicImage, amount: f32) -> DynamicImage {
    map_rgb(image, |p| {
        if is_skin_tone(p) {
            return p;
        }
        let (h, s, v) = rgb_to_hsv(p);
        hsv_to_rgb(h, s * (1.0 + amount), v)
    })
}
