//! Artistic effects: stylizations that replace the working image wholesale.
//!
//! Every effect here is independently toggleable; when several are enabled
//! they compose in the canonical pipeline order and the last one to touch a
//! pixel wins.

use super::{add_weighted, clamp_u8, luminance, map_rgb, map_rgb_positional};
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use rayon::prelude::*;

/// Oil-painting stylization.
///
/// Classic intensity-bucket algorithm: each pixel takes the average color of
/// the most common intensity bucket within its neighborhood. Parallelized
/// over rows — the per-pixel histogram makes this the most expensive effect
/// in the crate.
pub fn oil_painting(image: &DynamicImage) -> DynamicImage {
    const RADIUS: i64 = 3;
    const LEVELS: usize = 20;

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut buffer = vec![0u8; (width * height * 4) as usize];
    buffer
        .par_chunks_mut((width * 4) as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..width as i64 {
                let mut counts = [0u32; LEVELS];
                let mut sums = [[0u64; 3]; LEVELS];

                for dy in -RADIUS..=RADIUS {
                    for dx in -RADIUS..=RADIUS {
                        let sx = (x + dx).clamp(0, width as i64 - 1) as u32;
                        let sy = (y + dy).clamp(0, height as i64 - 1) as u32;
                        let p = rgba.get_pixel(sx, sy);
                        let level = (luminance([p[0], p[1], p[2]]) as usize * LEVELS / 256)
                            .min(LEVELS - 1);
                        counts[level] += 1;
                        for c in 0..3 {
                            sums[level][c] += p[c] as u64;
                        }
                    }
                }

                let best = (0..LEVELS).max_by_key(|&l| counts[l]).unwrap_or(0);
                let n = counts[best].max(1) as u64;
                let offset = (x * 4) as usize;
                for c in 0..3 {
                    row[offset + c] = (sums[best][c] / n) as u8;
                }
                row[offset + 3] = rgba.get_pixel(x as u32, y as u32)[3];
            }
        });

    match RgbaImage::from_raw(width, height, buffer) {
        Some(img) => DynamicImage::ImageRgba8(img),
        None => image.clone(),
    }
}

/// Pencil sketch: color-dodge the grayscale against its inverted blur, then
/// blend a fraction of the original color back in.
pub fn pencil_sketch(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let inverted = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([255 - gray.get_pixel(x, y)[0]])
    });
    let blurred = imageproc::filter::gaussian_blur_f32(&inverted, 8.0);

    let sketch = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let g = gray.get_pixel(x, y)[0] as f32;
        let b = blurred.get_pixel(x, y)[0] as f32;
        // Color dodge: g / (1 - b/255), saturating at white.
        let dodged = if b >= 254.5 { 255.0 } else { (g * 255.0 / (255.0 - b)).min(255.0) };
        Luma([dodged as u8])
    });

    // Blend from the color image so the working representation (and any
    // alpha) carries through; the sketch dominates.
    let sketch_rgb = DynamicImage::ImageLuma8(sketch).to_rgba8();
    add_weighted(image, &DynamicImage::ImageRgba8(sketch_rgb), 0.4, 0.6, 0.0)
}

/// Cartoon: bilateral smoothing masked by adaptive-threshold edges, blended
/// with the original at a fixed intensity.
pub fn cartoon(image: &DynamicImage) -> DynamicImage {
    const INTENSITY: f32 = 0.8;

    let smoothed = super::detail::bilateral(image, 4, 40.0, 40.0);
    let edges = adaptive_threshold(&image.to_luma8(), 3, 7);

    // Black edge lines punched into the smoothed image.
    let outlined = map_rgb_positional(&smoothed, |x, y, p| {
        if edges.get_pixel(x, y)[0] == 0 { [0, 0, 0] } else { p }
    });

    add_weighted(image, &outlined, 1.0 - INTENSITY, INTENSITY, 0.0)
}

/// Directional emboss kernel blended with the original at a mid-gray offset.
pub fn emboss(image: &DynamicImage) -> DynamicImage {
    const INTENSITY: f32 = 0.7;
    #[rustfmt::skip]
    const KERNEL: [f32; 9] = [
        -2.0, -1.0, 0.0,
        -1.0,  1.0, 1.0,
         0.0,  1.0, 2.0,
    ];

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let filtered = RgbaImage::from_fn(width, height, |x, y| {
        let mut sums = [0.0f32; 3];
        for ky in 0..3i64 {
            for kx in 0..3i64 {
                let sx = (x as i64 + kx - 1).clamp(0, width as i64 - 1) as u32;
                let sy = (y as i64 + ky - 1).clamp(0, height as i64 - 1) as u32;
                let p = rgba.get_pixel(sx, sy);
                let k = KERNEL[(ky * 3 + kx) as usize];
                for c in 0..3 {
                    sums[c] += p[c] as f32 * k;
                }
            }
        }
        Rgba([
            clamp_u8(sums[0]),
            clamp_u8(sums[1]),
            clamp_u8(sums[2]),
            rgba.get_pixel(x, y)[3],
        ])
    });

    add_weighted(
        image,
        &DynamicImage::ImageRgba8(filtered),
        1.0 - INTENSITY,
        INTENSITY,
        128.0 * INTENSITY,
    )
}

/// Vintage: sepia matrix plus a synthetic vignette at the given intensity.
pub fn vintage(image: &DynamicImage, intensity: f32) -> DynamicImage {
    vignette(&sepia(image), intensity)
}

/// The classic sepia color matrix.
pub fn sepia(image: &DynamicImage) -> DynamicImage {
    map_rgb(image, |[r, g, b]| {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        [
            clamp_u8(0.393 * r + 0.769 * g + 0.189 * b),
            clamp_u8(0.349 * r + 0.686 * g + 0.168 * b),
            clamp_u8(0.272 * r + 0.534 * g + 0.131 * b),
        ]
    })
}

/// Desaturate to grayscale, staying in the 3-channel representation.
pub fn black_white(image: &DynamicImage) -> DynamicImage {
    map_rgb(image, |p| {
        let gray = luminance(p).round() as u8;
        [gray, gray, gray]
    })
}

/// Quantize each channel to `levels` uniform steps (floored at 2).
///
/// Integer arithmetic on purpose: `(value / step) * step` with
/// `step = 256 / levels` — the exact level boundaries are part of this
/// stage's contract.
pub fn posterize(image: &DynamicImage, levels: u32) -> DynamicImage {
    let levels = levels.max(2);
    let step = (256 / levels).max(1) as u16;
    super::map_channels(image, |c| ((c as u16 / step) * step).min(255) as u8)
}

/// Darken each pixel by a factor linear in its normalized distance from the
/// image center, scaled by `strength`.
pub fn vignette(image: &DynamicImage, strength: f32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    map_rgb_positional(image, |x, y, p| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let dist = (dx * dx + dy * dy).sqrt();
        let factor = (1.0 - (dist / max_dist) * strength).max(0.0);
        [
            clamp_u8(p[0] as f32 * factor),
            clamp_u8(p[1] as f32 * factor),
            clamp_u8(p[2] as f32 * factor),
        ]
    })
}

/// Local-mean adaptive threshold via an integral image.
///
/// A pixel is white when it is not darker than the mean of its
/// `(2 * block_radius + 1)²` neighborhood minus `c`. Used for the cartoon
/// effect's edge lines.
fn adaptive_threshold(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = integral_image(gray);
    let stride = (width + 1) as usize;

    GrayImage::from_fn(width, height, |x, y| {
        let x1 = x.saturating_sub(block_radius) as usize;
        let y1 = y.saturating_sub(block_radius) as usize;
        let x2 = ((x + block_radius + 1) as usize).min(width as usize);
        let y2 = ((y + block_radius + 1) as usize).min(height as usize);

        let area = ((x2 - x1) * (y2 - y1)) as i64;
        let sum = integral[y2 * stride + x2] as i64 - integral[y1 * stride + x2] as i64
            - integral[y2 * stride + x1] as i64
            + integral[y1 * stride + x1] as i64;
        let mean = sum / area.max(1);

        let threshold = (mean - c as i64).clamp(0, 255);
        if (gray.get_pixel(x, y)[0] as i64) < threshold {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Summed-area table with a zero-padded border row and column.
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (width, height) = gray.dimensions();
    let stride = (width + 1) as usize;
    let mut table = vec![0u64; stride * (height + 1) as usize];

    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += gray.get_pixel(x, y)[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[y as usize * stride + (x + 1) as usize];
        }
    }
    table
}
