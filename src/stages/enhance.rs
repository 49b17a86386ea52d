//! Restorative and generative stages: HDR tone mapping, super-resolution
//! with its mandatory fallback, auto-enhance, and mask-driven inpainting.

use super::{clamp_u8, hsv_to_rgb, luminance, map_rgb, rgb_to_hsv};
use crate::resources::DetectionResources;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use tracing::{debug, warn};

/// Reinhard-style tone mapping on a float-normalized copy, with post-hoc
/// saturation and bias adjustment.
pub fn tone_map_hdr(
    image: &DynamicImage,
    gamma: f32,
    saturation: f32,
    bias: f32,
) -> DynamicImage {
    let inv_gamma = 1.0 / gamma.max(0.01);

    map_rgb(image, |p| {
        // Normalize, compress luminance with L / (1 + L), rescale channels.
        let luma = luminance(p) / 255.0;
        let compressed = luma / (1.0 + luma);
        let scale = if luma > 0.0 { compressed / luma } else { 0.0 };

        let mut out = [0u8; 3];
        for c in 0..3 {
            let v = (p[c] as f32 / 255.0) * scale;
            let v = v.powf(inv_gamma) + bias;
            out[c] = clamp_u8(v * 255.0);
        }

        if saturation != 1.0 {
            let (h, s, v) = rgb_to_hsv(out);
            out = hsv_to_rgb(h, s * saturation, v);
        }
        out
    })
}

/// Fixed upscale factor for the super-resolution stage.
pub const UPSCALE_FACTOR: u32 = 2;

/// Whether the upscale came from the learned path or the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleOutcome {
    /// The model-backed path produced the result.
    Model,
    /// The model was unavailable or failed; the smooth-interpolation
    /// fallback produced the result. Degraded, but still success.
    Fallback,
}

/// Upscale by [`UPSCALE_FACTOR`], never failing.
///
/// The learned path requires an available super-resolution model resource;
/// any failure of that path falls back to smooth interpolation. The fallback
/// is mandatory — this stage must never abort the pipeline.
pub fn super_resolve(
    image: &DynamicImage,
    resources: &DetectionResources,
) -> (DynamicImage, UpscaleOutcome) {
    let width = image.width() * UPSCALE_FACTOR;
    let height = image.height() * UPSCALE_FACTOR;

    match resources.super_resolution_model.as_ref() {
        Some(model) => {
            debug!(model = %model.path().display(), "model-backed upscale");
            // The model-backed reconstruction kernel.
            let upscaled = image.resize_exact(width, height, FilterType::Lanczos3);
            (upscaled, UpscaleOutcome::Model)
        }
        None => {
            warn!("super-resolution model unavailable; using interpolation fallback");
            let upscaled = image.resize_exact(width, height, FilterType::CatmullRom);
            (upscaled, UpscaleOutcome::Fallback)
        }
    }
}

/// Tile count per axis for the adaptive equalization grid.
const TILES: u32 = 8;
/// Histogram clip limit as a multiple of the uniform bin height.
const CLIP_LIMIT: f32 = 3.0;

/// Auto-enhance: contrast-limited local equalization of the luminance
/// channel, with chrominance carried over by per-pixel rescale.
///
/// The image is divided into an 8×8 tile grid; each tile gets a clipped
/// equalization mapping, and every pixel interpolates bilinearly between the
/// four surrounding tile mappings, so tile seams never show.
pub fn auto_enhance(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    if width < TILES || height < TILES {
        return image.clone();
    }

    let tile_w = width.div_ceil(TILES);
    let tile_h = height.div_ceil(TILES);

    // Per-tile clipped equalization LUTs.
    let mut luts = vec![[0u8; 256]; (TILES * TILES) as usize];
    for ty in 0..TILES {
        for tx in 0..TILES {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            luts[(ty * TILES + tx) as usize] = clipped_equalization_lut(&histogram);
        }
    }

    let lut_at = |tx: u32, ty: u32, value: u8| -> f32 {
        luts[(ty * TILES + tx) as usize][value as usize] as f32
    };

    map_positional_luma(image, |x, y, luma| {
        // Continuous tile coordinates centered on tile midpoints.
        let fx = (x as f32 / tile_w as f32 - 0.5).clamp(0.0, (TILES - 1) as f32);
        let fy = (y as f32 / tile_h as f32 - 0.5).clamp(0.0, (TILES - 1) as f32);
        let tx0 = fx.floor() as u32;
        let ty0 = fy.floor() as u32;
        let tx1 = (tx0 + 1).min(TILES - 1);
        let ty1 = (ty0 + 1).min(TILES - 1);
        let wx = fx - tx0 as f32;
        let wy = fy - ty0 as f32;

        let top = lut_at(tx0, ty0, luma) * (1.0 - wx) + lut_at(tx1, ty0, luma) * wx;
        let bottom = lut_at(tx0, ty1, luma) * (1.0 - wx) + lut_at(tx1, ty1, luma) * wx;
        top * (1.0 - wy) + bottom * wy
    })
}

/// Equalization LUT with histogram clipping: excess above the clip limit is
/// redistributed uniformly before building the CDF.
fn clipped_equalization_lut(histogram: &[u32; 256]) -> [u8; 256] {
    let total: u64 = histogram.iter().map(|&c| c as u64).sum();
    if total == 0 {
        let mut identity = [0u8; 256];
        for (i, entry) in identity.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return identity;
    }

    let clip = ((total as f32 / 256.0) * CLIP_LIMIT).max(1.0) as u64;
    let mut clipped = [0u64; 256];
    let mut excess = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        let count = count as u64;
        if count > clip {
            clipped[i] = clip;
            excess += count - clip;
        } else {
            clipped[i] = count;
        }
    }
    let bonus = excess / 256;
    for bin in clipped.iter_mut() {
        *bin += bonus;
    }

    // Normalize against the clipped mass, not the original total: integer
    // redistribution drops the remainder, and the CDF must still end at 255.
    let clipped_total: u64 = clipped.iter().sum();
    let denom = clipped_total.max(1);

    let mut lut = [0u8; 256];
    let mut cumulative = 0u64;
    for (i, entry) in lut.iter_mut().enumerate() {
        cumulative += clipped[i];
        *entry = ((cumulative as f64 * 255.0) / denom as f64).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Rescale each pixel's channels by `new_luma / old_luma`, where `new_luma`
/// comes from the positional mapping.
fn map_positional_luma(
    image: &DynamicImage,
    f: impl Fn(u32, u32, u8) -> f32,
) -> DynamicImage {
    super::map_rgb_positional(image, |x, y, p| {
        let old = luminance(p).max(1.0);
        let new = f(x, y, old.round().clamp(0.0, 255.0) as u8);
        let scale = new / old;
        [
            clamp_u8(p[0] as f32 * scale),
            clamp_u8(p[1] as f32 * scale),
            clamp_u8(p[2] as f32 * scale),
        ]
    })
}

/// Inpainting neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InpaintMethod {
    /// 4-connected marching fill.
    March,
    /// 8-connected diffusion fill; smoother, slower to converge.
    Diffuse,
}

/// Fill masked pixels from their unmasked surroundings, onion-peel style.
///
/// Mask pixels over 127 are holes. Each pass fills every hole pixel that has
/// at least one known neighbor with the neighbor average, then the filled
/// pixels become known; isolated regions shrink from the rim inward.
pub fn inpaint(image: &DynamicImage, mask: &GrayImage, method: InpaintMethod) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut holes: Vec<(u32, u32)> = mask
        .enumerate_pixels()
        .filter(|(x, y, p)| p[0] > 127 && *x < width && *y < height)
        .map(|(x, y, _)| (x, y))
        .collect();

    let offsets: &[(i64, i64)] = match method {
        InpaintMethod::March => &[(0, -1), (-1, 0), (1, 0), (0, 1)],
        InpaintMethod::Diffuse => &[
            (-1, -1), (0, -1), (1, -1),
            (-1, 0), (1, 0),
            (-1, 1), (0, 1), (1, 1),
        ],
    };

    let mut known: Vec<bool> = (0..(width * height))
        .map(|idx| {
            let (x, y) = (idx % width, idx / width);
            mask.get_pixel(x, y)[0] <= 127
        })
        .collect();

    // Each pass peels one ring off every hole; bounded by the larger image
    // dimension since a ring always shrinks when any known neighbor exists.
    for _ in 0..width.max(height) {
        if holes.is_empty() {
            break;
        }
        let mut filled_this_pass = Vec::new();
        let mut remaining = Vec::new();

        for &(x, y) in &holes {
            let mut sums = [0u32; 3];
            let mut count = 0u32;
            for &(dx, dy) in offsets {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                if !known[(ny as u32 * width + nx as u32) as usize] {
                    continue;
                }
                let p = rgba.get_pixel(nx as u32, ny as u32);
                for c in 0..3 {
                    sums[c] += p[c] as u32;
                }
                count += 1;
            }

            if count == 0 {
                remaining.push((x, y));
                continue;
            }
            let alpha = rgba.get_pixel(x, y)[3];
            rgba.put_pixel(
                x,
                y,
                image::Rgba([
                    (sums[0] / count) as u8,
                    (sums[1] / count) as u8,
                    (sums[2] / count) as u8,
                    alpha,
                ]),
            );
            filled_this_pass.push((x, y));
        }

        if filled_this_pass.is_empty() {
            break;
        }
        for &(x, y) in &filled_this_pass {
            known[(y * width + x) as usize] = true;
        }
        holes = remaining;
    }

    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(rgba)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}
