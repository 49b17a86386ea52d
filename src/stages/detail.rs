//! Detail stages: denoising, sharpening, local contrast, the named smoothing
//! filter, motion blur, the final uniform blur, and edge enhancement.
//!
//! The color bilateral filter is hand-rolled: the kernel weights combine
//! spatial distance and color distance, which none of the stock separable
//! filters express. It parallelizes over rows with rayon — this is the one
//! place the advisory thread hints actually buy anything.

use super::add_weighted;
use crate::config::FilterKind;
use crate::imaging::odd_kernel_size;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use rayon::prelude::*;

/// Sigma the collaborator derives from an odd kernel size when none is given.
fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Edge-preserving denoise with fixed strength.
pub fn denoise(image: &DynamicImage) -> DynamicImage {
    bilateral(image, 3, 30.0, 5.0)
}

/// Unsharp-mask sharpening: blur, subtract, add the difference back scaled.
pub fn sharpen(image: &DynamicImage) -> DynamicImage {
    image.unsharpen(2.0, 0)
}

/// Local-contrast boost: push the image away from a wide blur.
///
/// `out = image * (1 + amount) - blurred * amount`.
pub fn clarity(image: &DynamicImage, amount: f32) -> DynamicImage {
    let blurred = image.blur(5.0);
    add_weighted(image, &blurred, 1.0 + amount, -amount, 0.0)
}

/// Blend toward an edge-preserving smooth to emphasize mid-scale structure.
///
/// `out = image * (1 - amount) + smoothed * amount`.
pub fn structure(image: &DynamicImage, amount: f32) -> DynamicImage {
    let smoothed = bilateral(image, 4, 25.0, 25.0);
    add_weighted(image, &smoothed, 1.0 - amount, amount, 0.0)
}

/// The named smoothing filter. The kernel size is forced to the nearest odd
/// value ≥ 1 before use.
pub fn smoothing_filter(image: &DynamicImage, kind: FilterKind, strength: u32) -> DynamicImage {
    let kernel = odd_kernel_size(strength);
    match kind {
        FilterKind::Bilateral => bilateral(
            image,
            kernel / 2,
            (strength as f32 * 2.0).max(1.0),
            (strength as f32 / 2.0).max(0.5),
        ),
        FilterKind::Median => {
            let radius = kernel / 2;
            if radius == 0 {
                return image.clone();
            }
            DynamicImage::ImageRgba8(median_filter(&image.to_rgba8(), radius, radius))
        }
        FilterKind::Gaussian => image.blur(sigma_for_kernel(kernel)),
    }
}

/// Directional blur: each pixel becomes the mean of `distance` samples along
/// the `angle` direction, centered on the pixel.
pub fn motion_blur(image: &DynamicImage, angle: f32, distance: u32) -> DynamicImage {
    if distance < 2 {
        return image.clone();
    }
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let radians = angle.to_radians();
    let (dx, dy) = (radians.cos(), radians.sin());
    let half = (distance as f32 - 1.0) / 2.0;

    let output = RgbaImage::from_fn(width, height, |x, y| {
        let mut sums = [0.0f32; 3];
        for step in 0..distance {
            let t = step as f32 - half;
            let sx = (x as f32 + t * dx).round().clamp(0.0, (width - 1) as f32) as u32;
            let sy = (y as f32 + t * dy).round().clamp(0.0, (height - 1) as f32) as u32;
            let p = rgba.get_pixel(sx, sy);
            for c in 0..3 {
                sums[c] += p[c] as f32;
            }
        }
        let n = distance as f32;
        Rgba([
            (sums[0] / n).round() as u8,
            (sums[1] / n).round() as u8,
            (sums[2] / n).round() as u8,
            rgba.get_pixel(x, y)[3],
        ])
    });

    DynamicImage::ImageRgba8(output)
}

/// The final softening pass: Gaussian blur with a `2 * radius + 1` kernel.
pub fn uniform_blur(image: &DynamicImage, radius: u32) -> DynamicImage {
    if radius == 0 {
        return image.clone();
    }
    image.blur(sigma_for_kernel(2 * radius + 1))
}

/// Blend a fixed small weight of the Canny edge map back into the image.
pub fn edge_enhance(image: &DynamicImage) -> DynamicImage {
    let edges = canny(&image.to_luma8(), 50.0, 150.0);
    let edges_rgb = DynamicImage::ImageLuma8(edges).to_rgba8();
    add_weighted(image, &DynamicImage::ImageRgba8(edges_rgb), 0.8, 0.2, 0.0)
}

/// Edge-preserving smoothing: kernel weights combine spatial falloff and
/// color-distance falloff, so strong edges survive while flat regions smooth.
pub fn bilateral(
    image: &DynamicImage,
    radius: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> DynamicImage {
    if radius == 0 {
        return image.clone();
    }
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let r = radius as i64;

    let inv_space = -0.5 / (sigma_space * sigma_space);
    let inv_color = -0.5 / (sigma_color * sigma_color);

    // Spatial weights depend only on the offset; precompute the window.
    let window: Vec<(i64, i64, f32)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .map(|(dx, dy)| (dx, dy, ((dx * dx + dy * dy) as f32 * inv_space).exp()))
        .collect();

    let mut buffer = vec![0u8; (width * height * 4) as usize];
    buffer
        .par_chunks_mut((width * 4) as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..width as i64 {
                let center = rgba.get_pixel(x as u32, y as u32);
                let mut sums = [0.0f32; 3];
                let mut total_weight = 0.0f32;

                for &(dx, dy, spatial) in &window {
                    let sx = (x + dx).clamp(0, width as i64 - 1) as u32;
                    let sy = (y + dy).clamp(0, height as i64 - 1) as u32;
                    let sample = rgba.get_pixel(sx, sy);

                    let mut color_dist2 = 0.0f32;
                    for c in 0..3 {
                        let d = sample[c] as f32 - center[c] as f32;
                        color_dist2 += d * d;
                    }
                    let weight = spatial * (color_dist2 * inv_color).exp();

                    for c in 0..3 {
                        sums[c] += sample[c] as f32 * weight;
                    }
                    total_weight += weight;
                }

                let offset = (x * 4) as usize;
                for c in 0..3 {
                    row[offset + c] = (sums[c] / total_weight).round().clamp(0.0, 255.0) as u8;
                }
                row[offset + 3] = center[3];
            }
        });

    // from_raw only fails on a length mismatch, which the construction above
    // rules out.
    match RgbaImage::from_raw(width, height, buffer) {
        Some(img) => DynamicImage::ImageRgba8(img),
        None => image.clone(),
    }
}
