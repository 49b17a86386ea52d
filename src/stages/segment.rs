//! Background removal: border-seeded foreground segmentation.
//!
//! The seeding contract matches graph-cut-style tools: a supplied mask marks
//! definite foreground, or — with no mask — a band around the border is
//! definitely background and the interior is probably foreground. An
//! iterative two-class color-model refinement then reassigns the probable
//! pixels, and background ends up fully transparent in the RGBA output.

use image::{DynamicImage, GrayImage, RgbaImage};
use tracing::debug;

/// Width of the border band used as definite-background seed.
const BORDER: u32 = 10;
/// Refinement passes over the probable pixels.
const ITERATIONS: usize = 5;

#[derive(Clone, Copy, PartialEq, Eq)]
enum PixelClass {
    Background,
    Foreground,
    /// Reassignable on each refinement pass.
    ProbableForeground,
}

/// Remove the background, returning an RGBA image with background pixels at
/// alpha 0.
///
/// With `mask` supplied, pixels over 127 seed definite foreground and the
/// rest definite background. Without it, the border band seeds background and
/// the interior starts as probable foreground.
pub fn remove_background(image: &DynamicImage, mask: Option<&GrayImage>) -> DynamicImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width <= BORDER * 2 || height <= BORDER * 2 {
        // Too small to seed; keep everything opaque.
        debug!(width, height, "image too small for border seeding");
        return DynamicImage::ImageRgba8(image.to_rgba8());
    }

    let mut classes = vec![PixelClass::ProbableForeground; (width * height) as usize];
    match mask {
        Some(seed) => {
            for (x, y, pixel) in seed.enumerate_pixels() {
                if x >= width || y >= height {
                    continue;
                }
                let idx = (y * width + x) as usize;
                classes[idx] = if pixel[0] > 127 {
                    PixelClass::Foreground
                } else {
                    PixelClass::Background
                };
            }
        }
        None => {
            for y in 0..height {
                for x in 0..width {
                    if x < BORDER || y < BORDER || x >= width - BORDER || y >= height - BORDER {
                        classes[(y * width + x) as usize] = PixelClass::Background;
                    }
                }
            }
        }
    }

    // Iterative refinement: recompute class means, then reassign every
    // probable pixel to the nearer mean. Seeded pixels never move.
    for _ in 0..ITERATIONS {
        let (bg_mean, fg_mean) = class_means(&rgb, &classes, width);
        let mut changed = false;

        for (idx, class) in classes.iter_mut().enumerate() {
            if *class != PixelClass::ProbableForeground {
                continue;
            }
            let x = idx as u32 % width;
            let y = idx as u32 / width;
            let p = rgb.get_pixel(x, y).0;

            // Probable pixels nearer the background model become background;
            // the rest stay probable (and therefore foreground at the end).
            if distance2(p, bg_mean) < distance2(p, fg_mean) {
                *class = PixelClass::Background;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut output = RgbaImage::new(width, height);
    let rgba = image.to_rgba8();
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let mut p = *pixel;
        if classes[(y * width + x) as usize] == PixelClass::Background {
            p[3] = 0;
        }
        output.put_pixel(x, y, p);
    }
    DynamicImage::ImageRgba8(output)
}

/// Mean RGB of the background class and of everything else.
fn class_means(
    rgb: &image::RgbImage,
    classes: &[PixelClass],
    width: u32,
) -> ([f32; 3], [f32; 3]) {
    let mut bg_sum = [0f64; 3];
    let mut fg_sum = [0f64; 3];
    let mut bg_count = 0u64;
    let mut fg_count = 0u64;

    for (idx, class) in classes.iter().enumerate() {
        let x = idx as u32 % width;
        let y = idx as u32 / width;
        let p = rgb.get_pixel(x, y).0;
        match class {
            PixelClass::Background => {
                for c in 0..3 {
                    bg_sum[c] += p[c] as f64;
                }
                bg_count += 1;
            }
            _ => {
                for c in 0..3 {
                    fg_sum[c] += p[c] as f64;
                }
                fg_count += 1;
            }
        }
    }

    let bg = bg_sum.map(|s| (s / bg_count.max(1) as f64) as f32);
    let fg = fg_sum.map(|s| (s / fg_count.max(1) as f64) as f32);
    (bg, fg)
}

fn distance2(pixel: [u8; 3], mean: [f32; 3]) -> f32 {
    let mut sum = 0.0;
    for c in 0..3 {
        let d = pixel[c] as f32 - mean[c];
        sum += d * d;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    /// A bright subject centered on a dark background.
    fn subject_on_dark() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(60, 60, |x, y| {
            if (20..40).contains(&x) && (20..40).contains(&y) {
                Rgb([230, 220, 210])
            } else {
                Rgb([15, 18, 20])
            }
        }))
    }

    #[test]
    fn auto_seed_clears_background_keeps_subject() {
        let out = remove_background(&subject_on_dark(), None).to_rgba8();
        // Border pixel: transparent.
        assert_eq!(out.get_pixel(2, 2)[3], 0);
        // Subject center: opaque, colors intact.
        let center = out.get_pixel(30, 30);
        assert_eq!(center[3], 255);
        assert_eq!([center[0], center[1], center[2]], [230, 220, 210]);
    }

    #[test]
    fn auto_seed_extends_beyond_border_band() {
        // Background pixels inside the border band (but dark like the seed)
        // must also be classified background after refinement.
        let out = remove_background(&subject_on_dark(), None).to_rgba8();
        assert_eq!(out.get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn supplied_mask_wins_over_border_seeding() {
        // Mask marks the left half as foreground regardless of color.
        let img = subject_on_dark();
        let mask = GrayImage::from_fn(60, 60, |x, _| {
            if x < 30 { Luma([255u8]) } else { Luma([0u8]) }
        });
        let out = remove_background(&img, Some(&mask)).to_rgba8();
        assert_eq!(out.get_pixel(5, 5)[3], 255);
        assert_eq!(out.get_pixel(55, 55)[3], 0);
    }

    #[test]
    fn output_always_has_alpha_channel() {
        let out = remove_background(&subject_on_dark(), None);
        assert!(out.color().has_alpha());
    }

    #[test]
    fn tiny_image_stays_opaque() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 12, Rgb([100, 100, 100])));
        let out = remove_background(&img, None).to_rgba8();
        assert!(out.pixels().all(|p| p[3] == 255));
    }
}
