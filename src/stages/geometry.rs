//! Geometric transformations: rotation, flips, lens and perspective
//! correction.
//!
//! All of these run before any color work so later stages see settled
//! geometry. Rotation and the two corrections keep the original canvas size —
//! content that rotates or warps out of frame is clipped, not expanded.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, rotate_about_center, warp_into};
use tracing::{debug, warn};

/// Rotate around the image center by `degrees`, keeping the canvas size.
///
/// Exact 0/180 multiples take lossless fast paths; everything else goes
/// through a bilinear affine warp. 90/270 deliberately do not fast-path:
/// they would change the canvas dimensions, and this stage holds them fixed.
pub fn rotate(image: &DynamicImage, degrees: f32) -> DynamicImage {
    let normalized = degrees.rem_euclid(360.0);
    if normalized.abs() < 0.01 || (normalized - 360.0).abs() < 0.01 {
        return image.clone();
    }
    if (normalized - 180.0).abs() < 0.01 {
        return image.rotate180();
    }

    let rgba = image.to_rgba8();
    let rotated: RgbaImage = rotate_about_center(
        &rgba,
        degrees.to_radians(),
        Interpolation::Bilinear,
        Rgba([0u8, 0, 0, 255]),
    );
    debug!(degrees, "arbitrary-angle rotation applied");
    DynamicImage::ImageRgba8(rotated)
}

/// Mirror left-right.
pub fn flip_horizontal(image: &DynamicImage) -> DynamicImage {
    image.fliph()
}

/// Mirror top-bottom.
pub fn flip_vertical(image: &DynamicImage) -> DynamicImage {
    image.flipv()
}

/// Correct radial/tangential lens distortion.
///
/// Uses the standard Brown–Conrady model with the image's own dimensions as
/// focal lengths and its center as the principal point. Each output pixel
/// samples the input at its distorted position with bilinear interpolation.
pub fn correct_lens(image: &DynamicImage, k1: f32, k2: f32, p1: f32, p2: f32) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let fx = width as f32;
    let fy = height as f32;
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    let mut output = RgbaImage::new(width, height);
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let xn = (x as f32 - cx) / fx;
        let yn = (y as f32 - cy) / fy;
        let r2 = xn * xn + yn * yn;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2;

        let xd = xn * radial + 2.0 * p1 * xn * yn + p2 * (r2 + 2.0 * xn * xn);
        let yd = yn * radial + p1 * (r2 + 2.0 * yn * yn) + 2.0 * p2 * xn * yn;

        let src_x = xd * fx + cx;
        let src_y = yd * fy + cy;
        *pixel = sample_bilinear(&rgba, src_x, src_y);
    }

    DynamicImage::ImageRgba8(output)
}

/// Warp a quadrilateral to an axis-aligned rectangle sized to the image's own
/// bounds.
///
/// `corners` are `[top_left, top_right, bottom_right, bottom_left]` source
/// points; `None` uses the image's own corners (the auto-correction default,
/// which is an identity mapping — callers that want a real correction supply
/// detected corners). Degenerate corner sets leave the image unchanged.
pub fn correct_perspective(
    image: &DynamicImage,
    corners: Option<[(f32, f32); 4]>,
) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let (w, h) = (width as f32, height as f32);

    let src = corners.unwrap_or([(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)]);
    let dst = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let projection = match Projection::from_control_points(src, dst) {
        Some(p) => p,
        None => {
            warn!("degenerate perspective corners; returning unchanged");
            return image.clone();
        }
    };

    let mut output = RgbaImage::new(width, height);
    warp_into(
        &rgba,
        &projection,
        Interpolation::Bilinear,
        Rgba([0u8, 0, 0, 255]),
        &mut output,
    );
    DynamicImage::ImageRgba8(output)
}

/// Bilinear sample with edge clamping.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let (width, height) = image.dimensions();
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;

    let xc = x.clamp(0.0, max_x);
    let yc = y.clamp(0.0, max_y);

    let x0 = xc.floor() as u32;
    let y0 = yc.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let tx = xc - x0 as f32;
    let ty = yc - y0 as f32;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 3 % 256) as u8, (y * 3 % 256) as u8, 0])
        }))
    }

    #[test]
    fn rotate_zero_is_identity() {
        let img = gradient(20, 10);
        let out = rotate(&img, 0.0);
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn rotate_keeps_canvas_size() {
        let img = gradient(40, 20);
        for degrees in [17.0, 90.0, 180.0, 271.5] {
            let out = rotate(&img, degrees);
            assert_eq!((out.width(), out.height()), (40, 20), "at {degrees}");
        }
    }

    #[test]
    fn rotate_180_twice_is_identity() {
        let img = gradient(16, 12);
        let out = rotate(&rotate(&img, 180.0), 180.0);
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn flips_are_involutions() {
        let img = gradient(15, 9);
        assert_eq!(
            flip_horizontal(&flip_horizontal(&img)).to_rgb8(),
            img.to_rgb8()
        );
        assert_eq!(flip_vertical(&flip_vertical(&img)).to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn flip_horizontal_mirrors_pixels() {
        let img = gradient(10, 4);
        let flipped = flip_horizontal(&img).to_rgb8();
        let original = img.to_rgb8();
        assert_eq!(flipped.get_pixel(0, 0), original.get_pixel(9, 0));
    }

    #[test]
    fn lens_correction_with_zero_coefficients_is_identity() {
        let img = gradient(24, 18);
        let out = correct_lens(&img, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn lens_correction_keeps_dimensions() {
        let img = gradient(30, 20);
        let out = correct_lens(&img, 0.1, 0.01, 0.001, 0.001);
        assert_eq!((out.width(), out.height()), (30, 20));
    }

    #[test]
    fn perspective_auto_corners_is_identity_mapping() {
        let img = gradient(20, 20);
        let out = correct_perspective(&img, None);
        assert_eq!((out.width(), out.height()), (20, 20));
        // The identity projection must not move the center pixel.
        assert_eq!(
            out.to_rgb8().get_pixel(10, 10),
            img.to_rgb8().get_pixel(10, 10)
        );
    }

    #[test]
    fn perspective_degenerate_corners_returns_unchanged() {
        let img = gradient(20, 20);
        // All four corners collapsed to one point: no projection exists.
        let out = correct_perspective(&img, Some([(5.0, 5.0); 4]));
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }
}
