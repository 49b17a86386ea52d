//! Effect stage implementations.
//!
//! Each submodule owns one family of pixel transformations. Stage functions
//! are pure: they take an image (plus parameters) and return a new image,
//! never touching the filesystem. The canonical application order lives in
//! [`pipeline`](crate::pipeline), not here — these functions do not know or
//! care when they run.
//!
//! | Module | Stages |
//! |--------|--------|
//! | [`geometry`] | rotation, flips, lens correction, perspective correction |
//! | [`color`] | white balance, temperature/tint/exposure, hue, gamma, brightness/contrast |
//! | [`tone`] | highlights/shadows, auto contrast, saturation, vibrance |
//! | [`detail`] | denoise, sharpen, clarity, structure, named filter, motion blur, blur, edges |
//! | [`artistic`] | oil painting, sketch, cartoon, emboss, vintage, sepia, grayscale, posterize, vignette |
//! | [`faces`] | face/eye regions, skin smoothing, red-eye |
//! | [`segment`] | background removal |
//! | [`enhance`] | HDR tone mapping, super-resolution, auto-enhance, inpainting |
//! | [`objects`] | region-proposal object counting |

pub mod artistic;
pub mod color;
pub mod detail;
pub mod enhance;
pub mod faces;
pub mod geometry;
pub mod objects;
pub mod segment;
pub mod tone;

use image::DynamicImage;

/// Apply a per-RGB-triple mapping, preserving any alpha channel.
///
/// Images without alpha stay 3-channel; images with alpha keep their alpha
/// values untouched. This is the workhorse for every pointwise color stage.
pub(crate) fn map_rgb(image: &DynamicImage, f: impl Fn([u8; 3]) -> [u8; 3]) -> DynamicImage {
    if image.color().has_alpha() {
        let mut rgba = image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            let [r, g, b] = f([pixel[0], pixel[1], pixel[2]]);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = image.to_rgb8();
        for pixel in rgb.pixels_mut() {
            pixel.0 = f(pixel.0);
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

/// Apply a per-channel (LUT-style) mapping to the color channels, preserving
/// alpha.
pub(crate) fn map_channels(image: &DynamicImage, f: impl Fn(u8) -> u8) -> DynamicImage {
    map_rgb(image, |[r, g, b]| [f(r), f(g), f(b)])
}

/// Apply a mapping that also sees the pixel position, preserving alpha.
pub(crate) fn map_rgb_positional(
    image: &DynamicImage,
    f: impl Fn(u32, u32, [u8; 3]) -> [u8; 3],
) -> DynamicImage {
    if image.color().has_alpha() {
        let mut rgba = image.to_rgba8();
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let [r, g, b] = f(x, y, [pixel[0], pixel[1], pixel[2]]);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }
        DynamicImage::ImageRgba8(rgba)
    } else {
        let mut rgb = image.to_rgb8();
        for (x, y, pixel) in rgb.enumerate_pixels_mut() {
            pixel.0 = f(x, y, pixel.0);
        }
        DynamicImage::ImageRgb8(rgb)
    }
}

/// Rec. 601 luma of an RGB triple, in 0–255.
pub(crate) fn luminance(rgb: [u8; 3]) -> f32 {
    0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32
}

/// Clamp a float channel value back into u8 range.
pub(crate) fn clamp_u8(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Linear blend of two channel values: `a` at `t = 0`, `b` at `t = 1`.
pub(crate) fn blend_u8(a: u8, b: u8, t: f32) -> u8 {
    clamp_u8(a as f32 * (1.0 - t) + b as f32 * t)
}

/// RGB (0–255 each) to HSV with hue in degrees [0, 360), saturation and value
/// in [0, 1].
pub(crate) fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (hue, saturation, max)
}

/// Inverse of [`rgb_to_hsv`].
pub(crate) fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let h = hue.rem_euclid(360.0);
    let s = saturation.clamp(0.0, 1.0);
    let v = value.clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        clamp_u8((r + m) * 255.0),
        clamp_u8((g + m) * 255.0),
        clamp_u8((b + m) * 255.0),
    ]
}

/// Channelwise weighted sum of two equally-sized images:
/// `out = a * alpha + b * beta + gamma`. The alpha channel (when present)
/// carries over from `a`.
pub(crate) fn add_weighted(
    a: &DynamicImage,
    b: &DynamicImage,
    alpha: f32,
    beta: f32,
    gamma: f32,
) -> DynamicImage {
    let b_rgba = b.to_rgba8();
    map_rgb_positional(a, |x, y, p| {
        let q = b_rgba.get_pixel(x, y);
        [
            clamp_u8(p[0] as f32 * alpha + q[0] as f32 * beta + gamma),
            clamp_u8(p[1] as f32 * alpha + q[1] as f32 * beta + gamma),
            clamp_u8(p[2] as f32 * alpha + q[2] as f32 * beta + gamma),
        ]
    })
}

/// The skin-tone gate shared by vibrance protection, skin smoothing, and the
/// face-region heuristic: hue within the warm band, with enough saturation
/// and brightness to be skin rather than shadow or highlight.
pub(crate) fn is_skin_tone(rgb: [u8; 3]) -> bool {
    let (h, s, v) = rgb_to_hsv(rgb);
    h <= 40.0 && s >= 20.0 / 255.0 && v >= 70.0 / 255.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn hsv_roundtrip_on_primaries() {
        for rgb in [
            [255u8, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [255, 255, 0],
            [0, 0, 0],
            [255, 255, 255],
            [128, 64, 32],
        ] {
            let (h, s, v) = rgb_to_hsv(rgb);
            let back = hsv_to_rgb(h, s, v);
            for c in 0..3 {
                assert!(
                    (back[c] as i32 - rgb[c] as i32).abs() <= 1,
                    "{rgb:?} -> ({h}, {s}, {v}) -> {back:?}"
                );
            }
        }
    }

    #[test]
    fn pure_red_has_hue_zero() {
        let (h, s, v) = rgb_to_hsv([255, 0, 0]);
        assert_eq!(h, 0.0);
        assert_eq!(s, 1.0);
        assert_eq!(v, 1.0);
    }

    #[test]
    fn skin_gate_accepts_skin_rejects_sky() {
        // A warm mid-tone typical of skin.
        assert!(is_skin_tone([200, 150, 120]));
        // Saturated blue is never skin.
        assert!(!is_skin_tone([40, 80, 220]));
        // Near-black is below the value floor.
        assert!(!is_skin_tone([10, 8, 5]));
    }

    #[test]
    fn map_rgb_preserves_alpha() {
        let rgba = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 77]));
        let out = map_rgb(&DynamicImage::ImageRgba8(rgba), |[r, g, b]| {
            [r + 1, g + 1, b + 1]
        });
        let out = out.to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [11, 21, 31, 77]);
    }

    #[test]
    fn map_rgb_keeps_three_channels_for_rgb() {
        let rgb = RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let out = map_rgb(&DynamicImage::ImageRgb8(rgb), |p| p);
        assert!(!out.color().has_alpha());
    }

    #[test]
    fn luminance_of_gray_is_itself() {
        assert!((luminance([100, 100, 100]) - 100.0).abs() < 0.01);
    }
}
