//! Global color stages: white balance, temperature/tint/exposure, hue
//! rotation, gamma remap, linear brightness/contrast.

use super::{clamp_u8, hsv_to_rgb, map_channels, map_rgb, rgb_to_hsv};
use image::DynamicImage;

/// Gray-world automatic white balance.
///
/// Scales each channel so its mean matches the global gray mean. Neutral
/// scenes stay put; color casts are pulled toward gray.
pub fn auto_white_balance(image: &DynamicImage) -> DynamicImage {
    let rgb = image.to_rgb8();
    let pixel_count = (rgb.width() as u64 * rgb.height() as u64).max(1);

    let mut sums = [0u64; 3];
    for pixel in rgb.pixels() {
        for c in 0..3 {
            sums[c] += pixel[c] as u64;
        }
    }
    let means = sums.map(|s| s as f32 / pixel_count as f32);
    let gray = (means[0] + means[1] + means[2]) / 3.0;

    let gains = means.map(|m| if m > 0.0 { gray / m } else { 1.0 });

    map_rgb(image, |p| {
        [
            clamp_u8(p[0] as f32 * gains[0]),
            clamp_u8(p[1] as f32 * gains[1]),
            clamp_u8(p[2] as f32 * gains[2]),
        ]
    })
}

/// Temperature (blue–orange), tint (green–magenta), and exposure (stops)
/// correction.
///
/// Temperature shifts red against blue by 10% per unit; tint attenuates green
/// by 10% per unit; exposure multiplies everything by `2^stops`.
pub fn correct_colors(
    image: &DynamicImage,
    temperature: f32,
    tint: f32,
    exposure: f32,
) -> DynamicImage {
    let red_gain = 1.0 + temperature * 0.1;
    let blue_gain = 1.0 - temperature * 0.1;
    let green_gain = 1.0 - tint * 0.1;
    let exposure_gain = if exposure != 0.0 { 2f32.powf(exposure) } else { 1.0 };

    map_rgb(image, |p| {
        [
            clamp_u8(p[0] as f32 * red_gain * exposure_gain),
            clamp_u8(p[1] as f32 * green_gain * exposure_gain),
            clamp_u8(p[2] as f32 * blue_gain * exposure_gain),
        ]
    })
}

/// Rotate hue by `degrees`, wrapping around the color wheel.
pub fn hue_rotate(image: &DynamicImage, degrees: f32) -> DynamicImage {
    map_rgb(image, |p| {
        let (h, s, v) = rgb_to_hsv(p);
        hsv_to_rgb(h + degrees, s, v)
    })
}

/// Build the 256-entry gamma lookup table for `out = in^(1/gamma)`.
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let inv = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = clamp_u8(((i as f32 / 255.0).powf(inv) * 255.0).round());
    }
    lut
}

/// Remap channels through the gamma lookup table.
pub fn gamma_map(image: &DynamicImage, gamma: f32) -> DynamicImage {
    let lut = gamma_lut(gamma);
    map_channels(image, |c| lut[c as usize])
}

/// Linear brightness/contrast: `out = in * contrast + brightness`.
pub fn brightness_contrast(image: &DynamicImage, brightness: f32, contrast: f32) -> DynamicImage {
    map_channels(image, |c| clamp_u8(c as f32 * contrast + brightness))
}
