//! Image quality analysis: four independent scalar metrics.
//!
//! Pure and non-mutating; every call computes fresh from the pixels, nothing
//! is cached. All four metrics work on the grayscale projection of the image.

use image::DynamicImage;
use imageproc::filter::gaussian_blur_f32;

/// The four quality metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityReport {
    /// Variance of the Laplacian edge response; higher is sharper.
    pub sharpness: f64,
    /// Standard deviation of the high-frequency residual after low-pass
    /// filtering; higher is noisier.
    pub noise: f64,
    /// Mean gray intensity, normalized to [0, 1].
    pub brightness: f64,
    /// Standard deviation of gray intensity, normalized to [0, 1].
    pub contrast: f64,
}

/// Analyze an image.
pub fn analyze(image: &DynamicImage) -> QualityReport {
    let gray = image.to_luma8();
    let (width, height) = gray.dimensions();
    let count = (width as u64 * height as u64).max(1) as f64;

    // Sharpness: variance of the 4-neighbor Laplacian.
    let mut laplacian = Vec::with_capacity(count as usize);
    for y in 0..height {
        for x in 0..width {
            let at = |dx: i64, dy: i64| -> f64 {
                let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                gray.get_pixel(sx, sy)[0] as f64
            };
            laplacian.push(at(-1, 0) + at(1, 0) + at(0, -1) + at(0, 1) - 4.0 * at(0, 0));
        }
    }
    let sharpness = variance(&laplacian);

    // Noise: std-dev of (gray - low-pass gray).
    let smoothed = gaussian_blur_f32(&gray, 1.1);
    let residual: Vec<f64> = gray
        .pixels()
        .zip(smoothed.pixels())
        .map(|(a, b)| a[0] as f64 - b[0] as f64)
        .collect();
    let noise = variance(&residual).sqrt();

    // Brightness and contrast from the raw gray values.
    let values: Vec<f64> = gray.pixels().map(|p| p[0] as f64).collect();
    let mean = values.iter().sum::<f64>() / count;
    let brightness = mean / 255.0;
    let contrast = variance(&values).sqrt() / 255.0;

    QualityReport {
        sharpness,
        noise,
        brightness,
        contrast,
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
