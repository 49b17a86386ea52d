//! Face-dependent enhancement: region detection, skin smoothing, red-eye
//! removal.
//!
//! Detection is gated on the face-model resource: when the handle is
//! unavailable the stage reports no regions and the pipeline continues with
//! the image unchanged. The detector itself is a skin-tone connected-region
//! heuristic — it finds candidate face rectangles from contiguous skin-colored
//! areas of plausible size and aspect.

use super::{blend_u8, is_skin_tone, rgb_to_hsv};
use crate::resources::DetectionResources;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::HashMap;
use tracing::debug;

/// A detected axis-aligned face region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Minimum side length for a candidate region, matching the detector's
/// conventional floor.
const MIN_FACE_SIDE: u32 = 30;
/// At most this many regions are returned, largest first.
const MAX_FACES: usize = 16;

/// Detect candidate face regions.
///
/// Returns `None` when the face model resource is unavailable (the caller
/// skips the stage); `Some(vec![])` when detection ran and found nothing.
pub fn detect_faces(image: &DynamicImage, resources: &DetectionResources) -> Option<Vec<FaceRegion>> {
    resources.face_model.as_ref()?;

    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    // Binary skin mask.
    let mask = GrayImage::from_fn(width, height, |x, y| {
        if is_skin_tone(rgb.get_pixel(x, y).0) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    let labels = connected_components(&mask, Connectivity::Eight, Luma([0u8]));

    // Bounding box per component label.
    let mut boxes: HashMap<u32, (u32, u32, u32, u32)> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label[0];
        if id == 0 {
            continue;
        }
        let entry = boxes.entry(id).or_insert((x, y, x, y));
        entry.0 = entry.0.min(x);
        entry.1 = entry.1.min(y);
        entry.2 = entry.2.max(x);
        entry.3 = entry.3.max(y);
    }

    let mut regions: Vec<FaceRegion> = boxes
        .into_values()
        .map(|(min_x, min_y, max_x, max_y)| FaceRegion {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
        .filter(|region| {
            if region.width < MIN_FACE_SIDE || region.height < MIN_FACE_SIDE {
                return false;
            }
            // Faces are roughly as wide as they are tall.
            let aspect = region.width as f32 / region.height as f32;
            (0.4..=2.5).contains(&aspect)
        })
        .collect();

    regions.sort_by_key(|r| std::cmp::Reverse(r.area()));
    regions.truncate(MAX_FACES);
    debug!(count = regions.len(), "face regions detected");
    Some(regions)
}

/// Apply the requested enhancements inside every detected region.
///
/// Skin smoothing is a color-gated bilateral blend: only skin-toned pixels
/// inside the region move toward the smoothed copy. Red-eye removal darkens
/// red-dominant pixels inside eye sub-regions; it additionally requires the
/// eye model resource and silently does nothing without it.
pub fn enhance_faces(
    image: &DynamicImage,
    regions: &[FaceRegion],
    smooth_skin: bool,
    remove_red_eye: bool,
    resources: &DetectionResources,
) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    for region in regions {
        let x_end = (region.x + region.width).min(width);
        let y_end = (region.y + region.height).min(height);

        if smooth_skin {
            let face = image.crop_imm(region.x, region.y, region.width, region.height);
            let smoothed = super::detail::bilateral(&face, 5, 40.0, 40.0).to_rgba8();

            for y in region.y..y_end {
                for x in region.x..x_end {
                    let p = rgba.get_pixel(x, y);
                    if !is_skin_tone([p[0], p[1], p[2]]) {
                        continue;
                    }
                    let s = smoothed.get_pixel(x - region.x, y - region.y);
                    let out = image::Rgba([
                        blend_u8(p[0], s[0], 0.8),
                        blend_u8(p[1], s[1], 0.8),
                        blend_u8(p[2], s[2], 0.8),
                        p[3],
                    ]);
                    rgba.put_pixel(x, y, out);
                }
            }
        }

        if remove_red_eye && resources.eye_model.is_some() {
            for eye in eye_regions(region) {
                let ex_end = (eye.x + eye.width).min(width);
                let ey_end = (eye.y + eye.height).min(height);
                for y in eye.y..ey_end {
                    for x in eye.x..ex_end {
                        let p = rgba.get_pixel(x, y);
                        if !is_red_dominant([p[0], p[1], p[2]]) {
                            continue;
                        }
                        let out = image::Rgba([p[0] / 2, p[1] / 2, p[2] / 2, p[3]]);
                        rgba.put_pixel(x, y, out);
                    }
                }
            }
        }
    }

    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(rgba)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

/// The two eye sub-regions: left and right thirds of the upper half of the
/// face rectangle.
fn eye_regions(face: &FaceRegion) -> [FaceRegion; 2] {
    let eye_height = face.height / 3;
    let eye_width = face.width / 3;
    let eye_y = face.y + face.height / 5;
    [
        FaceRegion {
            x: face.x + face.width / 8,
            y: eye_y,
            width: eye_width,
            height: eye_height,
        },
        FaceRegion {
            x: face.x + face.width - face.width / 8 - eye_width,
            y: eye_y,
            width: eye_width,
            height: eye_height,
        },
    ]
}

/// Red-eye gate: low hue, saturated, bright enough to be a glint.
fn is_red_dominant(rgb: [u8; 3]) -> bool {
    let (h, s, v) = rgb_to_hsv(rgb);
    (h <= 20.0 || h >= 340.0) && s >= 50.0 / 255.0 && v >= 50.0 / 255.0
}

/// Crop origin for a face-centered square, clamped to the image bounds.
///
/// Falls back to a center crop when `focus` is `None`. `crop` is the side of
/// the square (the shorter image dimension).
pub fn square_crop_origin(
    dims: (u32, u32),
    crop: u32,
    focus: Option<(u32, u32)>,
) -> (u32, u32) {
    let (width, height) = dims;
    match focus {
        Some((fx, fy)) => (
            fx.saturating_sub(crop / 2).min(width.saturating_sub(crop)),
            fy.saturating_sub(crop / 2).min(height.saturating_sub(crop)),
        ),
        None => ((width - crop) / 2, (height - crop) / 2),
    }
}

/// Center of the largest region, if any.
pub fn dominant_face_center(regions: &[FaceRegion]) -> Option<(u32, u32)> {
    regions
        .iter()
        .max_by_key(|r| r.area())
        .map(FaceRegion::center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{DetectionResources, ResourceHandle};
    use image::{Rgb, RgbImage};

    fn resources_with_models(dir: &std::path::Path, eye: bool) -> DetectionResources {
        let face_path = dir.join("face.bin");
        std::fs::write(&face_path, b"weights").unwrap();
        let eye_model = if eye {
            let eye_path = dir.join("eye.bin");
            std::fs::write(&eye_path, b"weights").unwrap();
            ResourceHandle::acquire(&eye_path)
        } else {
            None
        };
        DetectionResources {
            face_model: ResourceHandle::acquire(&face_path),
            eye_model,
            ..DetectionResources::unavailable()
        }
    }

    /// A skin-toned square on a blue background.
    fn portrait() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(120, 120, |x, y| {
            if (30..90).contains(&x) && (25..95).contains(&y) {
                Rgb([205, 160, 125])
            } else {
                Rgb([40, 70, 180])
            }
        }))
    }

    #[test]
    fn detection_without_model_returns_none() {
        let result = detect_faces(&portrait(), &DetectionResources::unavailable());
        assert!(result.is_none());
    }

    #[test]
    fn detection_finds_the_skin_region() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_models(tmp.path(), false);

        let regions = detect_faces(&portrait(), &resources).unwrap();
        assert_eq!(regions.len(), 1);
        let face = regions[0];
        assert_eq!((face.x, face.y), (30, 25));
        assert_eq!((face.width, face.height), (60, 70));
    }

    #[test]
    fn detection_ignores_tiny_regions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_models(tmp.path(), false);

        // 10x10 skin patch: below the minimum side.
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(60, 60, |x, y| {
            if (20..30).contains(&x) && (20..30).contains(&y) {
                Rgb([205, 160, 125])
            } else {
                Rgb([40, 70, 180])
            }
        }));
        let regions = detect_faces(&img, &resources).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn skin_smoothing_leaves_background_alone() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_models(tmp.path(), false);
        let img = portrait();
        let regions = detect_faces(&img, &resources).unwrap();

        let out = enhance_faces(&img, &regions, true, false, &resources).to_rgb8();
        // Background pixel untouched.
        assert_eq!(out.get_pixel(5, 5).0, [40, 70, 180]);
    }

    #[test]
    fn red_eye_requires_eye_model() {
        let tmp = tempfile::TempDir::new().unwrap();
        let without_eye = resources_with_models(tmp.path(), false);

        // A red dot where an eye would be.
        let mut img = portrait().to_rgb8();
        img.put_pixel(42, 42, Rgb([220, 40, 40]));
        let img = DynamicImage::ImageRgb8(img);

        let regions = detect_faces(&img, &without_eye).unwrap();
        let out = enhance_faces(&img, &regions, false, true, &without_eye).to_rgb8();
        assert_eq!(out.get_pixel(42, 42).0, [220, 40, 40]);
    }

    #[test]
    fn red_eye_darkens_red_pixels_in_eye_region() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_models(tmp.path(), true);

        let mut img = portrait().to_rgb8();
        // Face region is (30, 25) 60x70; eyes sit in the upper portion.
        img.put_pixel(42, 42, Rgb([220, 40, 40]));
        let img = DynamicImage::ImageRgb8(img);

        let regions = detect_faces(&img, &resources).unwrap();
        let out = enhance_faces(&img, &regions, false, true, &resources).to_rgb8();
        assert_eq!(out.get_pixel(42, 42).0, [110, 20, 20]);
    }

    #[test]
    fn square_crop_centers_without_focus() {
        assert_eq!(square_crop_origin((400, 300), 300, None), (50, 0));
    }

    #[test]
    fn square_crop_clamps_focus_to_bounds() {
        // Focus near the right edge cannot push the crop out of the image.
        assert_eq!(square_crop_origin((400, 300), 300, Some((390, 150))), (100, 0));
        // Focus near the origin clamps to zero.
        assert_eq!(square_crop_origin((400, 300), 300, Some((5, 5))), (0, 0));
    }

    #[test]
    fn dominant_face_is_largest() {
        let regions = [
            FaceRegion { x: 0, y: 0, width: 40, height: 40 },
            FaceRegion { x: 100, y: 100, width: 80, height: 80 },
        ];
        assert_eq!(dominant_face_center(&regions), Some((140, 140)));
    }
}
