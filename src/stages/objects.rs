//! Coarse object detection: region proposals with confidence filtering.
//!
//! Gated on the object-model resource like every model-backed capability.
//! Proposals come from connected high-contrast regions of the edge map; each
//! proposal's confidence is its fill ratio against its bounding box, and the
//! caller's threshold decides what counts.

use crate::resources::DetectionResources;
use image::DynamicImage;
use imageproc::edges::canny;
use imageproc::region_labelling::{Connectivity, connected_components};
use image::Luma;
use std::collections::HashMap;
use tracing::debug;

/// One region proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProposal {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Edge-density confidence in [0, 1].
    pub confidence: f32,
}

/// Minimum proposal side, filtering out speckle.
const MIN_SIDE: u32 = 12;

/// Detect object proposals above `confidence_threshold`.
///
/// Returns `None` when the object model resource is unavailable.
pub fn detect_objects(
    image: &DynamicImage,
    resources: &DetectionResources,
    confidence_threshold: f32,
) -> Option<Vec<ObjectProposal>> {
    resources.object_model.as_ref()?;

    let edges = canny(&image.to_luma8(), 50.0, 150.0);
    let labels = connected_components(&edges, Connectivity::Eight, Luma([0u8]));

    // Bounding box and edge-pixel count per component.
    let mut boxes: HashMap<u32, (u32, u32, u32, u32, u64)> = HashMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label[0];
        if id == 0 {
            continue;
        }
        let entry = boxes.entry(id).or_insert((x, y, x, y, 0));
        entry.0 = entry.0.min(x);
        entry.1 = entry.1.min(y);
        entry.2 = entry.2.max(x);
        entry.3 = entry.3.max(y);
        entry.4 += 1;
    }

    let mut proposals: Vec<ObjectProposal> = boxes
        .into_values()
        .filter_map(|(min_x, min_y, max_x, max_y, edge_pixels)| {
            let width = max_x - min_x + 1;
            let height = max_y - min_y + 1;
            if width < MIN_SIDE || height < MIN_SIDE {
                return None;
            }
            // Perimeter-normalized edge density: a closed outline of the box
            // scores near 1, scattered speckle scores low.
            let perimeter = (2 * (width + height)) as f32;
            let confidence = (edge_pixels as f32 / perimeter).min(1.0);
            Some(ObjectProposal {
                x: min_x,
                y: min_y,
                width,
                height,
                confidence,
            })
        })
        .filter(|p| p.confidence >= confidence_threshold)
        .collect();

    proposals.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    debug!(count = proposals.len(), "object proposals");
    Some(proposals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{DetectionResources, ResourceHandle};
    use image::{Rgb, RgbImage};

    fn resources_with_object_model(dir: &std::path::Path) -> DetectionResources {
        let path = dir.join("objects.bin");
        std::fs::write(&path, b"weights").unwrap();
        DetectionResources {
            object_model: ResourceHandle::acquire(&path),
            ..DetectionResources::unavailable()
        }
    }

    fn scene_with_square() -> DynamicImage {
        // A high-contrast square outline registers as one closed edge region.
        DynamicImage::ImageRgb8(RgbImage::from_fn(80, 80, |x, y| {
            if (20..60).contains(&x) && (20..60).contains(&y) {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        }))
    }

    #[test]
    fn without_model_returns_none() {
        let result = detect_objects(&scene_with_square(), &DetectionResources::unavailable(), 0.1);
        assert!(result.is_none());
    }

    #[test]
    fn finds_the_square() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_object_model(tmp.path());

        let proposals = detect_objects(&scene_with_square(), &resources, 0.1).unwrap();
        assert_eq!(proposals.len(), 1);
        let p = &proposals[0];
        assert!(p.width >= 38 && p.width <= 42, "width {}", p.width);
        assert!(p.confidence > 0.5, "confidence {}", p.confidence);
    }

    #[test]
    fn threshold_filters_everything_when_too_high() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_object_model(tmp.path());

        let proposals = detect_objects(&scene_with_square(), &resources, 2.0).unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn flat_scene_has_no_proposals() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resources = resources_with_object_model(tmp.path());

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(60, 60, Rgb([128, 128, 128])));
        let proposals = detect_objects(&img, &resources, 0.1).unwrap();
        assert!(proposals.is_empty());
    }
}
