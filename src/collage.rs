//! Grid collage composition.
//!
//! Loads up to `grid_w * grid_h` images and places them row-major on a black
//! canvas. Two explicit policies, both documented rather than implicit:
//!
//! - The **first loaded image's dimensions are canonical** for every cell;
//!   spacing is added around that size.
//! - A later image whose own dimensions would overflow the canvas is
//!   **skipped silently** — a defensive bound check, not uniform-size
//!   handling.
//!
//! Images that fail to load are dropped without raising; the collage fails
//! only when nothing loads at all.

use crate::imaging::{CollageGrid, ImageBackend, collage_cell_origin, collage_grid};
use image::{DynamicImage, RgbImage, imageops};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Error, Debug)]
pub enum CollageError {
    #[error("no input image could be loaded")]
    NothingLoaded,
    #[error("grid dimensions must be nonzero")]
    EmptyGrid,
}

/// Compose a collage canvas from `inputs`.
///
/// At most `grid_w * grid_h` inputs are considered; unloadable inputs are
/// dropped. See the [module docs](self) for the cell-size and overflow
/// policies.
#[instrument(skip_all, fields(count = inputs.len(), grid_w = grid_w, grid_h = grid_h, spacing = spacing))]
pub fn compose(
    backend: &impl ImageBackend,
    inputs: &[impl AsRef<Path>],
    grid_w: u32,
    grid_h: u32,
    spacing: u32,
) -> Result<DynamicImage, CollageError> {
    if grid_w == 0 || grid_h == 0 {
        return Err(CollageError::EmptyGrid);
    }

    let capacity = (grid_w * grid_h) as usize;
    let mut images: Vec<DynamicImage> = Vec::new();
    for input in inputs.iter().take(capacity) {
        match backend.decode(input.as_ref()) {
            Ok(img) => images.push(img),
            Err(e) => warn!(path = %input.as_ref().display(), error = %e, "dropping unloadable input"),
        }
    }

    if images.is_empty() {
        return Err(CollageError::NothingLoaded);
    }

    let grid = collage_grid(
        (images[0].width(), images[0].height()),
        (grid_w, grid_h),
        spacing,
    );
    let mut canvas = RgbImage::new(grid.canvas_width, grid.canvas_height);

    for (index, img) in images.iter().enumerate() {
        let (x, y) = collage_cell_origin(grid_w, index as u32, &grid);
        if !fits(&grid, x, y, img) {
            warn!(index, "placement exceeds canvas bounds; skipping");
            continue;
        }
        imageops::replace(&mut canvas, &img.to_rgb8(), x as i64, y as i64);
        debug!(index, x, y, "placed");
    }

    Ok(DynamicImage::ImageRgb8(canvas))
}

fn fits(grid: &CollageGrid, x: u32, y: u32, image: &DynamicImage) -> bool {
    x + image.width() <= grid.canvas_width && y + image.height() <= grid.canvas_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockBackend;
    use image::Rgb;
    use std::path::PathBuf;

    #[test]
    fn canvas_size_follows_first_image_and_spacing() {
        // Mock decode yields 16x16 images.
        let backend = MockBackend::new();
        let inputs: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("/in/{i}.jpg"))).collect();

        let canvas = compose(&backend, &inputs, 2, 2, 10).unwrap();
        assert_eq!(canvas.width(), 2 * (16 + 10) - 10);
        assert_eq!(canvas.height(), 2 * (16 + 10) - 10);
    }

    #[test]
    fn unfilled_cells_stay_background() {
        let backend = MockBackend::new();
        let inputs: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("/in/{i}.jpg"))).collect();

        let canvas = compose(&backend, &inputs, 2, 2, 10).unwrap().to_rgb8();
        // Fourth cell origin is (26, 26); its interior is untouched black.
        assert_eq!(canvas.get_pixel(30, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn unloadable_inputs_are_dropped_not_fatal() {
        let backend = MockBackend::failing_decode(&["/in/1.jpg"]);
        let inputs: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("/in/{i}.jpg"))).collect();

        // Two loadable images remain; composition succeeds.
        let canvas = compose(&backend, &inputs, 2, 2, 0).unwrap();
        assert_eq!(canvas.width(), 32);
    }

    #[test]
    fn nothing_loaded_is_an_error() {
        let backend = MockBackend::failing_decode(&["/in/0.jpg"]);
        let inputs = [PathBuf::from("/in/0.jpg")];
        assert!(matches!(
            compose(&backend, &inputs, 2, 2, 4),
            Err(CollageError::NothingLoaded)
        ));
    }

    #[test]
    fn extra_inputs_beyond_grid_are_ignored() {
        let backend = MockBackend::new();
        let inputs: Vec<PathBuf> = (0..9).map(|i| PathBuf::from(format!("/in/{i}.jpg"))).collect();

        compose(&backend, &inputs, 2, 2, 0).unwrap();
        // Only the first 4 decode calls happen.
        assert_eq!(backend.get_operations().len(), 4);
    }

    #[test]
    fn zero_grid_is_an_error() {
        let backend = MockBackend::new();
        let inputs = [PathBuf::from("/in/0.jpg")];
        assert!(matches!(
            compose(&backend, &inputs, 0, 2, 4),
            Err(CollageError::EmptyGrid)
        ));
    }

    #[test]
    fn oversized_later_image_is_skipped_silently() {
        // Real backend with real files: first image small, second too large
        // for its cell, so its placement is skipped but the canvas survives.
        let tmp = tempfile::TempDir::new().unwrap();
        let small = tmp.path().join("small.png");
        let large = tmp.path().join("large.png");
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(20, 20, Rgb([200, 0, 0])))
            .save(&small)
            .unwrap();
        image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(200, 200, Rgb([0, 200, 0])))
            .save(&large)
            .unwrap();

        let backend = RustBackend::new();
        let canvas = compose(&backend, &[small, large], 2, 1, 5)
            .unwrap()
            .to_rgb8();
        // Canvas sized from the first image: 2*(20+5)-5 = 45 wide, 20 tall.
        assert_eq!((canvas.width(), canvas.height()), (45, 20));
        // First image placed.
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([200, 0, 0]));
        // Second cell remains background because the large image cannot fit.
        assert_eq!(canvas.get_pixel(30, 10), &Rgb([0, 0, 0]));
    }
}
