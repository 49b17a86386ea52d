//! File-level entry points.
//!
//! Everything here follows the same shape: decode the input, do one thing,
//! write the output, map failures onto the
//! [`PipelineError`](crate::pipeline::PipelineError) taxonomy (whose
//! `status_code()` gives the foreign-boundary convention: 0 success, -1 file
//! I/O, -2 processing, -3 unknown). The full pipeline entry points take an
//! explicit backend so batch semantics can be tested against the recording
//! mock; the narrower single-purpose operations use the built-in backend,
//! like the single-call surface they mirror.
//!
//! Detection/model resources are acquired per call from
//! [`ResourcePaths::default`] unless a caller hands in its own — nothing is
//! cached between calls.

use crate::analysis::{self, QualityReport};
use crate::collage;
use crate::config::PipelineConfig;
use crate::imaging::{
    EncodeParams, ImageBackend, ImageInfo, OutputFormat, Quality, RustBackend,
};
use crate::pipeline::{self, PipelineError};
use crate::resources::{DetectionResources, ResourceHandle, ResourcePaths};
use crate::stages::enhance::{self, InpaintMethod};
use crate::stages::{artistic, color, faces, geometry, objects, segment};
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Outcome of a batch run: how many items succeeded out of how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub total: usize,
}

/// Process one image file through the full pipeline.
#[instrument(skip_all, fields(input = %input.as_ref().display(), output = %output.as_ref().display()))]
pub fn process_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let resources = DetectionResources::acquire(&ResourcePaths::default());
    process_file_with(&RustBackend::new(), &resources, input, output, config)
}

/// Process one image file using a specific backend and resource set.
pub fn process_file_with(
    backend: &impl ImageBackend,
    resources: &DetectionResources,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let image = backend.decode(input.as_ref())?;
    pipeline::run_to_file(backend, image, output.as_ref(), config, resources)
}

/// Process an ordered list of (input, output) pairs sequentially with one
/// shared configuration.
///
/// The configuration is shared by reference across all items, never cloned
/// or mutated between them. `progress(completed, total)` fires after every
/// item regardless of outcome; item failures never stop the run. Returns the
/// count of items that succeeded.
pub fn process_batch<P: AsRef<Path>>(
    pairs: &[(P, P)],
    config: &PipelineConfig,
    progress: impl FnMut(usize, usize),
) -> BatchReport {
    let resources = DetectionResources::acquire(&ResourcePaths::default());
    process_batch_with(&RustBackend::new(), &resources, pairs, config, progress)
}

/// Batch processing against a specific backend and resource set.
pub fn process_batch_with<P: AsRef<Path>>(
    backend: &impl ImageBackend,
    resources: &DetectionResources,
    pairs: &[(P, P)],
    config: &PipelineConfig,
    mut progress: impl FnMut(usize, usize),
) -> BatchReport {
    let total = pairs.len();
    let mut succeeded = 0;

    for (index, (input, output)) in pairs.iter().enumerate() {
        match process_file_with(backend, resources, input, output, config) {
            Ok(()) => succeeded += 1,
            Err(e) => {
                warn!(
                    input = %input.as_ref().display(),
                    error = %e,
                    code = e.status_code(),
                    "batch item failed"
                );
            }
        }
        progress(index + 1, total);
    }

    info!(succeeded, total, "batch finished");
    BatchReport { succeeded, total }
}

/// Read image properties: dimensions, channels, bit depth.
pub fn image_info(input: impl AsRef<Path>) -> Result<ImageInfo, PipelineError> {
    Ok(RustBackend::new().identify(input.as_ref())?)
}

/// Create a square thumbnail of side `size`.
///
/// `smart_crop` centers the crop on the dominant detected face, falling back
/// to a plain center crop when detection resources are unavailable or no
/// face is found. Output is JPEG at quality 85.
#[instrument(skip_all, fields(input = %input.as_ref().display(), size = size, smart_crop = smart_crop))]
pub fn create_thumbnail(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    size: u32,
    smart_crop: bool,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;
    let (width, height) = (image.width(), image.height());
    let crop = width.min(height);

    let focus = if smart_crop {
        let resources = DetectionResources::acquire(&ResourcePaths::default());
        faces::detect_faces(&image, &resources)
            .and_then(|regions| faces::dominant_face_center(&regions))
    } else {
        None
    };

    let (x, y) = faces::square_crop_origin((width, height), crop, focus);
    let thumbnail = image
        .crop_imm(x, y, crop, crop)
        .resize_exact(size, size, FilterType::Lanczos3);

    backend
        .encode(
            &thumbnail,
            output.as_ref(),
            &EncodeParams::Jpeg {
                quality: Quality::new(85),
                optimize: false,
            },
        )
        .map_err(|e| PipelineError::Encode(e.to_string()))
}

/// Convert an image to `format` with size/quality trade-off flags.
///
/// Quality is 95 when preserving, 75 when optimizing for size, 85 otherwise;
/// PNG compression is 9 when optimizing, else 6.
pub fn convert_format(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    format: &str,
    optimize_size: bool,
    preserve_quality: bool,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;

    let quality = if preserve_quality {
        95
    } else if optimize_size {
        75
    } else {
        85
    };
    let params = match OutputFormat::parse(format) {
        OutputFormat::Jpeg => EncodeParams::Jpeg {
            quality: Quality::new(quality),
            optimize: optimize_size,
        },
        OutputFormat::Png => EncodeParams::Png {
            compression_level: if optimize_size { 9 } else { 6 },
        },
        OutputFormat::WebP => EncodeParams::WebP {
            quality: Quality::new(quality),
        },
        OutputFormat::Tiff | OutputFormat::Bmp | OutputFormat::Other(_) => EncodeParams::Default,
    };

    backend
        .encode(&image, output.as_ref(), &params)
        .map_err(|e| PipelineError::Encode(e.to_string()))
}

/// Temperature/tint/exposure correction on a single file.
pub fn correct_colors(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    temperature: f32,
    tint: f32,
    exposure: f32,
) -> Result<(), PipelineError> {
    single_op(input, output, |image| {
        color::correct_colors(image, temperature, tint, exposure)
    })
}

/// Background removal on a single file; `mask` optionally seeds foreground.
pub fn remove_background(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mask: Option<&Path>,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;
    let mask_image = match mask {
        Some(path) => Some(backend.decode(path)?.to_luma8()),
        None => None,
    };
    let result = segment::remove_background(&image, mask_image.as_ref());
    encode_default(&backend, &result, output.as_ref())
}

/// HDR tone mapping on a single file.
pub fn apply_hdr(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    gamma: f32,
    saturation: f32,
    bias: f32,
) -> Result<(), PipelineError> {
    single_op(input, output, |image| {
        enhance::tone_map_hdr(image, gamma, saturation, bias)
    })
}

/// The artistic effects reachable through the single-purpose entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtisticEffect {
    OilPainting,
    PencilSketch,
    Cartoon,
    Vintage,
    Emboss,
}

/// One artistic effect on a single file. `intensity` is consumed by the
/// effects that take one; the rest apply at their fixed strength.
pub fn apply_artistic(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    effect: ArtisticEffect,
    intensity: f32,
) -> Result<(), PipelineError> {
    single_op(input, output, |image| match effect {
        ArtisticEffect::OilPainting => artistic::oil_painting(image),
        ArtisticEffect::PencilSketch => artistic::pencil_sketch(image),
        ArtisticEffect::Cartoon => artistic::cartoon(image),
        ArtisticEffect::Vintage => artistic::vintage(image, intensity),
        ArtisticEffect::Emboss => artistic::emboss(image),
    })
}

/// Model-backed upscale on a single file.
///
/// A missing or invalid model path does not fail the call: the interpolation
/// fallback still produces a correctly upscaled output.
pub fn upscale(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    model_path: &Path,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;

    let resources = DetectionResources {
        super_resolution_model: ResourceHandle::acquire(model_path),
        ..DetectionResources::unavailable()
    };
    let (upscaled, outcome) = enhance::super_resolve(&image, &resources);
    info!(?outcome, "upscale finished");
    encode_default(&backend, &upscaled, output.as_ref())
}

/// Face enhancement on a single file. Missing detection resources write the
/// input through unchanged, matching the stage-skip contract.
pub fn enhance_faces(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    smooth_skin: bool,
    remove_red_eye: bool,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;
    let resources = DetectionResources::acquire(&ResourcePaths::default());

    let result = match faces::detect_faces(&image, &resources) {
        Some(regions) if !regions.is_empty() => {
            faces::enhance_faces(&image, &regions, smooth_skin, remove_red_eye, &resources)
        }
        _ => image,
    };
    encode_default(&backend, &result, output.as_ref())
}

/// Perspective correction on a single file. `corners` are
/// `[top_left, top_right, bottom_right, bottom_left]`; `None` maps the
/// image's own bounds.
pub fn correct_perspective(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    corners: Option<[(f32, f32); 4]>,
) -> Result<(), PipelineError> {
    single_op(input, output, |image| {
        geometry::correct_perspective(image, corners)
    })
}

/// Lens distortion correction on a single file.
pub fn correct_lens(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    k1: f32,
    k2: f32,
    p1: f32,
    p2: f32,
) -> Result<(), PipelineError> {
    single_op(input, output, |image| {
        geometry::correct_lens(image, k1, k2, p1, p2)
    })
}

/// Count object proposals above `confidence_threshold` using the model at
/// `model_path`. An unusable model is a processing failure (count zero), not
/// a silent success.
pub fn detect_objects(
    input: impl AsRef<Path>,
    model_path: &Path,
    confidence_threshold: f32,
) -> Result<usize, PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;

    let resources = DetectionResources {
        object_model: ResourceHandle::acquire(model_path),
        ..DetectionResources::unavailable()
    };
    match objects::detect_objects(&image, &resources, confidence_threshold) {
        Some(proposals) => Ok(proposals.len()),
        None => Err(PipelineError::Stage {
            stage: "object_detection",
            reason: format!("model unavailable: {}", model_path.display()),
        }),
    }
}

/// Watermark removal: inpaint the masked region.
pub fn remove_watermark(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    mask: impl AsRef<Path>,
    method: InpaintMethod,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;
    let mask = backend.decode(mask.as_ref())?.to_luma8();
    let result = enhance::inpaint(&image, &mask, method);
    encode_default(&backend, &result, output.as_ref())
}

/// Quality metrics for a single file.
pub fn assess_quality(input: impl AsRef<Path>) -> Result<QualityReport, PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;
    Ok(analysis::analyze(&image))
}

/// Compose a collage from `inputs` and write it to `output`.
pub fn create_collage<P: AsRef<Path>>(
    inputs: &[P],
    output: impl AsRef<Path>,
    grid_w: u32,
    grid_h: u32,
    spacing: u32,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let canvas = collage::compose(&backend, inputs, grid_w, grid_h, spacing).map_err(|e| {
        PipelineError::Stage {
            stage: "collage",
            reason: e.to_string(),
        }
    })?;
    encode_default(&backend, &canvas, output.as_ref())
}

/// Decode, transform in memory, write with the extension-based encoder.
fn single_op(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    op: impl FnOnce(&DynamicImage) -> DynamicImage,
) -> Result<(), PipelineError> {
    let backend = RustBackend::new();
    let image = backend.decode(input.as_ref())?;
    let result = op(&image);
    encode_default(&backend, &result, output.as_ref())
}

fn encode_default(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    output: &Path,
) -> Result<(), PipelineError> {
    backend
        .encode(image, output, &EncodeParams::Default)
        .map_err(|e| PipelineError::Encode(e.to_string()))
}
