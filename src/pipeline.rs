//! The pipeline orchestrator.
//!
//! [`plan`] turns a flat [`PipelineConfig`] into the list of enabled
//! [`Stage`] descriptors in the one canonical order, and [`run`] applies
//! them. The order is the central design decision of this crate and is
//! preserved exactly:
//!
//! 1. Geometry (rotation, flips, lens, perspective) — later stages see
//!    settled geometry.
//! 2. Global color, then tonal range, then saturation work — artistic
//!    effects receive normalized color.
//! 3. Detail work (denoise, sharpen, clarity, structure, named filter,
//!    motion blur).
//! 4. Artistic replacements, vignette.
//! 5. Face-dependent enhancement, background removal, HDR,
//!    super-resolution, auto-enhance, edge enhancement.
//! 6. Uniform blur last among effects, so nothing sharpens after softening.
//! 7. Resize, last of all — expensive effects operate on full-resolution
//!    pixels, and the geometry resolver decides the final dimensions.
//!
//! Stage failure policy: model-gated stages skip (image unchanged) when
//! their resource is unavailable; super-resolution always succeeds, by
//! fallback if it must; everything else is deterministic pixel math whose
//! errors are fatal for the item.

use crate::config::{FilterKind, PipelineConfig};
use crate::imaging::{
    BackendError, EncodeParams, ImageBackend, OutputFormat, resolve_output_dimensions,
};
use crate::resources::DetectionResources;
use crate::stages::{artistic, color, detail, enhance, faces, geometry, segment, tone};
use image::DynamicImage;
use image::imageops::FilterType;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Failure taxonomy for one pipeline item.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not decode input: {0}")]
    Decode(String),
    #[error("processing failed in {stage}: {reason}")]
    Stage { stage: &'static str, reason: String },
    #[error("could not encode output: {0}")]
    Encode(String),
    #[error("unknown failure: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// The foreign-boundary status code convention: 0 is success, input and
    /// output file failures are -1, in-library processing failures are -2,
    /// anything unclassifiable is -3.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Decode(_) | Self::Encode(_) => -1,
            Self::Stage { .. } => -2,
            Self::Unknown(_) => -3,
        }
    }
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => Self::Decode(msg),
            BackendError::Encode(msg) => Self::Encode(msg),
            BackendError::Io(e) => Self::Decode(e.to_string()),
        }
    }
}

/// How one stage concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Applied,
    /// The stage ran its fallback path; degraded success is still success.
    Degraded(String),
    /// A recoverable failure: the image is unchanged and processing went on.
    Skipped(String),
}

/// One enabled stage with its typed parameters.
///
/// The flat config record stays the user-facing surface; this enum is the
/// pipeline's own view of it, which makes combinations enumerable and the
/// ordering testable.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Rotate { degrees: f32 },
    FlipHorizontal,
    FlipVertical,
    LensCorrection { k1: f32, k2: f32, p1: f32, p2: f32 },
    PerspectiveCorrection,
    AutoWhiteBalance,
    ColorCorrection { temperature: f32, tint: f32, exposure: f32 },
    HueShift { degrees: f32 },
    GammaRemap { gamma: f32 },
    BrightnessContrast { brightness: f32, contrast: f32 },
    HighlightsShadows { highlights: f32, shadows: f32 },
    AutoContrast,
    Saturation { factor: f32 },
    Vibrance { amount: f32 },
    NoiseReduction,
    Sharpen,
    Clarity { amount: f32 },
    Structure { amount: f32 },
    Smoothing { kind: FilterKind, strength: u32 },
    MotionBlur { angle: f32, distance: u32 },
    OilPainting,
    PencilSketch,
    Cartoon,
    Emboss,
    Vintage { intensity: f32 },
    Sepia,
    BlackWhite,
    Posterize { levels: u32 },
    Vignette { strength: f32 },
    FaceEnhance { smooth_skin: bool, remove_red_eye: bool },
    RemoveBackground,
    HdrToneMap { gamma: f32, saturation: f32 },
    SuperResolution,
    AutoEnhance,
    EdgeEnhance,
    Blur { radius: u32 },
}

impl Stage {
    /// Short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "rotate",
            Self::FlipHorizontal => "flip_horizontal",
            Self::FlipVertical => "flip_vertical",
            Self::LensCorrection { .. } => "lens_correction",
            Self::PerspectiveCorrection => "perspective_correction",
            Self::AutoWhiteBalance => "auto_white_balance",
            Self::ColorCorrection { .. } => "color_correction",
            Self::HueShift { .. } => "hue_shift",
            Self::GammaRemap { .. } => "gamma_remap",
            Self::BrightnessContrast { .. } => "brightness_contrast",
            Self::HighlightsShadows { .. } => "highlights_shadows",
            Self::AutoContrast => "auto_contrast",
            Self::Saturation { .. } => "saturation",
            Self::Vibrance { .. } => "vibrance",
            Self::NoiseReduction => "noise_reduction",
            Self::Sharpen => "sharpen",
            Self::Clarity { .. } => "clarity",
            Self::Structure { .. } => "structure",
            Self::Smoothing { .. } => "smoothing_filter",
            Self::MotionBlur { .. } => "motion_blur",
            Self::OilPainting => "oil_painting",
            Self::PencilSketch => "pencil_sketch",
            Self::Cartoon => "cartoon",
            Self::Emboss => "emboss",
            Self::Vintage { .. } => "vintage",
            Self::Sepia => "sepia",
            Self::BlackWhite => "black_white",
            Self::Posterize { .. } => "posterize",
            Self::Vignette { .. } => "vignette",
            Self::FaceEnhance { .. } => "face_enhance",
            Self::RemoveBackground => "remove_background",
            Self::HdrToneMap { .. } => "hdr_tone_map",
            Self::SuperResolution => "super_resolution",
            Self::AutoEnhance => "auto_enhance",
            Self::EdgeEnhance => "edge_enhance",
            Self::Blur { .. } => "blur",
        }
    }
}

/// Fixed lens-model coefficients used when the correction toggle is set
/// without explicit coefficients.
const DEFAULT_LENS_COEFFICIENTS: (f32, f32, f32, f32) = (0.1, 0.01, 0.001, 0.001);

/// Derive the enabled stage descriptors from a config, in canonical order.
pub fn plan(config: &PipelineConfig) -> Vec<Stage> {
    let mut stages = Vec::new();

    if config.rotation_angle != 0 {
        stages.push(Stage::Rotate {
            degrees: config.rotation_angle as f32,
        });
    }
    if config.flip_horizontal {
        stages.push(Stage::FlipHorizontal);
    }
    if config.flip_vertical {
        stages.push(Stage::FlipVertical);
    }
    if config.lens_correction {
        let (k1, k2, p1, p2) = DEFAULT_LENS_COEFFICIENTS;
        stages.push(Stage::LensCorrection { k1, k2, p1, p2 });
    }
    if config.perspective_correction {
        stages.push(Stage::PerspectiveCorrection);
    }
    if config.auto_white_balance {
        stages.push(Stage::AutoWhiteBalance);
    }
    if config.color_correction {
        stages.push(Stage::ColorCorrection {
            temperature: config.temperature,
            tint: config.tint,
            exposure: config.exposure_compensation,
        });
    }
    if config.hue_shift != 0.0 {
        stages.push(Stage::HueShift {
            degrees: config.hue_shift,
        });
    }
    if config.gamma_correction != 1.0 {
        stages.push(Stage::GammaRemap {
            gamma: config.gamma_correction,
        });
    }
    if config.brightness_adjustment != 0.0 || config.contrast_adjustment != 1.0 {
        stages.push(Stage::BrightnessContrast {
            brightness: config.brightness_adjustment,
            contrast: config.contrast_adjustment,
        });
    }
    if config.highlights != 0.0 || config.shadows != 0.0 {
        stages.push(Stage::HighlightsShadows {
            highlights: config.highlights,
            shadows: config.shadows,
        });
    }
    if config.auto_contrast {
        stages.push(Stage::AutoContrast);
    }
    if config.saturation_adjustment != 1.0 {
        stages.push(Stage::Saturation {
            factor: config.saturation_adjustment,
        });
    }
    if config.vibrance != 0.0 {
        stages.push(Stage::Vibrance {
            amount: config.vibrance,
        });
    }
    if config.noise_reduction {
        stages.push(Stage::NoiseReduction);
    }
    if config.sharpen {
        stages.push(Stage::Sharpen);
    }
    if config.clarity != 0.0 {
        stages.push(Stage::Clarity {
            amount: config.clarity,
        });
    }
    if config.structure != 0.0 {
        stages.push(Stage::Structure {
            amount: config.structure,
        });
    }
    if let Some(kind) = config.filter_type {
        stages.push(Stage::Smoothing {
            kind,
            strength: config.filter_strength,
        });
    }
    if config.motion_blur {
        stages.push(Stage::MotionBlur {
            angle: config.motion_angle,
            distance: config.motion_distance,
        });
    }
    if config.oil_painting {
        stages.push(Stage::OilPainting);
    }
    if config.pencil_sketch {
        stages.push(Stage::PencilSketch);
    }
    if config.cartoon_effect {
        stages.push(Stage::Cartoon);
    }
    if config.emboss_effect {
        stages.push(Stage::Emboss);
    }
    if config.vintage_effect {
        stages.push(Stage::Vintage {
            intensity: config.vintage_intensity,
        });
    }
    if config.sepia_effect {
        stages.push(Stage::Sepia);
    }
    if config.black_white {
        stages.push(Stage::BlackWhite);
    }
    if config.posterize_effect {
        stages.push(Stage::Posterize {
            levels: config.posterize_levels,
        });
    }
    if config.vignette_effect {
        stages.push(Stage::Vignette {
            strength: config.vignette_strength,
        });
    }
    if config.wants_face_enhancement() {
        stages.push(Stage::FaceEnhance {
            smooth_skin: config.skin_smoothing,
            remove_red_eye: config.red_eye_removal,
        });
    }
    if config.remove_background {
        stages.push(Stage::RemoveBackground);
    }
    if config.hdr_tone_mapping {
        stages.push(Stage::HdrToneMap {
            gamma: config.gamma_correction,
            saturation: config.saturation_adjustment,
        });
    }
    if config.wants_upscale() {
        stages.push(Stage::SuperResolution);
    }
    if config.auto_enhance {
        stages.push(Stage::AutoEnhance);
    }
    if config.edge_enhancement {
        stages.push(Stage::EdgeEnhance);
    }
    if config.blur_radius > 0 {
        stages.push(Stage::Blur {
            radius: config.blur_radius,
        });
    }

    stages
}

/// Apply a single stage, reporting how it concluded.
///
/// The image argument is only replaced on `Applied`/`Degraded`; a `Skipped`
/// outcome leaves the caller's image exactly as it was.
pub fn apply_stage(
    image: &DynamicImage,
    stage: &Stage,
    resources: &DetectionResources,
) -> (Option<DynamicImage>, StageOutcome) {
    match stage {
        Stage::Rotate { degrees } => applied(geometry::rotate(image, *degrees)),
        Stage::FlipHorizontal => applied(geometry::flip_horizontal(image)),
        Stage::FlipVertical => applied(geometry::flip_vertical(image)),
        Stage::LensCorrection { k1, k2, p1, p2 } => {
            applied(geometry::correct_lens(image, *k1, *k2, *p1, *p2))
        }
        Stage::PerspectiveCorrection => applied(geometry::correct_perspective(image, None)),
        Stage::AutoWhiteBalance => applied(color::auto_white_balance(image)),
        Stage::ColorCorrection {
            temperature,
            tint,
            exposure,
        } => applied(color::correct_colors(image, *temperature, *tint, *exposure)),
        Stage::HueShift { degrees } => applied(color::hue_rotate(image, *degrees)),
        Stage::GammaRemap { gamma } => applied(color::gamma_map(image, *gamma)),
        Stage::BrightnessContrast {
            brightness,
            contrast,
        } => applied(color::brightness_contrast(image, *brightness, *contrast)),
        Stage::HighlightsShadows {
            highlights,
            shadows,
        } => applied(tone::highlights_shadows(image, *highlights, *shadows)),
        Stage::AutoContrast => applied(tone::auto_contrast(image)),
        Stage::Saturation { factor } => applied(tone::saturation(image, *factor)),
        Stage::Vibrance { amount } => applied(tone::vibrance(image, *amount)),
        Stage::NoiseReduction => applied(detail::denoise(image)),
        Stage::Sharpen => applied(detail::sharpen(image)),
        Stage::Clarity { amount } => applied(detail::clarity(image, *amount)),
        Stage::Structure { amount } => applied(detail::structure(image, *amount)),
        Stage::Smoothing { kind, strength } => {
            applied(detail::smoothing_filter(image, *kind, *strength))
        }
        Stage::MotionBlur { angle, distance } => {
            applied(detail::motion_blur(image, *angle, *distance))
        }
        Stage::OilPainting => applied(artistic::oil_painting(image)),
        Stage::PencilSketch => applied(artistic::pencil_sketch(image)),
        Stage::Cartoon => applied(artistic::cartoon(image)),
        Stage::Emboss => applied(artistic::emboss(image)),
        Stage::Vintage { intensity } => applied(artistic::vintage(image, *intensity)),
        Stage::Sepia => applied(artistic::sepia(image)),
        Stage::BlackWhite => applied(artistic::black_white(image)),
        Stage::Posterize { levels } => applied(artistic::posterize(image, *levels)),
        Stage::Vignette { strength } => applied(artistic::vignette(image, *strength)),
        Stage::FaceEnhance {
            smooth_skin,
            remove_red_eye,
        } => match faces::detect_faces(image, resources) {
            None => (
                None,
                StageOutcome::Skipped("face model unavailable".to_string()),
            ),
            Some(regions) if regions.is_empty() => {
                (None, StageOutcome::Skipped("no faces found".to_string()))
            }
            Some(regions) => applied(faces::enhance_faces(
                image,
                &regions,
                *smooth_skin,
                *remove_red_eye,
                resources,
            )),
        },
        Stage::RemoveBackground => applied(segment::remove_background(image, None)),
        Stage::HdrToneMap { gamma, saturation } => {
            applied(enhance::tone_map_hdr(image, *gamma, *saturation, 0.0))
        }
        Stage::SuperResolution => {
            let (upscaled, outcome) = enhance::super_resolve(image, resources);
            match outcome {
                enhance::UpscaleOutcome::Model => applied(upscaled),
                enhance::UpscaleOutcome::Fallback => (
                    Some(upscaled),
                    StageOutcome::Degraded("interpolation fallback".to_string()),
                ),
            }
        }
        Stage::AutoEnhance => applied(enhance::auto_enhance(image)),
        Stage::EdgeEnhance => applied(detail::edge_enhance(image)),
        Stage::Blur { radius } => applied(detail::uniform_blur(image, *radius)),
    }
}

fn applied(image: DynamicImage) -> (Option<DynamicImage>, StageOutcome) {
    (Some(image), StageOutcome::Applied)
}

/// Run the full pipeline on a decoded image: every enabled stage in
/// canonical order, then the resize the geometry resolver decides.
///
/// Returns the processed image; encoding is the caller's move (see
/// [`run_to_file`]).
#[instrument(skip(image, config, resources), fields(width = image.width(), height = image.height()))]
pub fn run(
    image: DynamicImage,
    config: &PipelineConfig,
    resources: &DetectionResources,
) -> Result<DynamicImage, PipelineError> {
    let mut working = image;

    if config.thread_count > 0 || config.use_gpu_acceleration {
        // Advisory only: kernels that parallelize internally may honor the
        // hints; the pipeline itself stays sequential.
        debug!(
            threads = config.thread_count,
            gpu = config.use_gpu_acceleration,
            "concurrency hints recorded"
        );
    }

    for stage in plan(config) {
        let (result, outcome) = apply_stage(&working, &stage, resources);
        match outcome {
            StageOutcome::Applied => debug!(stage = stage.name(), "applied"),
            StageOutcome::Degraded(ref reason) => {
                warn!(stage = stage.name(), reason = %reason, "applied via fallback")
            }
            StageOutcome::Skipped(ref reason) => {
                debug!(stage = stage.name(), reason = %reason, "skipped")
            }
        }
        if let Some(next) = result {
            working = next;
        }
    }

    // Resize, last: the geometry resolver decides the final dimensions.
    let current = (working.width(), working.height());
    let target = resolve_output_dimensions(
        current,
        (config.width, config.height),
        config.maintain_aspect_ratio,
    );
    if target != current {
        info!(from = ?current, to = ?target, "resizing");
        working = working.resize_exact(target.0, target.1, FilterType::Lanczos3);
    }

    Ok(working)
}

/// Run the pipeline and encode the result to `output`.
pub fn run_to_file(
    backend: &impl ImageBackend,
    image: DynamicImage,
    output: &Path,
    config: &PipelineConfig,
    resources: &DetectionResources,
) -> Result<(), PipelineError> {
    let processed = run(image, config, resources)?;

    let format = OutputFormat::parse(&config.output_format);
    let params = EncodeParams::derive(&format, config.quality, config.optimize_for_web);
    backend
        .encode(&processed, output, &params)
        .map_err(|e| PipelineError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 5 % 256) as u8, (y * 5 % 256) as u8, 77])
        }))
    }

    #[test]
    fn empty_config_plans_no_stages() {
        assert!(plan(&PipelineConfig::default()).is_empty());
    }

    #[test]
    fn plan_preserves_canonical_order() {
        let config = PipelineConfig {
            black_white: true,
            sepia_effect: true,
            rotation_angle: 90,
            blur_radius: 2,
            sharpen: true,
            ..Default::default()
        };
        let stages = plan(&config);
        assert_eq!(
            stages,
            vec![
                Stage::Rotate { degrees: 90.0 },
                Stage::Sharpen,
                Stage::Sepia,
                Stage::BlackWhite,
                Stage::Blur { radius: 2 },
            ]
        );
    }

    #[test]
    fn plan_merges_upscale_toggles_into_one_stage() {
        let config = PipelineConfig {
            super_resolution: true,
            upscale_ai: true,
            ..Default::default()
        };
        let stages = plan(&config);
        assert_eq!(stages, vec![Stage::SuperResolution]);
    }

    #[test]
    fn identity_run_returns_image_unchanged() {
        let img = gradient(40, 30);
        let out = run(
            img.clone(),
            &PipelineConfig::default(),
            &DetectionResources::unavailable(),
        )
        .unwrap();
        assert_eq!(out.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn run_resizes_with_fit_inside_box() {
        let img = gradient(400, 400);
        let config = PipelineConfig {
            width: 200,
            height: 100,
            ..Default::default()
        };
        let out = run(img, &config, &DetectionResources::unavailable()).unwrap();
        assert_eq!((out.width(), out.height()), (100, 100));
    }

    #[test]
    fn face_stage_skips_without_model() {
        let img = gradient(100, 100);
        let stage = Stage::FaceEnhance {
            smooth_skin: true,
            remove_red_eye: false,
        };
        let (result, outcome) = apply_stage(&img, &stage, &DetectionResources::unavailable());
        assert!(result.is_none());
        assert!(matches!(outcome, StageOutcome::Skipped(_)));
    }

    #[test]
    fn super_resolution_degrades_but_succeeds_without_model() {
        let img = gradient(30, 20);
        let config = PipelineConfig {
            super_resolution: true,
            ..Default::default()
        };
        let out = run(img, &config, &DetectionResources::unavailable()).unwrap();
        assert_eq!((out.width(), out.height()), (60, 40));
    }

    #[test]
    fn background_removal_emits_alpha() {
        let img = gradient(60, 60);
        let config = PipelineConfig {
            remove_background: true,
            ..Default::default()
        };
        let out = run(img, &config, &DetectionResources::unavailable()).unwrap();
        assert!(out.color().has_alpha());
    }

    #[test]
    fn sepia_then_black_white_ends_gray() {
        // Both toggles set: canonical order runs sepia first, then black &
        // white wins because it runs last.
        let img = gradient(20, 20);
        let config = PipelineConfig {
            sepia_effect: true,
            black_white: true,
            ..Default::default()
        };
        let out = run(img, &config, &DetectionResources::unavailable())
            .unwrap()
            .to_rgb8();
        assert!(out.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(PipelineError::Decode("x".into()).status_code(), -1);
        assert_eq!(PipelineError::Encode("x".into()).status_code(), -1);
        assert_eq!(
            PipelineError::Stage {
                stage: "sharpen",
                reason: "x".into()
            }
            .status_code(),
            -2
        );
        assert_eq!(PipelineError::Unknown("x".into()).status_code(), -3);
    }

    #[test]
    fn run_to_file_encodes_via_backend() {
        use crate::imaging::backend::tests::{MockBackend, RecordedOp};

        let backend = MockBackend::new();
        let config = PipelineConfig {
            output_format: "png".to_string(),
            quality: 100,
            ..Default::default()
        };
        run_to_file(
            &backend,
            gradient(10, 10),
            Path::new("/out/result.png"),
            &config,
            &DetectionResources::unavailable(),
        )
        .unwrap();

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                params: EncodeParams::Png {
                    compression_level: 0
                },
                ..
            }
        ));
    }
}
