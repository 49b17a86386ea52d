//! Pipeline configuration module.
//!
//! One [`PipelineConfig`] record describes everything a processing run may do:
//! output geometry and quality, which effects are enabled, and their
//! intensities. The record is deliberately flat — every knob is independent,
//! there is no validation of effect combinations, and enabling two effects
//! that touch the same pixels (say [`sepia_effect`](PipelineConfig::sepia_effect)
//! and [`black_white`](PipelineConfig::black_white)) simply means both run,
//! in the canonical order defined by [`pipeline::plan`](crate::pipeline::plan).
//! The last stage to touch a pixel wins.
//!
//! A config is constructed once per run (or once per batch, shared across all
//! items) and never mutated. [`PipelineConfig::default`] is the identity
//! configuration: every toggle off, quality 85, aspect ratio preserved —
//! processing with it re-encodes the input at unchanged dimensions.

use serde::{Deserialize, Serialize};

/// The smoothing filter applied by the named-filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Edge-preserving smoothing weighted by both distance and color delta.
    Bilateral,
    /// Rank filter; strong against salt-and-pepper noise.
    Median,
    /// Plain Gaussian smoothing.
    Gaussian,
}

/// Complete description of one processing run.
///
/// Fields group into: output settings, basic adjustments, effect toggles,
/// effect intensities, and advisory pass-throughs. All fields are independent;
/// see the [module docs](self) for the combination policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // -- Output ---------------------------------------------------------------
    /// Requested output width in pixels; 0 keeps the current width.
    pub width: u32,
    /// Requested output height in pixels; 0 keeps the current height.
    pub height: u32,
    /// Lossy encoding quality, clamped to 1–100 at encode time.
    pub quality: u32,
    /// Fit-inside-box resize when both dimensions are requested.
    pub maintain_aspect_ratio: bool,
    /// Output format name, matched case-insensitively ("jpg", "png", "webp",
    /// "tiff", "bmp"; anything else falls through to the default encoder).
    pub output_format: String,
    /// Request size-optimized encoding (JPEG optimize flag, deeper PNG
    /// compression).
    pub optimize_for_web: bool,

    // -- Basic adjustments ----------------------------------------------------
    /// Additive brightness term; 0 is neutral.
    pub brightness_adjustment: f32,
    /// Multiplicative contrast factor; 1 is neutral.
    pub contrast_adjustment: f32,
    /// Saturation multiplier (≥ 0); 1 is neutral.
    pub saturation_adjustment: f32,
    /// Uniform Gaussian blur radius applied as the final softening pass;
    /// 0 disables.
    pub blur_radius: u32,

    // -- Effect toggles -------------------------------------------------------
    /// Local luminance-contrast equalization in a perceptual space.
    pub auto_enhance: bool,
    /// Edge-preserving denoise.
    pub noise_reduction: bool,
    /// Unsharp-mask sharpening.
    pub sharpen: bool,
    /// Per-channel histogram equalization.
    pub auto_contrast: bool,
    /// Gray-world white balance.
    pub auto_white_balance: bool,
    /// Temperature/tint/exposure correction using the fields further down.
    pub color_correction: bool,
    /// Border-seeded foreground segmentation; background goes transparent.
    pub remove_background: bool,
    /// Blend a detected edge map back into the image.
    pub edge_enhancement: bool,
    /// Reinhard-style tone mapping.
    pub hdr_tone_mapping: bool,
    /// Sepia matrix plus synthetic vignette.
    pub vintage_effect: bool,
    /// Plain sepia color matrix.
    pub sepia_effect: bool,
    /// Desaturate to grayscale (kept in the 3-channel representation).
    pub black_white: bool,
    /// Radial darkening scaled by [`vignette_strength`](Self::vignette_strength).
    pub vignette_effect: bool,
    /// Radial/tangential lens distortion correction.
    pub lens_correction: bool,
    /// Warp to an axis-aligned rectangle sized to the image's own bounds.
    pub perspective_correction: bool,
    /// Darken red pixels inside detected eye regions.
    pub red_eye_removal: bool,
    /// Color-gated bilateral blend inside detected face regions.
    pub skin_smoothing: bool,
    /// Advisory: consulted only by the object-detection entry point, never by
    /// the pipeline.
    pub object_detection: bool,
    /// Advisory: consulted only by the watermark-removal entry point, never by
    /// the pipeline.
    pub watermark_removal: bool,
    /// Learned upscaling with mandatory interpolation fallback.
    pub upscale_ai: bool,
    /// Same stage as [`upscale_ai`](Self::upscale_ai); either toggle enables it.
    pub super_resolution: bool,

    // -- Color adjustments ----------------------------------------------------
    /// Hue rotation in degrees; 0 is neutral.
    pub hue_shift: f32,
    /// Gamma remap exponent (> 0); 1 is neutral.
    pub gamma_correction: f32,
    /// Highlights boost/reduction for pixels above the luminance threshold;
    /// 0 is neutral.
    pub highlights: f32,
    /// Shadows boost/reduction for pixels below the luminance threshold;
    /// 0 is neutral.
    pub shadows: f32,
    /// Saturation boost excluding the skin-tone range; 0 is neutral.
    pub vibrance: f32,
    /// Local-contrast blend against a wide blur; 0 is neutral.
    pub clarity: f32,
    /// Blend toward an edge-preserving smooth; 0 is neutral.
    pub structure: f32,
    /// Blue–orange balance shift; 0 is neutral. Read when
    /// [`color_correction`](Self::color_correction) is set.
    pub temperature: f32,
    /// Green–magenta balance shift; 0 is neutral. Read when
    /// [`color_correction`](Self::color_correction) is set.
    pub tint: f32,
    /// Exposure compensation in stops. Read when
    /// [`color_correction`](Self::color_correction) is set.
    pub exposure_compensation: f32,

    // -- Effect parameters ----------------------------------------------------
    /// Vignette darkening strength.
    pub vignette_strength: f32,
    /// Vintage effect intensity.
    pub vintage_intensity: f32,
    /// Rotation around the image center, in degrees; 0 disables.
    pub rotation_angle: i32,
    /// Mirror left-right.
    pub flip_horizontal: bool,
    /// Mirror top-bottom.
    pub flip_vertical: bool,

    // -- Named filter ---------------------------------------------------------
    /// Optional smoothing filter; `None` disables the stage.
    pub filter_type: Option<FilterKind>,
    /// Kernel size for the named filter, forced to the nearest odd value ≥ 1.
    pub filter_strength: u32,

    // -- Motion blur ----------------------------------------------------------
    /// Directional line-kernel blur.
    pub motion_blur: bool,
    /// Motion blur direction in degrees.
    pub motion_angle: f32,
    /// Motion blur kernel length in pixels.
    pub motion_distance: u32,

    // -- Artistic effects -----------------------------------------------------
    /// Oil-painting stylization.
    pub oil_painting: bool,
    /// Grayscale-plus-color sketch blend.
    pub pencil_sketch: bool,
    /// Bilateral smoothing combined with adaptive-threshold edges.
    pub cartoon_effect: bool,
    /// Directional kernel blended with the original at a mid-gray offset.
    pub emboss_effect: bool,
    /// Quantize each channel to uniform steps.
    pub posterize_effect: bool,
    /// Posterization step count, floored at 2.
    pub posterize_levels: u32,

    // -- Advisory pass-throughs -----------------------------------------------
    /// Recorded for encoders that understand it; the built-in collaborator
    /// does not emit metadata either way.
    pub strip_metadata: bool,
    /// Recorded; the built-in JPEG encoder emits baseline streams.
    pub progressive_jpeg: bool,
    /// Recorded; not written into output headers.
    pub dpi: u32,
    /// Advisory worker-count hint for kernels that parallelize internally.
    /// The batch loop itself is always sequential.
    pub thread_count: u32,
    /// Advisory; the built-in collaborator is CPU-only.
    pub use_gpu_acceleration: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            quality: 85,
            maintain_aspect_ratio: true,
            output_format: "jpg".to_string(),
            optimize_for_web: false,
            brightness_adjustment: 0.0,
            contrast_adjustment: 1.0,
            saturation_adjustment: 1.0,
            blur_radius: 0,
            auto_enhance: false,
            noise_reduction: false,
            sharpen: false,
            auto_contrast: false,
            auto_white_balance: false,
            color_correction: false,
            remove_background: false,
            edge_enhancement: false,
            hdr_tone_mapping: false,
            vintage_effect: false,
            sepia_effect: false,
            black_white: false,
            vignette_effect: false,
            lens_correction: false,
            perspective_correction: false,
            red_eye_removal: false,
            skin_smoothing: false,
            object_detection: false,
            watermark_removal: false,
            upscale_ai: false,
            super_resolution: false,
            hue_shift: 0.0,
            gamma_correction: 1.0,
            highlights: 0.0,
            shadows: 0.0,
            vibrance: 0.0,
            clarity: 0.0,
            structure: 0.0,
            temperature: 0.0,
            tint: 0.0,
            exposure_compensation: 0.0,
            vignette_strength: 0.0,
            vintage_intensity: 0.0,
            rotation_angle: 0,
            flip_horizontal: false,
            flip_vertical: false,
            filter_type: None,
            filter_strength: 0,
            motion_blur: false,
            motion_angle: 0.0,
            motion_distance: 0,
            oil_painting: false,
            pencil_sketch: false,
            cartoon_effect: false,
            emboss_effect: false,
            posterize_effect: false,
            posterize_levels: 4,
            strip_metadata: false,
            progressive_jpeg: false,
            dpi: 0,
            thread_count: 0,
            use_gpu_acceleration: false,
        }
    }
}

impl PipelineConfig {
    /// True when the super-resolution stage should run (either toggle).
    pub fn wants_upscale(&self) -> bool {
        self.super_resolution || self.upscale_ai
    }

    /// True when either face-dependent enhancement is requested.
    pub fn wants_face_enhancement(&self) -> bool {
        self.skin_smoothing || self.red_eye_removal
    }
}
