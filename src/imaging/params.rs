//! Parameter types for encode operations.
//!
//! These types describe *what* to write, not *how* to write it. They are the
//! interface between the pipeline (which decides formats and quality from a
//! [`PipelineConfig`](crate::config::PipelineConfig)) and the
//! [`backend`](super::backend) (which drives the actual encoders). Keeping the
//! derivation pure makes the format-specific quirks — above all the inverted
//! PNG quality mapping — unit testable without touching a single pixel.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`OutputFormat`] — Target format parsed case-insensitively from its name.
//! - [`EncodeParams`] — Format plus derived codec parameters for one write.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Output format, parsed case-insensitively from a format name.
///
/// Unrecognized names become [`OutputFormat::Other`] and are handed to the
/// collaborator's default encoder with no extra parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Bmp,
    Other(String),
}

impl OutputFormat {
    /// Parse a format name. "jpg" and "jpeg" are the same format; matching is
    /// case-insensitive throughout.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "webp" => Self::WebP,
            "tif" | "tiff" => Self::Tiff,
            "bmp" => Self::Bmp,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical file extension for this format.
    pub fn extension(&self) -> &str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Other(name) => name,
        }
    }
}

/// PNG compression level derived from a 1–100 quality value.
///
/// The relationship is inverted on purpose: higher quality requests a *lower*
/// compression level (faster encode, larger file). The exact formula
/// `clamp(9 - quality/11, 0, 9)` with integer division is load-bearing for
/// compatibility and must not be "fixed".
pub fn png_compression_level(quality: u32) -> u32 {
    (9i64 - (quality as i64 / 11)).clamp(0, 9) as u32
}

/// Derived codec parameters for one encode call.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeParams {
    Jpeg {
        quality: Quality,
        /// Emit a size-optimized stream when the run requests web optimization.
        optimize: bool,
    },
    Png {
        /// 0–9, via [`png_compression_level`].
        compression_level: u32,
    },
    WebP {
        /// Clamped and carried for the contract; the built-in encoder is
        /// lossless and ignores it.
        quality: Quality,
    },
    /// Collaborator default encoder, selected by output extension.
    Default,
}

impl EncodeParams {
    /// Derive parameters for `format` from a raw quality value.
    pub fn derive(format: &OutputFormat, quality: u32, optimize: bool) -> Self {
        match format {
            OutputFormat::Jpeg => Self::Jpeg {
                quality: Quality::new(quality),
                optimize,
            },
            OutputFormat::Png => Self::Png {
                compression_level: png_compression_level(quality),
            },
            OutputFormat::WebP => Self::WebP {
                quality: Quality::new(quality),
            },
            OutputFormat::Tiff | OutputFormat::Bmp | OutputFormat::Other(_) => Self::Default,
        }
    }
}
