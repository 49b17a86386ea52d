//! Pure Rust image I/O backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP) | `image` crate (pure Rust decoders) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, compression level bucketed onto fast/default/best |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless) |
//! | Encode → anything else | `DynamicImage::save`, format from extension |

use super::backend::{BackendError, ImageBackend, ImageInfo};
use super::params::EncodeParams;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a 0–9 PNG compression level onto the encoder's three-speed dial.
///
/// The numeric level is derived by
/// [`png_compression_level`](super::params::png_compression_level) and kept
/// exact in [`EncodeParams`]; this bucketing is only the final adaptation to
/// the knobs the `png` crate actually exposes.
fn png_compression(level: u32) -> CompressionType {
    match level {
        0..=2 => CompressionType::Fast,
        3..=6 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, BackendError> {
    Ok(BufWriter::new(File::create(path)?))
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)
            .map_err(BackendError::Io)?
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| BackendError::Decode(format!("{}: {e}", path.display())))
    }

    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        // Full decode: identify reports the decoded representation, and
        // nothing is cached between calls.
        let image = self.decode(path)?;
        Ok(ImageInfo::of(&image))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        params: &EncodeParams,
    ) -> Result<(), BackendError> {
        let encode_err =
            |e: image::ImageError| BackendError::Encode(format!("{}: {e}", path.display()));

        match params {
            EncodeParams::Jpeg { quality, optimize } => {
                if *optimize {
                    debug!(path = %path.display(), "jpeg optimize requested; encoder emits baseline");
                }
                // JPEG has no alpha; flatten RGBA the way every JPEG writer does.
                let rgb = image.to_rgb8();
                let writer = create_writer(path)?;
                let encoder = JpegEncoder::new_with_quality(writer, quality.value() as u8);
                rgb.write_with_encoder(encoder).map_err(encode_err)
            }
            EncodeParams::Png { compression_level } => {
                let writer = create_writer(path)?;
                let encoder = PngEncoder::new_with_quality(
                    writer,
                    png_compression(*compression_level),
                    PngFilterType::Adaptive,
                );
                image.write_with_encoder(encoder).map_err(encode_err)
            }
            EncodeParams::WebP { quality } => {
                debug!(quality = quality.value(), "webp encode (lossless encoder)");
                let writer = create_writer(path)?;
                let encoder = WebPEncoder::new_lossless(writer);
                // The lossless encoder accepts RGB8/RGBA8 only.
                if image.color().has_alpha() {
                    image.to_rgba8().write_with_encoder(encoder).map_err(encode_err)
                } else {
                    image.to_rgb8().write_with_encoder(encoder).map_err(encode_err)
                }
            }
            EncodeParams::Default => image
                .save(path)
                .map_err(|e| BackendError::Encode(format!("{}: {e}", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{OutputFormat, Quality};
    use image::RgbImage;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let backend = RustBackend::new();
        backend
            .encode(
                &test_image(width, height),
                path,
                &EncodeParams::Jpeg {
                    quality: Quality::new(85),
                    optimize: false,
                },
            )
            .unwrap();
    }

    #[test]
    fn decode_roundtrip_preserves_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("img.jpg");
        write_jpeg(&path, 200, 150);

        let backend = RustBackend::new();
        let decoded = backend.decode(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 150));
    }

    #[test]
    fn decode_nonexistent_file_is_io_error() {
        let backend = RustBackend::new();
        let result = backend.decode(Path::new("/nonexistent/image.jpg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"not an image at all").unwrap();

        let backend = RustBackend::new();
        assert!(matches!(
            backend.decode(&path),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn identify_reports_decoded_properties() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("img.jpg");
        write_jpeg(&path, 64, 48);

        let backend = RustBackend::new();
        let info = backend.identify(&path).unwrap();
        assert_eq!(info.width, 64);
        assert_eq!(info.height, 48);
        assert_eq!(info.channels, 3);
        assert_eq!(info.bit_depth, 8);
    }

    #[test]
    fn encode_png_writes_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.png");

        let backend = RustBackend::new();
        backend
            .encode(
                &test_image(40, 30),
                &path,
                &EncodeParams::derive(&OutputFormat::Png, 100, false),
            )
            .unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn encode_webp_accepts_rgba() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.webp");

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            20,
            20,
            image::Rgba([10, 20, 30, 128]),
        ));
        let backend = RustBackend::new();
        backend
            .encode(
                &rgba,
                &path,
                &EncodeParams::WebP {
                    quality: Quality::new(80),
                },
            )
            .unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn encode_default_uses_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.bmp");

        let backend = RustBackend::new();
        backend
            .encode(&test_image(10, 10), &path, &EncodeParams::Default)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn encode_to_unwritable_path_fails() {
        let backend = RustBackend::new();
        let result = backend.encode(
            &test_image(10, 10),
            Path::new("/nonexistent-dir/out.jpg"),
            &EncodeParams::Jpeg {
                quality: Quality::new(85),
                optimize: false,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn png_levels_bucket_onto_encoder_speeds() {
        assert!(matches!(png_compression(0), CompressionType::Fast));
        assert!(matches!(png_compression(4), CompressionType::Default));
        assert!(matches!(png_compression(9), CompressionType::Best));
    }
}
