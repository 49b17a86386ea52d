//! Image I/O backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the collaborator boundary: decode, identify,
//! and encode. Everything above it — the pipeline, the batch runner, the
//! collage composer — is backend-agnostic, which is what lets the batch
//! semantics be tested against a recording mock instead of real files.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure-Rust codecs.

use super::params::EncodeParams;
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Channel count of the decoded representation (3 for RGB, 4 for RGBA...).
    pub channels: u8,
    /// Bits per channel (8 or 16 for the formats this crate decodes).
    pub bit_depth: u8,
}

impl ImageInfo {
    /// Describe an already-decoded image.
    pub fn of(image: &DynamicImage) -> Self {
        let color = image.color();
        let channels = color.channel_count();
        Self {
            width: image.width(),
            height: image.height(),
            channels,
            bit_depth: (color.bits_per_pixel() / channels as u16) as u8,
        }
    }
}

/// Trait for image I/O backends.
///
/// Every backend must implement all three operations so the rest of the
/// codebase never names a concrete codec.
pub trait ImageBackend: Sync {
    /// Decode an image from disk.
    fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Read image properties (decodes as needed; nothing is cached).
    fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Encode an image to disk with the derived codec parameters.
    fn encode(
        &self,
        image: &DynamicImage,
        path: &Path,
        params: &EncodeParams,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::Mutex;

    /// Mock backend that records operations without touching the filesystem.
    /// Uses Mutex (not RefCell) so it stays Sync like the real backend.
    #[derive(Default)]
    pub struct MockBackend {
        /// Paths whose decode should fail (simulating unreadable inputs).
        pub fail_decode: Vec<String>,
        /// Paths whose encode should fail (simulating unwritable outputs).
        pub fail_encode: Vec<String>,
        /// Dimensions of the synthetic image served by decode.
        pub decode_size: (u32, u32),
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Identify(String),
        Encode {
            output: String,
            width: u32,
            height: u32,
            params: EncodeParams,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self {
                decode_size: (16, 16),
                ..Self::default()
            }
        }

        pub fn failing_decode(paths: &[&str]) -> Self {
            Self {
                fail_decode: paths.iter().map(|p| p.to_string()).collect(),
                ..Self::new()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn synthetic(&self) -> DynamicImage {
            let (w, h) = self.decode_size;
            DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
                image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 99])
            }))
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<DynamicImage, BackendError> {
            let key = path.to_string_lossy().to_string();
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(key.clone()));
            if self.fail_decode.contains(&key) {
                return Err(BackendError::Decode(format!("mock decode failure: {key}")));
            }
            Ok(self.synthetic())
        }

        fn identify(&self, path: &Path) -> Result<ImageInfo, BackendError> {
            let key = path.to_string_lossy().to_string();
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(key.clone()));
            if self.fail_decode.contains(&key) {
                return Err(BackendError::Decode(format!("mock decode failure: {key}")));
            }
            Ok(ImageInfo::of(&self.synthetic()))
        }

        fn encode(
            &self,
            image: &DynamicImage,
            path: &Path,
            params: &EncodeParams,
        ) -> Result<(), BackendError> {
            let key = path.to_string_lossy().to_string();
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                output: key.clone(),
                width: image.width(),
                height: image.height(),
                params: params.clone(),
            });
            if self.fail_encode.contains(&key) {
                return Err(BackendError::Encode(format!("mock encode failure: {key}")));
            }
            Ok(())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::new();
        let img = backend.decode(Path::new("/in/a.jpg")).unwrap();
        assert_eq!((img.width(), img.height()), (16, 16));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Decode(p) if p == "/in/a.jpg"));
    }

    #[test]
    fn mock_fails_configured_paths() {
        let backend = MockBackend::failing_decode(&["/in/bad.jpg"]);
        assert!(backend.decode(Path::new("/in/bad.jpg")).is_err());
        assert!(backend.decode(Path::new("/in/good.jpg")).is_ok());
    }

    #[test]
    fn image_info_of_describes_color_type() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(10, 20));
        let info = ImageInfo::of(&rgb);
        assert_eq!(info.width, 10);
        assert_eq!(info.height, 20);
        assert_eq!(info.channels, 3);
        assert_eq!(info.bit_depth, 8);

        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        assert_eq!(ImageInfo::of(&rgba).channels, 4);
    }
}
