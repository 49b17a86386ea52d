//! Image I/O and dimension math.
//!
//! | Concern | Module |
//! |---|---|
//! | Collaborator contract (decode / identify / encode) | [`backend`] |
//! | Pure-Rust codec implementation | [`rust_backend`] |
//! | Dimension math (geometry resolver, collage grid) | [`calculations`] |
//! | Encode parameter derivation | [`params`] |
//!
//! The module is split so that everything above the [`ImageBackend`] trait is
//! testable with a recording mock, and everything below it is exercised with
//! synthetic images in a temp directory.

pub mod backend;
mod calculations;
pub mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageInfo};
pub use calculations::{
    CollageGrid, collage_cell_origin, collage_grid, odd_kernel_size, resolve_output_dimensions,
};
pub use params::{EncodeParams, OutputFormat, Quality, png_compression_level};
pub use rust_backend::RustBackend;
