//! # Darkroom
//!
//! A batch image enhancement pipeline: one flat configuration describes
//! which of thirty-odd effects to apply, and the orchestrator applies them
//! in a single fixed order, resizes, and encodes. The interesting problem is
//! not any individual effect — it is the composition policy: a total
//! ordering across interacting stages, a per-stage failure policy, and the
//! derivation of output geometry and codec parameters from one record.
//!
//! # Architecture: Plan, Apply, Write
//!
//! ```text
//! 1. Plan     PipelineConfig  →  Vec<Stage>     (flat knobs → ordered descriptors)
//! 2. Apply    Stage × image   →  image          (pure pixel transformations)
//! 3. Write    image × config  →  encoded file   (geometry resolver + encoder params)
//! ```
//!
//! This separation exists for three reasons:
//!
//! - **The order is the contract**: later stages assume earlier ones have
//!   settled geometry and base color. Deriving an explicit stage list makes
//!   the ordering testable instead of being an accident of control flow.
//! - **Failure policy is per stage**: model-gated stages skip gracefully,
//!   super-resolution degrades to interpolation, everything else is fatal
//!   for the item. The batch runner leans on this to never stop early.
//! - **Testability**: pixel work is pure (image in, image out), I/O sits
//!   behind the [`ImageBackend`](imaging::ImageBackend) trait, so batch
//!   semantics run against a recording mock and stage math runs on synthetic
//!   buffers.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | The flat ~60-knob [`PipelineConfig`](config::PipelineConfig) record |
//! | [`pipeline`] | Stage descriptors, canonical ordering, the orchestrator, error taxonomy |
//! | [`stages`] | The effect implementations, grouped by family |
//! | [`imaging`] | Backend trait, pure-Rust codecs, dimension math, encode parameters |
//! | [`process`] | File-level entry points: single image, batch, thumbnail, conversions |
//! | [`analysis`] | Quality metrics (sharpness, noise, brightness, contrast) |
//! | [`collage`] | Grid collage composition |
//! | [`resources`] | Detection/model resource handles with the skip-on-missing contract |
//!
//! # Design Decisions
//!
//! ## Flat Config, Typed Plan
//!
//! The user-facing configuration stays a flat record with independent fields
//! and no combination validation — enabling sepia and black & white together
//! is allowed, and the canonical order decides the result (last writer
//! wins). Internally [`pipeline::plan`] projects the record onto typed stage
//! descriptors so combinations are at least enumerable and the order is a
//! value under test, not folklore.
//!
//! ## Degraded Success Is Success
//!
//! Super-resolution tries the model-backed path and falls back to smooth
//! interpolation on any failure. The fallback is mandatory: that stage never
//! aborts a pipeline, and callers see an upscaled output either way. The
//! same philosophy gates face and object detection — a missing model means
//! the stage skips, not that the item fails.
//!
//! ## Pure-Rust Imaging
//!
//! Decode and encode go through the `image` crate, heavier kernels through
//! `imageproc`, and the few filters neither provides (color bilateral, the
//! adaptive-threshold edge map, tiled luminance equalization) are
//! implemented here. No system libraries, no version skew: the crate is
//! fully self-contained.

pub mod analysis;
pub mod collage;
pub mod config;
pub mod imaging;
pub mod pipeline;
pub mod process;
pub mod resources;
pub mod stages;

pub use analysis::{QualityReport, analyze};
pub use config::{FilterKind, PipelineConfig};
pub use pipeline::{PipelineError, Stage, StageOutcome, plan, run};
pub use process::{ArtisticEffect, BatchReport, process_batch, process_file};
pub use resources::{DetectionResources, ResourcePaths};
