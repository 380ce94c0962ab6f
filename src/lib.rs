//! Solar panel inspection core.
//!
//! Three independent detectors run over the same frame — panels, sub-modules,
//! and faults — and this crate turns their unordered box lists into a
//! hierarchical result: which modules and faults sit inside which panel, plus
//! three annotated raster layers per frame.
//!
//! # Contracts
//!
//! 1. **Deterministic ordering**: every detection set is sorted by its box
//!    key before use; overlay rendering order is observable output.
//! 2. **Strict containment**: assignment uses an open-interval point-in-box
//!    test; midpoints on a panel edge are never assigned.
//! 3. **First match wins**: a detection joins the first panel (in canonical
//!    order) containing its midpoint, and at most one panel per frame.
//! 4. **Layer isolation**: each annotated layer starts from its own copy of
//!    the frame; compositing is a pure function of its inputs.
//! 5. **Sequential frames**: no cross-frame state beyond output counters,
//!    timings, and diagnostics.
//!
//! # Module Structure
//!
//! - `geometry`: axis-aligned rect predicates
//! - `detect`: detection types and detector backends (stub, optional ONNX)
//! - `correlate`: detection sets and the panel correlation engine
//! - `compose`: layered annotation rendering
//! - `render`: drawing primitives behind the `Renderer` trait
//! - `ingest`: frame sources (image file/dir, synthetic)
//! - `output`: artifact sinks (filesystem, in-memory) and label export
//! - `pipeline`: per-frame orchestration, timings, diagnostics
//! - `config`: layered configuration for the CLI

use thiserror::Error;

pub mod compose;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod geometry;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod ui;

pub use compose::{confidence_label, FrameLayers, LayerCompositor, LayerStyle};
pub use config::ScanConfig;
pub use correlate::{Correlation, CorrelationEngine, DetectionSet, PanelRecord};
pub use detect::{ClassNames, Detection, DetectorBackend, DetectorRole, StubBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use geometry::Rect;
pub use ingest::{Frame, FrameId, FrameSource, ImageDirSource, SyntheticSource};
pub use output::{
    label_lines, ArtifactSink, FilesystemArtifactWriter, InMemoryArtifactWriter, Layer,
};
pub use pipeline::{FrameResult, RunDiagnostics, RunPipeline, StageTimings};
pub use render::{RasterRenderer, Renderer};

/// A box that violates the rect invariant reached a geometric predicate.
/// Recovered by dropping the offending detection, never by aborting the
/// frame.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("inverted box: ({x1}, {y1}, {x2}, {y2})")]
    Inverted { x1: f32, y1: f32, x2: f32, y2: f32 },
    #[error("negative coordinate in box ({x1}, {y1}, {x2}, {y2})")]
    Negative { x1: f32, y1: f32, x2: f32, y2: f32 },
    #[error("non-finite coordinate in box ({x1}, {y1}, {x2}, {y2})")]
    NotFinite { x1: f32, y1: f32, x2: f32, y2: f32 },
}

/// Artifact persistence failure. Reported and counted; never corrupts the
/// in-memory frame result.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encode failure: {0}")]
    Encode(#[from] image::ImageError),
}
