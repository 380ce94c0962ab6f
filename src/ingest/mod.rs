//! Frame sources.
//!
//! A source supplies decoded frames one at a time with a stable identifier.
//! Still-image files and directories are supported directly; `stub://`
//! sources synthesize frames for tests and demos. Video and network stream
//! decoding are collaborator concerns and stay outside this crate.
//!
//! File and directory sources enumerate in sorted path order so a run over
//! the same inputs is reproducible.

mod files;
mod synthetic;

pub use files::ImageDirSource;
pub use synthetic::SyntheticSource;

use anyhow::Result;
use image::RgbImage;

/// Stable identity for one frame, used for output naming and logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameId {
    /// File stem (or synthetic source name).
    pub stem: String,
    /// Output extension, without the dot.
    pub ext: String,
    /// Position in the source's emission order.
    pub index: u64,
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.stem, self.index)
    }
}

/// One decoded frame.
pub struct Frame {
    pub id: FrameId,
    pub image: RgbImage,
}

/// Supplies decoded frames one at a time. Finite sources return `Ok(None)`
/// at end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Total frame count when known up front (drives progress reporting).
    fn len_hint(&self) -> Option<u64> {
        None
    }
}
