//! Synthetic frame source for tests and `stub://` demo runs.

use anyhow::Result;
use image::RgbImage;

use super::{Frame, FrameId, FrameSource};

/// Generates a fixed number of deterministic gradient frames.
///
/// Frame content varies with the frame index so detector stubs see distinct
/// scenes, but is otherwise a pure function of `(name, index, size)`.
pub struct SyntheticSource {
    name: String,
    frames: u64,
    width: u32,
    height: u32,
    emitted: u64,
}

impl SyntheticSource {
    pub fn new(name: &str, frames: u64, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            frames,
            width,
            height,
            emitted: 0,
        }
    }

    fn generate(&self, index: u64) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let seed = x as u64 + y as u64 * self.width as u64 + index * 13;
            image::Rgb([(seed % 256) as u8, ((seed / 3) % 256) as u8, 40])
        })
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.emitted >= self.frames {
            return Ok(None);
        }
        let index = self.emitted;
        self.emitted += 1;
        Ok(Some(Frame {
            id: FrameId {
                stem: format!("{}_{:04}", self.name, index),
                ext: "png".to_string(),
                index,
            },
            image: self.generate(index),
        }))
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.frames)
    }
}
