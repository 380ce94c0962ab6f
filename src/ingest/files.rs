//! Still-image file and directory source.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::{Frame, FrameId, FrameSource};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Frame source over a single image file or a directory of images.
///
/// Directory entries are enumerated once at construction and sorted by path,
/// so emission order (and therefore output naming and overlay order) is
/// stable across runs.
pub struct ImageDirSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageDirSource {
    pub fn new<P: AsRef<Path>>(source: P) -> Result<Self> {
        let source = source.as_ref();
        if source.is_file() {
            if !has_image_extension(source) {
                return Err(anyhow!(
                    "{} is not a supported image (expected one of {:?})",
                    source.display(),
                    IMAGE_EXTENSIONS
                ));
            }
            return Ok(Self {
                paths: vec![source.to_path_buf()],
                next: 0,
            });
        }
        if source.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(source)
                .with_context(|| format!("failed to read source directory {}", source.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && has_image_extension(path))
                .collect();
            paths.sort();
            if paths.is_empty() {
                return Err(anyhow!("no images found under {}", source.display()));
            }
            return Ok(Self { paths, next: 0 });
        }
        Err(anyhow!("source {} does not exist", source.display()))
    }

    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        let index = self.next as u64;
        self.next += 1;

        let image = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgb8();

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame")
            .to_string();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("jpg")
            .to_ascii_lowercase();

        log::debug!("decoded {} ({}x{})", path.display(), image.width(), image.height());

        Ok(Some(Frame {
            id: FrameId { stem, ext, index },
            image,
        }))
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.paths.len() as u64)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
