//! Annotated-layer and label persistence.
//!
//! The pipeline hands each frame's three layers to an [`ArtifactSink`]. The
//! filesystem implementation owns run-directory naming (incrementing `exp`,
//! `exp2`, ... unless reuse is allowed) and the on-disk layout:
//!
//! ```text
//! <project>/<run>/<stem>_panel_detection.<ext>
//! <project>/<run>/<stem>_panel_block_detection.<ext>
//! <project>/<run>/<stem>_anomaly_detection.<ext>
//! <project>/<run>/labels/<stem>.txt            (optional)
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::detect::Detection;
use crate::ingest::FrameId;
use crate::ArtifactError;

/// Which annotated layer a file holds. The suffixes are a naming
/// convention inherited from the upstream tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Panel,
    Module,
    Anomaly,
}

impl Layer {
    pub fn suffix(&self) -> &'static str {
        match self {
            Layer::Panel => "_panel_detection",
            Layer::Module => "_panel_block_detection",
            Layer::Anomaly => "_anomaly_detection",
        }
    }
}

/// Persists annotated layers and optional label files.
pub trait ArtifactSink {
    fn save_layer(
        &mut self,
        id: &FrameId,
        layer: Layer,
        image: &RgbImage,
    ) -> Result<(), ArtifactError>;

    /// Persist pre-formatted label lines for one frame.
    fn save_labels(&mut self, id: &FrameId, lines: &[String]) -> Result<(), ArtifactError>;
}

/// Filesystem sink with upstream-compatible naming.
pub struct FilesystemArtifactWriter {
    run_dir: PathBuf,
    labels_dir_ready: bool,
}

impl FilesystemArtifactWriter {
    /// Resolve (and create) the run directory under `project`.
    ///
    /// With `exist_ok` the named directory is reused; otherwise an existing
    /// `name` makes the run land in `name2`, `name3`, ...
    pub fn create(project: &Path, name: &str, exist_ok: bool) -> Result<Self, ArtifactError> {
        let run_dir = increment_path(project, name, exist_ok);
        std::fs::create_dir_all(&run_dir)?;
        Ok(Self {
            run_dir,
            labels_dir_ready: false,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn layer_path(&self, id: &FrameId, layer: Layer) -> PathBuf {
        self.run_dir
            .join(format!("{}{}.{}", id.stem, layer.suffix(), id.ext))
    }
}

impl ArtifactSink for FilesystemArtifactWriter {
    fn save_layer(
        &mut self,
        id: &FrameId,
        layer: Layer,
        image: &RgbImage,
    ) -> Result<(), ArtifactError> {
        let path = self.layer_path(id, layer);
        image.save(&path)?;
        log::debug!("saved {}", path.display());
        Ok(())
    }

    fn save_labels(&mut self, id: &FrameId, lines: &[String]) -> Result<(), ArtifactError> {
        let labels_dir = self.run_dir.join("labels");
        if !self.labels_dir_ready {
            std::fs::create_dir_all(&labels_dir)?;
            self.labels_dir_ready = true;
        }
        let path = labels_dir.join(format!("{}.txt", id.stem));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct InMemoryArtifactWriter {
    pub layers: Vec<(String, RgbImage)>,
    pub labels: HashMap<String, Vec<String>>,
}

impl InMemoryArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactSink for InMemoryArtifactWriter {
    fn save_layer(
        &mut self,
        id: &FrameId,
        layer: Layer,
        image: &RgbImage,
    ) -> Result<(), ArtifactError> {
        let name = format!("{}{}.{}", id.stem, layer.suffix(), id.ext);
        self.layers.push((name, image.clone()));
        Ok(())
    }

    fn save_labels(&mut self, id: &FrameId, lines: &[String]) -> Result<(), ArtifactError> {
        self.labels
            .entry(id.stem.clone())
            .or_default()
            .extend(lines.iter().cloned());
        Ok(())
    }
}

/// First free run directory: `name`, then `name2`, `name3`, ...
fn increment_path(project: &Path, name: &str, exist_ok: bool) -> PathBuf {
    let base = project.join(name);
    if exist_ok || !base.exists() {
        return base;
    }
    for n in 2..9999u32 {
        let candidate = project.join(format!("{name}{n}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    base
}

/// Format one frame's detections as upstream-convention label lines:
/// `class_id cx cy w h [score]`, xywh normalized by the image dimensions,
/// numbers in `%g` shortest form.
pub fn label_lines(
    detections: &[&Detection],
    image_width: u32,
    image_height: u32,
    save_conf: bool,
) -> Vec<String> {
    let (w, h) = (image_width as f64, image_height as f64);
    detections
        .iter()
        .map(|d| {
            let r = &d.rect;
            let cx = (r.x1 + r.x2) as f64 / 2.0 / w;
            let cy = (r.y1 + r.y2) as f64 / 2.0 / h;
            let bw = (r.x2 - r.x1) as f64 / w;
            let bh = (r.y2 - r.y1) as f64 / h;
            let mut line = format!(
                "{} {} {} {} {}",
                d.class_id,
                format_g(cx),
                format_g(cy),
                format_g(bw),
                format_g(bh)
            );
            if save_conf {
                line.push(' ');
                line.push_str(&format_g(d.score as f64));
            }
            line
        })
        .collect()
}

/// `%g`-style shortest formatting: six significant digits, trailing zeros
/// stripped, scientific notation outside [1e-4, 1e6).
fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let exp = value.abs().log10().floor() as i32;
    if (-4..6).contains(&exp) {
        let decimals = (5 - exp).max(0) as usize;
        strip_zeros(format!("{value:.decimals$}"))
    } else {
        let mantissa = value / 10f64.powi(exp);
        let mantissa = strip_zeros(format!("{mantissa:.5}"));
        let sign = if exp < 0 { "-" } else { "+" };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

fn strip_zeros(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: u32) -> Detection {
        Detection::new(Rect::new(x1, y1, x2, y2).unwrap(), score, class_id)
    }

    #[test]
    fn format_g_matches_upstream_shortest_form() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(0.5), "0.5");
        assert_eq!(format_g(0.875), "0.875");
        assert_eq!(format_g(1.0), "1");
        assert_eq!(format_g(0.123456789), "0.123457");
        assert_eq!(format_g(0.0000123), "1.23e-05");
        assert_eq!(format_g(0.25), "0.25");
    }

    #[test]
    fn label_lines_normalize_to_image_dimensions() {
        let d = det(10.0, 20.0, 30.0, 60.0, 0.875, 1);
        let lines = label_lines(&[&d], 100, 200, false);
        assert_eq!(lines, vec!["1 0.2 0.2 0.2 0.2"]);

        let with_conf = label_lines(&[&d], 100, 200, true);
        assert_eq!(with_conf, vec!["1 0.2 0.2 0.2 0.2 0.875"]);
    }

    #[test]
    fn layer_suffixes_match_the_upstream_convention() {
        assert_eq!(Layer::Panel.suffix(), "_panel_detection");
        assert_eq!(Layer::Module.suffix(), "_panel_block_detection");
        assert_eq!(Layer::Anomaly.suffix(), "_anomaly_detection");
    }

    #[test]
    fn increment_path_skips_existing_run_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path();

        assert_eq!(increment_path(project, "exp", false), project.join("exp"));
        std::fs::create_dir_all(project.join("exp")).unwrap();
        assert_eq!(increment_path(project, "exp", false), project.join("exp2"));
        std::fs::create_dir_all(project.join("exp2")).unwrap();
        assert_eq!(increment_path(project, "exp", false), project.join("exp3"));
        assert_eq!(increment_path(project, "exp", true), project.join("exp"));
    }

    #[test]
    fn in_memory_sink_records_layer_names() {
        let mut sink = InMemoryArtifactWriter::new();
        let id = FrameId {
            stem: "scan01".into(),
            ext: "jpg".into(),
            index: 0,
        };
        let image = RgbImage::new(4, 4);
        sink.save_layer(&id, Layer::Anomaly, &image).unwrap();
        assert_eq!(sink.layers[0].0, "scan01_anomaly_detection.jpg");
    }
}
