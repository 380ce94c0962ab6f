//! Per-frame orchestration.
//!
//! One frame flows detection (panel, fault, module — fixed order) →
//! correlation → compositing → persistence. Frames are strictly sequential;
//! the only cross-frame state is the artifact sink's output location and the
//! accumulated timings and diagnostics. Determinism of the correlation and
//! overlay order depends on this sequencing.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbImage;

use crate::compose::{FrameLayers, LayerCompositor};
use crate::correlate::{Correlation, CorrelationEngine, DetectionSet};
use crate::detect::{Detection, DetectorBackend, DetectorRole};
use crate::geometry::Rect;
use crate::ingest::{Frame, FrameId, FrameSource};
use crate::output::{label_lines, ArtifactSink, Layer};
use crate::render::Renderer;

/// Correlation and layers for one frame. Immutable after creation.
pub struct FrameResult {
    pub frame_id: FrameId,
    pub correlation: Correlation,
    pub layers: FrameLayers,
}

/// Coarse per-stage wall-clock accumulation across a run.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageTimings {
    pub pre_process: Duration,
    pub inference: Duration,
    pub post_process: Duration,
    pub frames: u64,
}

impl StageTimings {
    fn per_image_ms(&self, total: Duration) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        total.as_secs_f64() * 1000.0 / self.frames as f64
    }

    /// Upstream-style throughput line.
    pub fn summary(&self) -> String {
        format!(
            "Speed: {:.1}ms pre-process, {:.1}ms inference, {:.1}ms post-process per image",
            self.per_image_ms(self.pre_process),
            self.per_image_ms(self.inference),
            self.per_image_ms(self.post_process)
        )
    }
}

/// Counters surfaced in the end-of-run summary. Nothing is silently
/// swallowed: every dropped detection, failed frame, and failed write lands
/// here.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunDiagnostics {
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub detections_dropped: u64,
    pub uncorrelated_modules: u64,
    pub uncorrelated_faults: u64,
    pub failed_writes: u64,
}

impl RunDiagnostics {
    pub fn summary(&self) -> String {
        format!(
            "{} frames processed, {} failed; {} malformed detections dropped, \
             {} uncorrelated modules, {} uncorrelated faults, {} failed writes",
            self.frames_processed,
            self.frames_failed,
            self.detections_dropped,
            self.uncorrelated_modules,
            self.uncorrelated_faults,
            self.failed_writes
        )
    }
}

/// Sequences one frame at a time through the three detectors, the
/// correlation engine, the compositor, and the artifact sink.
pub struct RunPipeline<R: Renderer, S: ArtifactSink> {
    panel_backend: Box<dyn DetectorBackend>,
    fault_backend: Box<dyn DetectorBackend>,
    module_backend: Box<dyn DetectorBackend>,
    compositor: LayerCompositor<R>,
    sink: S,
    save_txt: bool,
    save_conf: bool,
    timings: StageTimings,
    diagnostics: RunDiagnostics,
}

impl<R: Renderer, S: ArtifactSink> RunPipeline<R, S> {
    pub fn new(
        panel_backend: Box<dyn DetectorBackend>,
        fault_backend: Box<dyn DetectorBackend>,
        module_backend: Box<dyn DetectorBackend>,
        compositor: LayerCompositor<R>,
        sink: S,
    ) -> Self {
        Self {
            panel_backend,
            fault_backend,
            module_backend,
            compositor,
            sink,
            save_txt: false,
            save_conf: false,
            timings: StageTimings::default(),
            diagnostics: RunDiagnostics::default(),
        }
    }

    /// Also export label text files (`class_id cx cy w h [score]`).
    pub fn with_label_export(mut self, save_txt: bool, save_conf: bool) -> Self {
        self.save_txt = save_txt;
        self.save_conf = save_conf;
        self
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.panel_backend.warm_up().context("panel backend warm-up")?;
        self.fault_backend.warm_up().context("fault backend warm-up")?;
        self.module_backend
            .warm_up()
            .context("module backend warm-up")?;
        Ok(())
    }

    pub fn diagnostics(&self) -> RunDiagnostics {
        self.diagnostics
    }

    pub fn timings(&self) -> StageTimings {
        self.timings
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Drain a source. Detector and decode failures abort only the frame
    /// they occur in; the run continues.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> Result<()> {
        loop {
            let fetch_start = Instant::now();
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::error!("frame decode failed: {e:#}");
                    self.diagnostics.frames_failed += 1;
                    continue;
                }
            };
            self.timings.pre_process += fetch_start.elapsed();

            match self.process_frame(&frame) {
                Ok(result) => {
                    let defective = result.correlation.defective_panel_count();
                    log::info!(
                        "frame {}: {} panels ({} defective), {} modules, {} faults correlated",
                        result.frame_id,
                        result.correlation.panels.len(),
                        defective,
                        result
                            .correlation
                            .panels
                            .iter()
                            .map(|p| p.contained_modules.len())
                            .sum::<usize>(),
                        result
                            .correlation
                            .panels
                            .iter()
                            .map(|p| p.contained_faults.len())
                            .sum::<usize>(),
                    );
                }
                Err(e) => {
                    log::error!("frame {} aborted: {e:#}", frame.id);
                    self.diagnostics.frames_failed += 1;
                }
            }
        }

        log::info!("{}", self.timings.summary());
        log::info!("{}", self.diagnostics.summary());
        Ok(())
    }

    /// Run one frame end to end. An `Err` here means a detector failed and
    /// the frame produced no output; persistence failures are counted, not
    /// returned.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameResult> {
        let infer_start = Instant::now();
        // Fixed invocation order: panel, fault, module.
        let panels = self
            .panel_backend
            .infer(&frame.image)
            .context("panel detector failed")?;
        let faults = self
            .fault_backend
            .infer(&frame.image)
            .context("fault detector failed")?;
        let modules = self
            .module_backend
            .infer(&frame.image)
            .context("module detector failed")?;
        self.timings.inference += infer_start.elapsed();

        let post_start = Instant::now();
        let panel_set = DetectionSet::from_raw(self.sanitize(panels, DetectorRole::Panel));
        let fault_set = DetectionSet::from_raw(self.sanitize(faults, DetectorRole::Fault));
        let module_set = DetectionSet::from_raw(self.sanitize(modules, DetectorRole::Module));

        let correlation = CorrelationEngine::correlate(&panel_set, &module_set, &fault_set);
        self.diagnostics.uncorrelated_modules += correlation.uncorrelated_modules.len() as u64;
        self.diagnostics.uncorrelated_faults += correlation.uncorrelated_faults.len() as u64;

        let layers = self.compositor.compose(&frame.image, &correlation);

        self.persist(&frame.id, &frame.image, &layers, &panel_set, &fault_set, &module_set);
        self.timings.post_process += post_start.elapsed();
        self.timings.frames += 1;
        self.diagnostics.frames_processed += 1;

        Ok(FrameResult {
            frame_id: frame.id.clone(),
            correlation,
            layers,
        })
    }

    /// Drop detections whose boxes violate the geometry invariant; the rest
    /// of the frame proceeds.
    fn sanitize(&mut self, detections: Vec<Detection>, role: DetectorRole) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|d| {
                match Rect::new(d.rect.x1, d.rect.y1, d.rect.x2, d.rect.y2) {
                    Ok(_) => true,
                    Err(e) => {
                        log::warn!("dropping malformed {} detection: {}", role.as_str(), e);
                        self.diagnostics.detections_dropped += 1;
                        false
                    }
                }
            })
            .collect()
    }

    /// Write failures are reported and counted; the in-memory result stays
    /// valid and the frame still counts as processed.
    fn persist(
        &mut self,
        id: &FrameId,
        image: &RgbImage,
        layers: &FrameLayers,
        panel_set: &DetectionSet,
        fault_set: &DetectionSet,
        module_set: &DetectionSet,
    ) {
        let writes = [
            (Layer::Panel, &layers.panel_layer),
            (Layer::Module, &layers.module_layer),
            (Layer::Anomaly, &layers.anomaly_layer),
        ];
        for (layer, raster) in writes {
            if let Err(e) = self.sink.save_layer(id, layer, raster) {
                log::error!("failed to write {:?} layer for {}: {}", layer, id, e);
                self.diagnostics.failed_writes += 1;
            }
        }

        if self.save_txt {
            let all: Vec<&Detection> = panel_set
                .iter()
                .chain(fault_set.iter())
                .chain(module_set.iter())
                .collect();
            let lines = label_lines(&all, image.width(), image.height(), self.save_conf);
            if let Err(e) = self.sink.save_labels(id, &lines) {
                log::error!("failed to write labels for {}: {}", id, e);
                self.diagnostics.failed_writes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::LayerCompositor;
    use crate::detect::StubBackend;
    use crate::ingest::SyntheticSource;
    use crate::output::InMemoryArtifactWriter;
    use crate::render::RasterRenderer;

    fn stub_pipeline() -> RunPipeline<RasterRenderer, InMemoryArtifactWriter> {
        RunPipeline::new(
            Box::new(StubBackend::for_role(DetectorRole::Panel)),
            Box::new(StubBackend::for_role(DetectorRole::Fault)),
            Box::new(StubBackend::for_role(DetectorRole::Module)),
            LayerCompositor::new(RasterRenderer::without_font()),
            InMemoryArtifactWriter::new(),
        )
    }

    #[test]
    fn one_frame_produces_three_layers() {
        let mut pipeline = stub_pipeline();
        let mut source = SyntheticSource::new("t", 1, 96, 64);
        pipeline.run(&mut source).unwrap();

        let diagnostics = pipeline.diagnostics();
        assert_eq!(diagnostics.frames_processed, 1);
        assert_eq!(diagnostics.frames_failed, 0);

        let sink = pipeline.into_sink();
        let names: Vec<&str> = sink.layers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "t_0000_panel_detection.png",
                "t_0000_panel_block_detection.png",
                "t_0000_anomaly_detection.png",
            ]
        );
    }

    #[test]
    fn detector_failure_aborts_only_that_frame() {
        struct FailingBackend;
        impl DetectorBackend for FailingBackend {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn infer(&mut self, _: &RgbImage) -> Result<Vec<Detection>> {
                Err(anyhow::anyhow!("weights corrupted"))
            }
        }

        let mut pipeline = RunPipeline::new(
            Box::new(FailingBackend),
            Box::new(StubBackend::for_role(DetectorRole::Fault)),
            Box::new(StubBackend::for_role(DetectorRole::Module)),
            LayerCompositor::new(RasterRenderer::without_font()),
            InMemoryArtifactWriter::new(),
        );
        let mut source = SyntheticSource::new("t", 3, 96, 64);
        pipeline.run(&mut source).unwrap();

        let diagnostics = pipeline.diagnostics();
        assert_eq!(diagnostics.frames_processed, 0);
        assert_eq!(diagnostics.frames_failed, 3);
        assert!(pipeline.into_sink().layers.is_empty());
    }

    #[test]
    fn malformed_detection_is_dropped_not_fatal() {
        // An inverted box smuggled past `Rect::new` via struct literal.
        let bad = Detection::new(
            Rect {
                x1: 50.0,
                y1: 0.0,
                x2: 10.0,
                y2: 10.0,
            },
            0.9,
            0,
        );
        let good_rect = Rect::new(0.0, 0.0, 90.0, 60.0).unwrap();
        let mut pipeline = RunPipeline::new(
            Box::new(StubBackend::fixed(
                DetectorRole::Panel,
                vec![Detection::new(good_rect, 0.9, 0), bad],
            )),
            Box::new(StubBackend::fixed(DetectorRole::Fault, vec![])),
            Box::new(StubBackend::fixed(DetectorRole::Module, vec![])),
            LayerCompositor::new(RasterRenderer::without_font()),
            InMemoryArtifactWriter::new(),
        );
        let mut source = SyntheticSource::new("t", 1, 96, 64);
        pipeline.run(&mut source).unwrap();

        let diagnostics = pipeline.diagnostics();
        assert_eq!(diagnostics.frames_processed, 1);
        assert_eq!(diagnostics.detections_dropped, 1);
    }

    #[test]
    fn label_export_writes_upstream_format() {
        let panel = Detection::new(Rect::new(10.0, 20.0, 30.0, 60.0).unwrap(), 0.875, 1);
        let mut pipeline = RunPipeline::new(
            Box::new(StubBackend::fixed(DetectorRole::Panel, vec![panel])),
            Box::new(StubBackend::fixed(DetectorRole::Fault, vec![])),
            Box::new(StubBackend::fixed(DetectorRole::Module, vec![])),
            LayerCompositor::new(RasterRenderer::without_font()),
            InMemoryArtifactWriter::new(),
        )
        .with_label_export(true, true);

        let mut source = SyntheticSource::new("t", 1, 100, 200);
        pipeline.run(&mut source).unwrap();

        let sink = pipeline.into_sink();
        assert_eq!(
            sink.labels.get("t_0000").map(Vec::as_slice),
            Some(&["1 0.2 0.2 0.2 0.2 0.875".to_string()][..])
        );
    }
}
