//! solarscan - solar panel inspection CLI
//!
//! Runs one frame at a time through:
//! 1. the three detectors (panel, fault, module)
//! 2. midpoint correlation (modules/faults assigned to panels)
//! 3. layer compositing (panel / module / anomaly views)
//! 4. artifact persistence under an incrementing run directory

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

use solarscan::config::ModelSettings;
use solarscan::ui::Ui;
use solarscan::{
    ClassNames, DetectorBackend, DetectorRole, FilesystemArtifactWriter, FrameSource,
    ImageDirSource, LayerCompositor, LayerStyle, RasterRenderer, RunPipeline, ScanConfig,
    StubBackend, SyntheticSource,
};

#[derive(Debug, Parser)]
#[command(name = "solarscan", about = "Correlate panel, module and fault detections into annotated layers")]
struct Cli {
    /// Image file, directory of images, or stub://<name>
    #[arg(long)]
    source: Option<String>,

    /// Output project directory
    #[arg(long)]
    project: Option<PathBuf>,

    /// Run name under the project directory
    #[arg(long)]
    name: Option<String>,

    /// Reuse an existing run directory instead of incrementing
    #[arg(long)]
    exist_ok: bool,

    /// Export label text files alongside the layers
    #[arg(long)]
    save_txt: bool,

    /// Include confidence in exported labels
    #[arg(long)]
    save_conf: bool,

    /// Append scores to panel labels
    #[arg(long)]
    show_scores: bool,

    /// Box stroke thickness in pixels
    #[arg(long)]
    line_thickness: Option<u32>,

    /// TTF/OTF font for label text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Progress output: auto, plain, pretty
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let ui = Ui::from_flag(cli.ui.as_deref(), std::io::stderr().is_terminal());

    let mut cfg = ScanConfig::load()?;
    apply_cli(&mut cfg, &cli);

    log::info!("solarscan {} starting", env!("CARGO_PKG_VERSION"));
    log::info!("source: {}", cfg.source);

    let mut source = build_source(&cfg.source)?;

    let renderer = RasterRenderer::with_font_path(cfg.render.font_path.as_deref());
    let compositor = LayerCompositor::new(renderer)
        .with_style(LayerStyle::default().with_line_thickness(cfg.render.line_thickness))
        .with_panel_classes(ClassNames::new(cfg.classes.panel.clone()))
        .with_show_scores(cfg.render.show_scores);

    let writer = FilesystemArtifactWriter::create(
        &cfg.output.project,
        &cfg.output.name,
        cfg.output.exist_ok,
    )?;
    let run_dir = writer.run_dir().to_path_buf();
    log::info!("writing results to {}", run_dir.display());

    let mut pipeline = RunPipeline::new(
        build_backend(DetectorRole::Panel, &cfg.models)?,
        build_backend(DetectorRole::Fault, &cfg.models)?,
        build_backend(DetectorRole::Module, &cfg.models)?,
        compositor,
        writer,
    )
    .with_label_export(cfg.output.save_txt, cfg.output.save_conf);

    {
        let _stage = ui.stage("warm up detectors");
        pipeline.warm_up()?;
    }

    {
        let _stage = ui.stage("scan frames");
        pipeline.run(source.as_mut())?;
    }

    let diagnostics = pipeline.diagnostics();
    if diagnostics.frames_processed == 0 && diagnostics.frames_failed > 0 {
        return Err(anyhow!("no frame completed; see log for per-frame errors"));
    }
    log::info!("results saved to {}", run_dir.display());
    Ok(())
}

fn apply_cli(cfg: &mut ScanConfig, cli: &Cli) {
    if let Some(source) = &cli.source {
        cfg.source = source.clone();
    }
    if let Some(project) = &cli.project {
        cfg.output.project = project.clone();
    }
    if let Some(name) = &cli.name {
        cfg.output.name = name.clone();
    }
    if cli.exist_ok {
        cfg.output.exist_ok = true;
    }
    if cli.save_txt {
        cfg.output.save_txt = true;
    }
    if cli.save_conf {
        cfg.output.save_conf = true;
    }
    if cli.show_scores {
        cfg.render.show_scores = true;
    }
    if let Some(thickness) = cli.line_thickness {
        cfg.render.line_thickness = thickness;
    }
    if let Some(font) = &cli.font {
        cfg.render.font_path = Some(font.clone());
    }
}

fn build_source(source: &str) -> Result<Box<dyn FrameSource>> {
    if let Some(name) = source.strip_prefix("stub://") {
        let name = if name.is_empty() { "farm" } else { name };
        return Ok(Box::new(SyntheticSource::new(name, 8, 640, 480)));
    }
    Ok(Box::new(ImageDirSource::new(source)?))
}

#[cfg(feature = "backend-tract")]
fn build_backend(role: DetectorRole, models: &ModelSettings) -> Result<Box<dyn DetectorBackend>> {
    let weights = match role {
        DetectorRole::Panel => &models.panel,
        DetectorRole::Fault => &models.fault,
        DetectorRole::Module => &models.module,
    };
    match weights {
        Some(path) => {
            let backend = solarscan::TractBackend::new(path, 640, 640)?;
            log::info!("{} detector: ONNX weights {}", role.as_str(), path.display());
            Ok(Box::new(backend))
        }
        None => {
            log::warn!("{} detector: no weights configured, using stub", role.as_str());
            Ok(Box::new(StubBackend::for_role(role)))
        }
    }
}

#[cfg(not(feature = "backend-tract"))]
fn build_backend(role: DetectorRole, models: &ModelSettings) -> Result<Box<dyn DetectorBackend>> {
    let configured = match role {
        DetectorRole::Panel => models.panel.is_some(),
        DetectorRole::Fault => models.fault.is_some(),
        DetectorRole::Module => models.module.is_some(),
    };
    if configured {
        log::warn!(
            "{} detector: weights configured but the backend-tract feature is disabled, using stub",
            role.as_str()
        );
    }
    Ok(Box::new(StubBackend::for_role(role)))
}
