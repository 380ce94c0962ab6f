use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_SOURCE: &str = "stub://farm";
const DEFAULT_PROJECT: &str = "detect_results";
const DEFAULT_RUN_NAME: &str = "exp";
const DEFAULT_LINE_THICKNESS: u32 = 3;

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    source: Option<String>,
    output: Option<OutputConfigFile>,
    render: Option<RenderConfigFile>,
    models: Option<ModelConfigFile>,
    classes: Option<ClassConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    project: Option<PathBuf>,
    name: Option<String>,
    exist_ok: Option<bool>,
    save_txt: Option<bool>,
    save_conf: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    line_thickness: Option<u32>,
    show_scores: Option<bool>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    panel: Option<PathBuf>,
    fault: Option<PathBuf>,
    module: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassConfigFile {
    panel: Option<Vec<String>>,
    fault: Option<Vec<String>>,
    module: Option<Vec<String>>,
}

/// Resolved scanner configuration.
///
/// Layered like the daemon configs this follows: JSON file (pointed at by
/// `SOLARSCAN_CONFIG`), then environment overrides, then validation. CLI
/// flags are applied on top by the binary.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Image file, directory of images, or `stub://<name>`.
    pub source: String,
    pub output: OutputSettings,
    pub render: RenderSettings,
    pub models: ModelSettings,
    pub classes: ClassSettings,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub project: PathBuf,
    pub name: String,
    pub exist_ok: bool,
    pub save_txt: bool,
    pub save_conf: bool,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub line_thickness: u32,
    pub show_scores: bool,
    pub font_path: Option<PathBuf>,
}

/// Model weight locations, used only by the ONNX backend.
#[derive(Debug, Clone, Default)]
pub struct ModelSettings {
    pub panel: Option<PathBuf>,
    pub fault: Option<PathBuf>,
    pub module: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ClassSettings {
    pub panel: Vec<String>,
    pub fault: Vec<String>,
    pub module: Vec<String>,
}

impl Default for ClassSettings {
    fn default() -> Self {
        Self {
            panel: vec!["panel".to_string()],
            fault: vec!["fault".to_string()],
            module: vec!["module".to_string()],
        }
    }
}

impl ScanConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SOLARSCAN_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScanConfigFile) -> Self {
        let output = file.output.unwrap_or_default();
        let render = file.render.unwrap_or_default();
        let models = file.models.unwrap_or_default();
        let classes = file.classes.unwrap_or_default();
        let class_defaults = ClassSettings::default();
        Self {
            source: file.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            output: OutputSettings {
                project: output
                    .project
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT)),
                name: output.name.unwrap_or_else(|| DEFAULT_RUN_NAME.to_string()),
                exist_ok: output.exist_ok.unwrap_or(false),
                save_txt: output.save_txt.unwrap_or(false),
                save_conf: output.save_conf.unwrap_or(false),
            },
            render: RenderSettings {
                line_thickness: render.line_thickness.unwrap_or(DEFAULT_LINE_THICKNESS),
                show_scores: render.show_scores.unwrap_or(false),
                font_path: render.font_path,
            },
            models: ModelSettings {
                panel: models.panel,
                fault: models.fault,
                module: models.module,
            },
            classes: ClassSettings {
                panel: classes.panel.unwrap_or(class_defaults.panel),
                fault: classes.fault.unwrap_or(class_defaults.fault),
                module: classes.module.unwrap_or(class_defaults.module),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("SOLARSCAN_SOURCE") {
            if !source.trim().is_empty() {
                self.source = source;
            }
        }
        if let Ok(project) = std::env::var("SOLARSCAN_OUTPUT_DIR") {
            if !project.trim().is_empty() {
                self.output.project = PathBuf::from(project);
            }
        }
        if let Ok(font) = std::env::var("SOLARSCAN_FONT_PATH") {
            if !font.trim().is_empty() {
                self.render.font_path = Some(PathBuf::from(font));
            }
        }
        if let Ok(save_txt) = std::env::var("SOLARSCAN_SAVE_TXT") {
            self.output.save_txt = parse_bool("SOLARSCAN_SAVE_TXT", &save_txt)?;
        }
        if let Ok(save_conf) = std::env::var("SOLARSCAN_SAVE_CONF") {
            self.output.save_conf = parse_bool("SOLARSCAN_SAVE_CONF", &save_conf)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(anyhow!("source must not be empty"));
        }
        if self.output.name.trim().is_empty() {
            return Err(anyhow!("output run name must not be empty"));
        }
        if self.render.line_thickness == 0 {
            return Err(anyhow!("line thickness must be at least 1"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScanConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got {:?}", key, other)),
    }
}
