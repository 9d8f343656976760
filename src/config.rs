//! Pipeline and worker configuration.
//!
//! Layering, lowest precedence first:
//! 1. Pipeline preset (`grayscale` by default)
//! 2. JSON config file named by `--config` or `SIGN_CONFIG`
//! 3. Environment (`SIGN_*`)
//! 4. Command-line overrides
//!
//! The model artifact is located relative to the installation directory
//! unless an explicit `model_path` is configured.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::detect::LabelSet;
use crate::frame::{ColorMode, Preprocessor, Roi};

const GRAYSCALE_MODEL_FILE: &str = "signlanguagedetectionmodel48x48.onnx";
const COLOR_MODEL_FILE: &str = "model/sign_language_model.onnx";
const GRAYSCALE_TARGET_SIZE: u32 = 48;
const COLOR_TARGET_SIZE: u32 = 224;
const GRAYSCALE_FRAME_INTERVAL: u64 = 10;
const COLOR_FRAME_INTERVAL: u64 = 5;

pub const ENV_CONFIG: &str = "SIGN_CONFIG";
pub const ENV_PIPELINE: &str = "SIGN_PIPELINE";
pub const ENV_BACKEND: &str = "SIGN_BACKEND";
pub const ENV_MODEL_PATH: &str = "SIGN_MODEL_PATH";
pub const ENV_INSTALL_DIR: &str = "SIGN_INSTALL_DIR";
pub const ENV_LABELS: &str = "SIGN_LABELS";
pub const ENV_FRAME_INTERVAL: &str = "SIGN_FRAME_INTERVAL";
pub const ENV_TARGET_SIZE: &str = "SIGN_TARGET_SIZE";

// ----------------------------------------------------------------------------
// Enumerations
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// 48x48 single-channel input, hand ROI crop, six-symbol alphabet.
    #[default]
    Grayscale,
    /// 224x224 BGR input, no crop, generic three-class set.
    Color,
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grayscale" | "gray" => Ok(PipelineKind::Grayscale),
            "color" | "colour" => Ok(PipelineKind::Color),
            other => Err(format!(
                "unknown pipeline '{other}' (expected grayscale or color)"
            )),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Grayscale => f.write_str("grayscale"),
            PipelineKind::Color => f.write_str("color"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// ONNX model executed with tract.
    #[default]
    Tract,
    /// Deterministic synthetic scores; no model file needed.
    Stub,
}

impl FromStr for ClassifierBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tract" | "onnx" => Ok(ClassifierBackend::Tract),
            "stub" => Ok(ClassifierBackend::Stub),
            other => Err(format!(
                "unknown classifier backend '{other}' (expected tract or stub)"
            )),
        }
    }
}

// ----------------------------------------------------------------------------
// PipelineConfig
// ----------------------------------------------------------------------------

/// One preprocessing + classification pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub kind: PipelineKind,
    pub width: u32,
    pub height: u32,
    pub color: ColorMode,
    /// Crop applied to video frames that cover it.
    pub roi: Option<Roi>,
    /// Classify every n-th video frame, starting with frame 0.
    pub frame_interval: u64,
    pub labels: LabelSet,
    /// Model file name, relative to the installation directory.
    pub model_file: PathBuf,
}

impl PipelineConfig {
    pub fn grayscale() -> Self {
        Self {
            kind: PipelineKind::Grayscale,
            width: GRAYSCALE_TARGET_SIZE,
            height: GRAYSCALE_TARGET_SIZE,
            color: ColorMode::Grayscale,
            roi: Some(Roi::HAND),
            frame_interval: GRAYSCALE_FRAME_INTERVAL,
            labels: LabelSet::alphabet(),
            model_file: PathBuf::from(GRAYSCALE_MODEL_FILE),
        }
    }

    pub fn color() -> Self {
        Self {
            kind: PipelineKind::Color,
            width: COLOR_TARGET_SIZE,
            height: COLOR_TARGET_SIZE,
            color: ColorMode::Color,
            roi: None,
            frame_interval: COLOR_FRAME_INTERVAL,
            labels: LabelSet::generic(),
            model_file: PathBuf::from(COLOR_MODEL_FILE),
        }
    }

    pub fn preset(kind: PipelineKind) -> Self {
        match kind {
            PipelineKind::Grayscale => Self::grayscale(),
            PipelineKind::Color => Self::color(),
        }
    }

    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(self.width, self.height, self.color).with_roi(self.roi)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_interval == 0 {
            return Err(anyhow!("frame_interval must be at least 1"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("target size must be non-zero"));
        }
        if self.labels.is_empty() {
            return Err(anyhow!("label set must not be empty"));
        }
        if self.labels.as_slice().iter().any(|l| l.trim().is_empty()) {
            return Err(anyhow!("labels must not be blank"));
        }
        if let Some(roi) = self.roi {
            if !roi.is_valid() {
                return Err(anyhow!("roi must have top < bottom and left < right"));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::grayscale()
    }
}

// ----------------------------------------------------------------------------
// Config file
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct WorkerConfigFile {
    pipeline: Option<PipelineKind>,
    backend: Option<ClassifierBackend>,
    model_path: Option<PathBuf>,
    install_dir: Option<PathBuf>,
    labels: Option<Vec<String>>,
    frame_interval: Option<u64>,
    target_size: Option<u32>,
    crop: Option<bool>,
    roi: Option<Roi>,
}

/// Command-line values layered over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub pipeline: Option<PipelineKind>,
    pub backend: Option<ClassifierBackend>,
    pub model_path: Option<PathBuf>,
}

// ----------------------------------------------------------------------------
// WorkerConfig
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub pipeline: PipelineConfig,
    pub backend: ClassifierBackend,
    /// Resolved model artifact path.
    pub model_path: PathBuf,
}

impl WorkerConfig {
    /// Build a config for `pipeline` with its model resolved under `install_dir`.
    pub fn new(pipeline: PipelineConfig, install_dir: &Path) -> Self {
        let model_path = install_dir.join(&pipeline.model_file);
        Self {
            pipeline,
            backend: ClassifierBackend::Tract,
            model_path,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_with(ConfigOverrides::default())
    }

    pub fn load_with(overrides: ConfigOverrides) -> Result<Self> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| env_value(ENV_CONFIG).map(PathBuf::from));
        let file = match config_path.as_deref() {
            Some(path) => read_config_file(path)?,
            None => WorkerConfigFile::default(),
        };

        let kind = match overrides.pipeline {
            Some(kind) => kind,
            None => match env_value(ENV_PIPELINE) {
                Some(value) => value.parse().map_err(|e: String| anyhow!(e))?,
                None => file.pipeline.unwrap_or_default(),
            },
        };

        let mut pipeline = PipelineConfig::preset(kind);
        let mut backend = file.backend.unwrap_or_default();
        let mut model_path = file.model_path;
        let mut install_dir = file.install_dir;

        if let Some(labels) = file.labels {
            pipeline.labels = LabelSet::new(labels);
        }
        if let Some(interval) = file.frame_interval {
            pipeline.frame_interval = interval;
        }
        if let Some(size) = file.target_size {
            pipeline.width = size;
            pipeline.height = size;
        }
        if let Some(roi) = file.roi {
            pipeline.roi = Some(roi);
        }
        if file.crop == Some(false) {
            pipeline.roi = None;
        }

        apply_env(&mut pipeline, &mut backend, &mut model_path, &mut install_dir)?;

        if let Some(value) = overrides.backend {
            backend = value;
        }
        if let Some(path) = overrides.model_path {
            model_path = Some(path);
        }

        pipeline.validate()?;

        let model_path = match model_path {
            Some(path) => path,
            None => {
                let dir = match install_dir {
                    Some(dir) => dir,
                    None => installation_dir(),
                };
                dir.join(&pipeline.model_file)
            }
        };

        Ok(Self {
            pipeline,
            backend,
            model_path,
        })
    }
}

fn apply_env(
    pipeline: &mut PipelineConfig,
    backend: &mut ClassifierBackend,
    model_path: &mut Option<PathBuf>,
    install_dir: &mut Option<PathBuf>,
) -> Result<()> {
    if let Some(value) = env_value(ENV_BACKEND) {
        *backend = value.parse().map_err(|e: String| anyhow!(e))?;
    }
    if let Some(path) = env_value(ENV_MODEL_PATH) {
        *model_path = Some(PathBuf::from(path));
    }
    if let Some(dir) = env_value(ENV_INSTALL_DIR) {
        *install_dir = Some(PathBuf::from(dir));
    }
    if let Some(labels) = env_value(ENV_LABELS) {
        let parsed = split_csv(&labels);
        if !parsed.is_empty() {
            pipeline.labels = LabelSet::new(parsed);
        }
    }
    if let Some(interval) = env_value(ENV_FRAME_INTERVAL) {
        pipeline.frame_interval = interval
            .parse()
            .map_err(|_| anyhow!("{ENV_FRAME_INTERVAL} must be a positive integer"))?;
    }
    if let Some(size) = env_value(ENV_TARGET_SIZE) {
        let size: u32 = size
            .parse()
            .map_err(|_| anyhow!("{ENV_TARGET_SIZE} must be a positive integer"))?;
        pipeline.width = size;
        pipeline.height = size;
    }
    Ok(())
}

/// Directory holding the running executable; falls back to the working directory.
fn installation_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<WorkerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
