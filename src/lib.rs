//! Hand-sign gesture classification.
//!
//! This crate turns a still image or a sampled video into a single structured
//! answer using a pretrained classification model.
//!
//! # Architecture
//!
//! The pipeline is a single parameterised core:
//!
//! 1. **Frame Preprocessor** (`frame`): decoded raster -> fixed-shape `[1, H, W, C]` tensor in `[0, 1]`.
//! 2. **Classifier Adapter** (`classify`): loaded once, `classify(tensor) -> score vector`.
//! 3. **Image Detector** (`detect::ImageDetector`): one preprocess + classify pass, argmax, label mapping.
//! 4. **Video Detector** (`detect::VideoDetector`): fixed-interval sampling + max-confidence aggregation.
//! 5. **Worker Loop** (`worker`): loads the classifier once, then serves newline-delimited JSON requests.
//!
//! # Module Structure
//!
//! - `config`: pipeline presets, config file + environment layering
//! - `error`: the error taxonomy shared by every component
//! - `ingest`: sequential video frame sources (GIF, FFmpeg)
//! - `detect`: label set, detectors, result types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod classify;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod worker;

pub use classify::{Classifier, StubClassifier, TractClassifier};
pub use config::{PipelineConfig, PipelineKind, WorkerConfig};
pub use detect::{
    select_best, DetectionResult, FrameDetection, ImageDetection, ImageDetector, LabelSet,
    NoDetections, VideoDetection, VideoDetector,
};
pub use error::{Error, Result};
pub use frame::{ColorMode, FrameTensor, Preprocessor, Roi};
pub use ingest::VideoSource;
pub use worker::{ErrorResponse, Request, Worker, READY_MARKER};

/// Kind of media a request refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(Error::MalformedRequest(format!(
                "unsupported type '{}' (expected \"image\" or \"video\")",
                other
            ))),
        }
    }
}
