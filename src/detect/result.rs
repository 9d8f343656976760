use serde::{Deserialize, Serialize};

use crate::MediaType;

/// Marker carried by a video result in which no frame was classified.
pub const NO_DETECTIONS: &str = "No detections";

/// Result of classifying a single still image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageDetection {
    pub sign: String,
    pub confidence: f32,
    /// Full score vector, index-aligned with the label set.
    pub predictions: Vec<f32>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// Classification of one sampled video frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDetection {
    /// Zero-based index of the frame in the source video.
    pub frame: u64,
    pub sign: String,
    pub confidence: f32,
}

/// Aggregated result for a video with at least one sampled frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoDetection {
    pub sign: String,
    pub confidence: f32,
    /// Total frames read from the source, sampled or not.
    pub frames_processed: u64,
    /// Every sampled frame, in frame order.
    pub detections: Vec<FrameDetection>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

/// Terminal video outcome when no frame could be classified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoDetections {
    pub error: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub frames_processed: u64,
}

impl NoDetections {
    pub fn new(frames_processed: u64) -> Self {
        Self {
            error: NO_DETECTIONS.to_string(),
            media_type: MediaType::Video,
            frames_processed,
        }
    }
}

/// Terminal output of one request. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectionResult {
    Image(ImageDetection),
    Video(VideoDetection),
    NoDetections(NoDetections),
}

impl DetectionResult {
    pub fn sign(&self) -> Option<&str> {
        match self {
            DetectionResult::Image(d) => Some(&d.sign),
            DetectionResult::Video(d) => Some(&d.sign),
            DetectionResult::NoDetections(_) => None,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self {
            DetectionResult::Image(d) => Some(d.confidence),
            DetectionResult::Video(d) => Some(d.confidence),
            DetectionResult::NoDetections(_) => None,
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            DetectionResult::Image(_) => MediaType::Image,
            DetectionResult::Video(_) | DetectionResult::NoDetections(_) => MediaType::Video,
        }
    }
}

impl From<ImageDetection> for DetectionResult {
    fn from(detection: ImageDetection) -> Self {
        DetectionResult::Image(detection)
    }
}
