//! Image and video detectors.
//!
//! Detectors own no state across requests: each call builds its tensors,
//! classifies them with the shared classifier, and returns an immutable
//! `DetectionResult`.

mod image;
mod labels;
mod result;
mod video;

pub use self::image::ImageDetector;
pub use labels::{top_class, LabelSet};
pub use result::{
    DetectionResult, FrameDetection, ImageDetection, NoDetections, VideoDetection, NO_DETECTIONS,
};
pub use video::{select_best, VideoDetector};
