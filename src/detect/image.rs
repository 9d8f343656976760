use std::path::Path;
use std::time::Instant;

use image::RgbImage;

use crate::classify::Classifier;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::frame::{decode_image, FrameTensor, Preprocessor};
use crate::MediaType;

use super::labels::top_class;
use super::result::{FrameDetection, ImageDetection};

/// Single-image detector: preprocess, classify, map the top class to a label.
pub struct ImageDetector<'a> {
    classifier: &'a dyn Classifier,
    pipeline: &'a PipelineConfig,
    preprocessor: Preprocessor,
}

impl<'a> ImageDetector<'a> {
    pub fn new(classifier: &'a dyn Classifier, pipeline: &'a PipelineConfig) -> Self {
        Self {
            classifier,
            pipeline,
            preprocessor: pipeline.preprocessor(),
        }
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        self.pipeline
    }

    /// Decode the file at `path` and classify it.
    pub fn detect_image(&self, path: &Path) -> Result<ImageDetection> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let started = Instant::now();
        let image = decode_image(path)?;
        let detection = self.detect_raster(&image)?;
        log::debug!(
            "image {} -> {} ({:.3}) in {:.2?}",
            path.display(),
            detection.sign,
            detection.confidence,
            started.elapsed()
        );
        Ok(detection)
    }

    /// Classify an already decoded raster.
    pub fn detect_raster(&self, image: &RgbImage) -> Result<ImageDetection> {
        let tensor = self.preprocessor.preprocess_image(image)?;
        let scores = self.classifier.classify(tensor)?;
        let (index, confidence) = self.top(&scores)?;
        Ok(ImageDetection {
            sign: self.pipeline.labels.label_for(index),
            confidence,
            predictions: scores,
            media_type: MediaType::Image,
        })
    }

    /// Classify one video frame (region-of-interest crop applies).
    pub(crate) fn detect_frame(&self, frame: &RgbImage, index: u64) -> Result<FrameDetection> {
        let tensor = self.preprocessor.preprocess_frame(frame)?;
        let (label_index, confidence) = self.classify(tensor)?;
        Ok(FrameDetection {
            frame: index,
            sign: self.pipeline.labels.label_for(label_index),
            confidence,
        })
    }

    fn classify(&self, tensor: FrameTensor) -> Result<(usize, f32)> {
        let scores = self.classifier.classify(tensor)?;
        self.top(&scores)
    }

    fn top(&self, scores: &[f32]) -> Result<(usize, f32)> {
        top_class(scores).ok_or_else(|| {
            Error::Detection(format!(
                "classifier '{}' produced no usable scores ({} values)",
                self.classifier.name(),
                scores.len()
            ))
        })
    }
}
