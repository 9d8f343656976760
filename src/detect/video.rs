use std::path::Path;
use std::time::Instant;

use crate::error::Result;
use crate::ingest::{FrameSource, VideoSource};
use crate::MediaType;

use super::image::ImageDetector;
use super::result::{DetectionResult, FrameDetection, NoDetections, VideoDetection};

/// Video detector: classifies every `frame_interval`-th frame and keeps the
/// most confident one.
pub struct VideoDetector<'a> {
    image: ImageDetector<'a>,
    frame_interval: u64,
}

impl<'a> VideoDetector<'a> {
    /// Uses the pipeline's configured frame interval.
    pub fn new(image: ImageDetector<'a>) -> Self {
        let frame_interval = image.pipeline().frame_interval;
        Self::with_interval(image, frame_interval)
    }

    pub fn with_interval(image: ImageDetector<'a>, frame_interval: u64) -> Self {
        Self {
            image,
            frame_interval: frame_interval.max(1),
        }
    }

    pub fn frame_interval(&self) -> u64 {
        self.frame_interval
    }

    /// Open the video at `path` and classify its sampled frames.
    pub fn detect_video(&self, path: &Path) -> Result<DetectionResult> {
        let started = Instant::now();
        let source = VideoSource::open(path)?;
        let result = self.detect_source(source)?;
        log::debug!(
            "video {} -> {:?} in {:.2?}",
            path.display(),
            result.sign(),
            started.elapsed()
        );
        Ok(result)
    }

    /// Classify the sampled frames of an already open source.
    ///
    /// The source is consumed and released before this returns, on every path.
    pub fn detect_source<S: FrameSource>(&self, mut source: S) -> Result<DetectionResult> {
        let mut frame_count: u64 = 0;
        let mut detections = Vec::new();

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    log::warn!(
                        "video decode stopped after {} frames: {}",
                        frame_count,
                        err
                    );
                    break;
                }
            };
            if frame_count % self.frame_interval == 0 {
                detections.push(self.image.detect_frame(&frame, frame_count)?);
            }
            frame_count += 1;
        }
        source.close();

        log::debug!(
            "sampled {} of {} frames (interval {})",
            detections.len(),
            frame_count,
            self.frame_interval
        );

        let Some(best) = select_best(&detections) else {
            return Ok(DetectionResult::NoDetections(NoDetections::new(frame_count)));
        };
        let (sign, confidence) = (best.sign.clone(), best.confidence);
        Ok(DetectionResult::Video(VideoDetection {
            sign,
            confidence,
            frames_processed: frame_count,
            detections,
            media_type: MediaType::Video,
        }))
    }
}

/// Highest-confidence detection; ties go to the earliest frame.
pub fn select_best(detections: &[FrameDetection]) -> Option<&FrameDetection> {
    let mut best: Option<&FrameDetection> = None;
    for detection in detections {
        if detection.confidence.is_nan() {
            continue;
        }
        match best {
            Some(current) if detection.confidence <= current.confidence => {}
            _ => best = Some(detection),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64, confidence: f32) -> FrameDetection {
        FrameDetection {
            frame: index,
            sign: format!("S{index}"),
            confidence,
        }
    }

    #[test]
    fn select_best_breaks_ties_by_first_frame() {
        let detections = vec![frame(0, 0.2), frame(5, 0.9), frame(10, 0.9), frame(15, 0.5)];
        assert_eq!(select_best(&detections).unwrap().frame, 5);
    }

    #[test]
    fn select_best_of_nothing_is_none() {
        assert!(select_best(&[]).is_none());
    }
}
