use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use image::codecs::gif::GifEncoder;
use image::{Frame, Rgb, RgbImage, Rgba, RgbaImage};

use sign_inference::ingest::FrameSource;
use sign_inference::{
    Classifier, DetectionResult, FrameTensor, ImageDetector, PipelineConfig, StubClassifier,
    VideoDetector,
};

fn write_gif(path: &Path, frames: usize) -> Result<()> {
    let mut encoder = GifEncoder::new(File::create(path)?);
    for i in 0..frames {
        let shade = (i * 10 % 250) as u8;
        let img = RgbaImage::from_pixel(16, 16, Rgba([shade, 255 - shade, 64, 255]));
        encoder.encode_frame(Frame::new(img))?;
    }
    Ok(())
}

/// Call `n` scores `confidences[n]` for label `n`, zero for every other label.
struct ScriptedClassifier {
    confidences: Vec<f32>,
    calls: AtomicUsize,
}

impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn classify(&self, _tensor: FrameTensor) -> sign_inference::Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut scores = vec![0.0; 6];
        scores[call % 6] = self.confidences.get(call).copied().unwrap_or(0.0);
        Ok(scores)
    }
}

/// In-memory source that records when it is released.
struct SyntheticSource {
    remaining: usize,
    fail_after: Option<usize>,
    served: usize,
    released: Arc<AtomicBool>,
}

impl SyntheticSource {
    fn new(frames: usize, released: Arc<AtomicBool>) -> Self {
        Self {
            remaining: frames,
            fail_after: None,
            served: 0,
            released,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> sign_inference::Result<Option<RgbImage>> {
        if self.fail_after == Some(self.served) {
            return Err(sign_inference::Error::Detection("corrupt frame".into()));
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.served += 1;
        Ok(Some(RgbImage::from_pixel(32, 32, Rgb([90, 90, 90]))))
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[test]
fn gif_video_is_sampled_every_nth_frame() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("clip.gif");
    write_gif(&path, 23)?;

    let mut pipeline = PipelineConfig::grayscale();
    pipeline.frame_interval = 5;
    let stub = StubClassifier::new(pipeline.labels.len());
    let detector = VideoDetector::new(ImageDetector::new(&stub, &pipeline));

    let result = detector.detect_video(&path)?;
    assert_eq!(stub.calls(), 5);

    let DetectionResult::Video(video) = result else {
        panic!("expected a video detection, got {result:?}");
    };
    assert_eq!(video.frames_processed, 23);
    let frames: Vec<u64> = video.detections.iter().map(|d| d.frame).collect();
    assert_eq!(frames, vec![0, 5, 10, 15, 20]);
    assert!(pipeline.labels.as_slice().contains(&video.sign));
    assert!((0.0..=1.0).contains(&video.confidence));

    // Nothing holds the file open once the result is back.
    std::fs::remove_file(&path)?;
    assert!(!path.exists());
    Ok(())
}

#[test]
fn most_confident_sample_wins_and_ties_keep_first() -> Result<()> {
    let pipeline = PipelineConfig::grayscale();
    let classifier = ScriptedClassifier {
        confidences: vec![0.2, 0.9, 0.9, 0.5],
        calls: AtomicUsize::new(0),
    };
    let detector =
        VideoDetector::with_interval(ImageDetector::new(&classifier, &pipeline), 5);

    let released = Arc::new(AtomicBool::new(false));
    let result = detector.detect_source(SyntheticSource::new(20, released.clone()))?;

    let DetectionResult::Video(video) = result else {
        panic!("expected a video detection, got {result:?}");
    };
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 4);
    assert_eq!(video.detections.len(), 4);
    let frames: Vec<u64> = video.detections.iter().map(|d| d.frame).collect();
    assert_eq!(frames, vec![0, 5, 10, 15]);
    // Frames 5 and 10 tie at 0.9; the earlier one (label "M") wins over "N".
    assert_eq!(video.confidence, 0.9);
    assert_eq!(video.sign, "M");
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn zero_frame_source_reports_no_detections() -> Result<()> {
    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::default();
    let detector = VideoDetector::new(ImageDetector::new(&stub, &pipeline));

    let released = Arc::new(AtomicBool::new(false));
    let result = detector.detect_source(SyntheticSource::new(0, released.clone()))?;

    let DetectionResult::NoDetections(none) = &result else {
        panic!("expected no detections, got {result:?}");
    };
    assert_eq!(none.frames_processed, 0);
    assert_eq!(
        serde_json::to_value(&result)?,
        serde_json::json!({"error": "No detections", "type": "video", "frames_processed": 0})
    );
    assert_eq!(stub.calls(), 0);
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn short_video_still_classifies_first_frame() -> Result<()> {
    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::default();
    let detector = VideoDetector::new(ImageDetector::new(&stub, &pipeline));
    assert_eq!(detector.frame_interval(), 10);

    let released = Arc::new(AtomicBool::new(false));
    let result = detector.detect_source(SyntheticSource::new(3, released))?;

    let DetectionResult::Video(video) = result else {
        panic!("expected a video detection, got {result:?}");
    };
    assert_eq!(video.frames_processed, 3);
    assert_eq!(video.detections.len(), 1);
    assert_eq!(video.detections[0].frame, 0);
    Ok(())
}

#[test]
fn decode_error_mid_stream_keeps_earlier_samples() -> Result<()> {
    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::default();
    let detector = VideoDetector::with_interval(ImageDetector::new(&stub, &pipeline), 2);

    let released = Arc::new(AtomicBool::new(false));
    let mut source = SyntheticSource::new(10, released.clone());
    source.fail_after = Some(5);
    let result = detector.detect_source(source)?;

    let DetectionResult::Video(video) = result else {
        panic!("expected a video detection, got {result:?}");
    };
    assert_eq!(video.frames_processed, 5);
    assert_eq!(stub.calls(), 3);
    assert!(released.load(Ordering::SeqCst));
    Ok(())
}

#[test]
fn classifier_failure_still_releases_source() {
    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::fixed(Vec::new());
    let detector = VideoDetector::new(ImageDetector::new(&stub, &pipeline));

    let released = Arc::new(AtomicBool::new(false));
    let result = detector.detect_source(SyntheticSource::new(4, released.clone()));

    let err = result.unwrap_err();
    assert_eq!(err.kind(), "detection_error");
    assert!(released.load(Ordering::SeqCst));
}
