use std::path::Path;

use anyhow::Result;
use image::{Rgb, RgbImage};

use sign_inference::{
    Error, ImageDetector, LabelSet, MediaType, PipelineConfig, StubClassifier,
};

fn write_png(path: &Path, width: u32, height: u32) -> Result<()> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
    });
    img.save(path)?;
    Ok(())
}

#[test]
fn image_detection_is_bounded_and_labelled() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hand.png");
    write_png(&path, 320, 240)?;

    for pipeline in [PipelineConfig::grayscale(), PipelineConfig::color()] {
        let stub = StubClassifier::new(pipeline.labels.len());
        let detector = ImageDetector::new(&stub, &pipeline);
        let detection = detector.detect_image(&path)?;

        assert!((0.0..=1.0).contains(&detection.confidence));
        assert!(pipeline.labels.as_slice().contains(&detection.sign));
        assert_eq!(detection.predictions.len(), pipeline.labels.len());
        assert_eq!(detection.media_type, MediaType::Image);
        assert_eq!(stub.calls(), 1);
    }
    Ok(())
}

#[test]
fn repeated_detection_is_identical() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hand.png");
    write_png(&path, 64, 64)?;

    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::default();
    let detector = ImageDetector::new(&stub, &pipeline);

    let first = detector.detect_image(&path)?;
    let second = detector.detect_image(&path)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn format_is_sniffed_not_taken_from_extension() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let png = dir.path().join("upload.png");
    write_png(&png, 48, 48)?;
    let renamed = dir.path().join("upload.tmp");
    std::fs::rename(&png, &renamed)?;

    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::default();
    let detector = ImageDetector::new(&stub, &pipeline);
    detector.detect_image(&renamed)?;
    Ok(())
}

#[test]
fn undecodable_file_is_image_read_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"\xff\xd8 truncated")?;

    let pipeline = PipelineConfig::grayscale();
    let stub = StubClassifier::default();
    let detector = ImageDetector::new(&stub, &pipeline);

    let err = detector.detect_image(&path).unwrap_err();
    assert!(matches!(err, Error::ImageRead { .. }));
    assert_eq!(stub.calls(), 0);
    Ok(())
}

#[test]
fn custom_label_set_is_used() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hand.png");
    write_png(&path, 48, 48)?;

    let mut pipeline = PipelineConfig::grayscale();
    pipeline.labels = LabelSet::new(["Hello", "Thanks"]);
    let stub = StubClassifier::fixed(vec![0.25, 0.75]);
    let detector = ImageDetector::new(&stub, &pipeline);

    let detection = detector.detect_image(&path)?;
    assert_eq!(detection.sign, "Thanks");
    assert_eq!(detection.confidence, 0.75);
    Ok(())
}
