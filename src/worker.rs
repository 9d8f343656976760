//! Persistent worker loop.
//!
//! Lifecycle: `STARTING -> READY -> (PROCESSING <-> READY)* -> TERMINATED`.
//!
//! The classifier is loaded exactly once. After the readiness marker is
//! written, the worker reads one newline-delimited JSON request at a time and
//! writes exactly one JSON line in reply before reading the next. A bad
//! request never stops the loop; only end of input does.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::classify::{load_classifier, Classifier};
use crate::config::{PipelineConfig, WorkerConfig};
use crate::detect::{DetectionResult, ImageDetector, VideoDetector};
use crate::error::{Error, Result};
use crate::MediaType;

/// First line written once the model is loaded.
pub const READY_MARKER: &str = r#"{"status":"ready"}"#;

// ----------------------------------------------------------------------------
// Wire types
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRequest {
    file: Option<String>,
    #[serde(rename = "type")]
    media_type: Option<String>,
}

/// A validated classification request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub file: PathBuf,
    pub media_type: MediaType,
}

impl Request {
    pub fn new(file: impl Into<PathBuf>, media_type: MediaType) -> Self {
        Self {
            file: file.into(),
            media_type,
        }
    }

    /// Parse one request line. `type` defaults to `image` when absent.
    pub fn parse(line: &str) -> Result<Self> {
        let raw: RawRequest = serde_json::from_str(line)
            .map_err(|e| Error::MalformedRequest(format!("invalid JSON: {e}")))?;
        let file = match raw.file {
            Some(file) if !file.trim().is_empty() => file,
            _ => return Err(Error::MalformedRequest("missing 'file' field".into())),
        };
        let media_type = match raw.media_type.as_deref() {
            None => MediaType::Image,
            Some(value) => value.parse()?,
        };
        Ok(Self::new(file, media_type))
    }
}

/// Error object written in place of a detection result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub media_type: Option<MediaType>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
            path: None,
            file: None,
            media_type: None,
        }
    }

    /// Attach the request the failure belongs to.
    pub fn with_request(mut self, file: &Path, media_type: MediaType) -> Self {
        self.file = Some(file.display().to_string());
        self.media_type = Some(media_type);
        self
    }
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        let mut response = ErrorResponse::new(err.to_string(), err.kind());
        response.path = err.path().map(|p| p.display().to_string());
        response
    }
}

/// Serialise a response as a single JSON line (no trailing newline).
pub fn to_line<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(line) => line,
        Err(e) => {
            log::error!("failed to serialise response: {}", e);
            r#"{"error":"failed to serialise response","kind":"detection_error"}"#.to_string()
        }
    }
}

// ----------------------------------------------------------------------------
// Worker
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Ready,
    Processing,
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Starting => "STARTING",
            WorkerState::Ready => "READY",
            WorkerState::Processing => "PROCESSING",
            WorkerState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Long-lived worker owning the single classifier instance.
pub struct Worker<C> {
    classifier: C,
    pipeline: PipelineConfig,
}

impl Worker<Box<dyn Classifier>> {
    /// STARTING: load the configured classifier.
    ///
    /// On failure a single error line is written to `output` and the error is
    /// returned; the caller is expected to exit non-zero.
    pub fn start<W: Write>(config: &WorkerConfig, output: &mut W) -> anyhow::Result<Self> {
        log::debug!("worker state {}", WorkerState::Starting);
        match load_classifier(config) {
            Ok(classifier) => Ok(Worker::new(classifier, config.pipeline.clone())),
            Err(err) => {
                let mut response = ErrorResponse::from(&err);
                response.error = format!("Worker initialization failed: {err}");
                writeln!(output, "{}", to_line(&response))?;
                output.flush()?;
                Err(err.into())
            }
        }
    }
}

impl<C: Classifier> Worker<C> {
    pub fn new(classifier: C, pipeline: PipelineConfig) -> Self {
        Self {
            classifier,
            pipeline,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Run one validated request through the matching detector.
    pub fn handle(&self, request: &Request) -> Result<DetectionResult> {
        if !request.file.exists() {
            return Err(Error::FileNotFound {
                path: request.file.clone(),
            });
        }
        let image = ImageDetector::new(&self.classifier, &self.pipeline);
        match request.media_type {
            MediaType::Image => image.detect_image(&request.file).map(DetectionResult::from),
            MediaType::Video => VideoDetector::new(image).detect_video(&request.file),
        }
    }

    /// Turn one input line into exactly one output line.
    pub fn handle_line(&self, line: &str) -> String {
        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("rejected request: {}", err);
                return to_line(&ErrorResponse::from(&err));
            }
        };

        log::info!(
            "processing {} request for {}",
            request.media_type,
            request.file.display()
        );
        let started = Instant::now();
        match self.handle(&request) {
            Ok(result) => {
                log::debug!("request completed in {:.2?}", started.elapsed());
                to_line(&result)
            }
            Err(err) => {
                log::warn!("request for {} failed: {}", request.file.display(), err);
                to_line(&ErrorResponse::from(&err).with_request(&request.file, request.media_type))
            }
        }
    }

    /// READY / PROCESSING loop. Writes the readiness marker, then serves until
    /// `input` reaches end of stream. Returns the number of requests served.
    pub fn serve<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> anyhow::Result<u64> {
        writeln!(output, "{READY_MARKER}")?;
        output.flush()?;
        log::info!(
            "worker state {} (pipeline={}, classifier={})",
            WorkerState::Ready,
            self.pipeline.kind,
            self.classifier.name()
        );

        let mut served = 0u64;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            log::debug!("worker state {}", WorkerState::Processing);

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line.trim_end_matches(&['\n', '\r'][..])),
                Err(_) => to_line(&ErrorResponse::from(&Error::MalformedRequest(
                    "request line is not valid UTF-8".into(),
                ))),
            };
            writeln!(output, "{response}")?;
            output.flush()?;
            served += 1;
        }

        log::info!(
            "worker state {} after {} requests (input closed)",
            WorkerState::Terminated,
            served
        );
        Ok(served)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StubClassifier;

    #[test]
    fn request_type_defaults_to_image() {
        let request = Request::parse(r#"{"file": "/tmp/a.png"}"#).unwrap();
        assert_eq!(request, Request::new("/tmp/a.png", MediaType::Image));

        let request = Request::parse(r#"{"file": "/tmp/a.mp4", "type": "video"}"#).unwrap();
        assert_eq!(request.media_type, MediaType::Video);
    }

    #[test]
    fn request_parse_failures_are_malformed() {
        for line in [
            "not json",
            "",
            "42",
            r#"{"type": "image"}"#,
            r#"{"file": ""}"#,
            r#"{"file": "/tmp/a.png", "type": "audio"}"#,
        ] {
            let err = Request::parse(line).unwrap_err();
            assert_eq!(err.kind(), "malformed_request", "line: {line:?}");
        }
    }

    #[test]
    fn missing_file_response_carries_context() {
        let worker = Worker::new(StubClassifier::default(), PipelineConfig::grayscale());
        let line = worker.handle_line(r#"{"file": "/no/such/file.png", "type": "image"}"#);
        let response: ErrorResponse = serde_json::from_str(&line).unwrap();
        assert_eq!(response.kind, "file_not_found");
        assert_eq!(response.path.as_deref(), Some("/no/such/file.png"));
        assert_eq!(response.media_type, Some(MediaType::Image));
        assert_eq!(worker.classifier().calls(), 0);
    }

    #[test]
    fn startup_failure_writes_one_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig::new(PipelineConfig::grayscale(), dir.path());
        let mut out = Vec::new();
        assert!(Worker::start(&config, &mut out).is_err());

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let response: ErrorResponse = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(response.kind, "model_not_found");
        assert!(response.error.starts_with("Worker initialization failed"));
    }

    #[test]
    fn empty_input_emits_only_ready_marker() {
        let worker = Worker::new(StubClassifier::default(), PipelineConfig::grayscale());
        let mut out = Vec::new();
        let served = worker.serve(&b""[..], &mut out).unwrap();
        assert_eq!(served, 0);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{READY_MARKER}\n"));
    }
}
