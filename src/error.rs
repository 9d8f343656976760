//! Error taxonomy.
//!
//! Every failure path in the pipeline surfaces as one of these variants. The
//! worker serialises them into per-request error objects; the one-shot binary
//! serialises them and exits non-zero. Only `ModelNotFound` and `ModelLoad`
//! are fatal to a persistent worker, and only at startup.

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Could not read image file {}: {reason}", path.display())]
    ImageRead { path: PathBuf, reason: String },

    #[error("Could not open video {}: {reason}", path.display())]
    VideoOpen { path: PathBuf, reason: String },

    #[error("Model not found at {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("Failed to load model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

impl Error {
    pub fn image_read(path: &Path, reason: impl ToString) -> Self {
        Error::ImageRead {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn video_open(path: &Path, reason: impl ToString) -> Self {
        Error::VideoOpen {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn model_load(path: &Path, reason: impl ToString) -> Self {
        Error::ModelLoad {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable name, emitted as the `kind` field of error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::FileNotFound { .. } => "file_not_found",
            Error::ImageRead { .. } => "image_read_error",
            Error::VideoOpen { .. } => "video_open_error",
            Error::ModelNotFound { .. } => "model_not_found",
            Error::ModelLoad { .. } => "model_load_error",
            Error::Detection(_) => "detection_error",
            Error::MalformedRequest(_) => "malformed_request",
        }
    }

    /// Path the failure refers to, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::FileNotFound { path }
            | Error::ImageRead { path, .. }
            | Error::VideoOpen { path, .. }
            | Error::ModelNotFound { path }
            | Error::ModelLoad { path, .. } => Some(path),
            Error::Detection(_) | Error::MalformedRequest(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let err = Error::FileNotFound {
            path: PathBuf::from("/tmp/missing.png"),
        };
        assert_eq!(err.kind(), "file_not_found");
        assert_eq!(err.to_string(), "File not found: /tmp/missing.png");
        assert_eq!(err.path(), Some(Path::new("/tmp/missing.png")));

        let err = Error::Detection("empty score vector".into());
        assert_eq!(err.kind(), "detection_error");
        assert!(err.path().is_none());
    }

    #[test]
    fn model_errors_carry_the_artifact_path() {
        let err = Error::model_load(Path::new("model.onnx"), "bad graph");
        assert_eq!(err.kind(), "model_load_error");
        assert_eq!(err.path(), Some(Path::new("model.onnx")));
        assert!(err.to_string().contains("bad graph"));
    }
}
