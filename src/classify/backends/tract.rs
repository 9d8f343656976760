use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;

use crate::classify::backend::Classifier;
use crate::error::{Error, Result};
use crate::frame::FrameTensor;

/// Tract-based classifier for ONNX models.
///
/// Loads a local model file with a fixed `[1, H, W, C]` f32 input and returns
/// the first output tensor, flattened, as the score vector.
pub struct TractClassifier {
    model: TypedRunnableModel<TypedModel>,
    input_shape: [usize; 4],
    path: PathBuf,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P, input_shape: [usize; 4]) -> Result<Self> {
        let path = model_path.as_ref();
        if !path.is_file() {
            return Err(Error::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let [n, h, w, c] = input_shape;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| Error::model_load(path, format!("failed to parse ONNX model: {e}")))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(n, h, w, c)),
            )
            .map_err(|e| Error::model_load(path, format!("failed to set input fact: {e}")))?
            .into_optimized()
            .map_err(|e| Error::model_load(path, format!("failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| Error::model_load(path, format!("failed to build runnable model: {e}")))?;

        Ok(Self {
            model,
            input_shape,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Classifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn classify(&self, tensor: FrameTensor) -> Result<Vec<f32>> {
        if tensor.shape() != self.input_shape {
            return Err(Error::Detection(format!(
                "tensor shape {:?} does not match model input {:?}",
                tensor.shape(),
                self.input_shape
            )));
        }

        let outputs = self
            .model
            .run(tvec!(tensor.into_tensor().into()))
            .map_err(|e| Error::Detection(format!("inference failed: {e}")))?;
        let output = outputs
            .first()
            .ok_or_else(|| Error::Detection("model produced no outputs".into()))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Detection(format!("model output tensor was not f32: {e}")))?;

        Ok(scores.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_reported_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.onnx");
        match TractClassifier::load(&path, [1, 48, 48, 1]) {
            Err(Error::ModelNotFound { path: reported }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("loading a missing model must fail"),
        }
    }

    #[test]
    fn malformed_model_is_reported_as_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.onnx");
        std::fs::write(&path, b"this is not a protobuf graph").unwrap();
        assert!(matches!(
            TractClassifier::load(&path, [1, 48, 48, 1]),
            Err(Error::ModelLoad { .. })
        ));
    }
}
