use std::time::Instant;

use crate::config::{ClassifierBackend, WorkerConfig};
use crate::error::Result;
use crate::frame::FrameTensor;

use super::backends::{StubClassifier, TractClassifier};

/// Classifier trait.
///
/// `classify` must be deterministic for a fixed model and input and must not
/// mutate model state; the worker shares one instance across every request.
pub trait Classifier {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Score one `[1, H, W, C]` tensor. Returns one score per model output class.
    fn classify(&self, tensor: FrameTensor) -> Result<Vec<f32>>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn classify(&self, tensor: FrameTensor) -> Result<Vec<f32>> {
        (**self).classify(tensor)
    }
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn classify(&self, tensor: FrameTensor) -> Result<Vec<f32>> {
        (**self).classify(tensor)
    }
}

/// Load the configured classifier. Called once per process.
pub fn load_classifier(config: &WorkerConfig) -> Result<Box<dyn Classifier>> {
    let started = Instant::now();
    let classifier: Box<dyn Classifier> = match config.backend {
        ClassifierBackend::Tract => {
            log::info!("loading model from {}", config.model_path.display());
            let shape = config.pipeline.preprocessor().input_shape();
            Box::new(TractClassifier::load(&config.model_path, shape)?)
        }
        ClassifierBackend::Stub => {
            log::warn!("using stub classifier; results are synthetic");
            Box::new(StubClassifier::new(config.pipeline.labels.len()))
        }
    };
    log::info!(
        "classifier '{}' ready in {:.2?}",
        classifier.name(),
        started.elapsed()
    );
    Ok(classifier)
}
