use std::sync::atomic::{AtomicUsize, Ordering};

use sha2::{Digest, Sha256};

use crate::classify::backend::Classifier;
use crate::error::Result;
use crate::frame::FrameTensor;

/// Stub classifier for tests and dry runs.
///
/// Without fixed scores, it hashes the tensor contents and spreads the digest
/// over `classes` scores that sum to one, so identical inputs always produce
/// identical score vectors. Every call is counted.
pub struct StubClassifier {
    classes: usize,
    fixed: Option<Vec<f32>>,
    calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            fixed: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always return `scores`, regardless of input.
    pub fn fixed(scores: Vec<f32>) -> Self {
        Self {
            classes: scores.len(),
            fixed: Some(scores),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `classify` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hashed_scores(&self, tensor: &FrameTensor) -> Vec<f32> {
        let mut hasher = Sha256::new();
        for value in tensor.values() {
            hasher.update(value.to_le_bytes());
        }
        let digest: [u8; 32] = hasher.finalize().into();

        let raw: Vec<f32> = (0..self.classes)
            .map(|i| digest[i % digest.len()] as f32 + 1.0)
            .collect();
        let total: f32 = raw.iter().sum();
        raw.into_iter().map(|v| v / total).collect()
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&self, tensor: FrameTensor) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fixed {
            Some(scores) => Ok(scores.clone()),
            None => Ok(self.hashed_scores(&tensor)),
        }
    }
}
