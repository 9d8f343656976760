//! Classifier adapter.
//!
//! Wraps a loaded model artifact behind `classify(tensor) -> score vector`.
//! A classifier is loaded once per process and is read-only afterwards.

mod backend;
mod backends;

pub use backend::{load_classifier, Classifier};
pub use backends::{StubClassifier, TractClassifier};
