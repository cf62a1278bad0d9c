//! Learning Vector Quantization classifier.
//!
//! The core of the system: a labeled training set, a codebook of one learned
//! center vector per category, per-dimension min/max normalization, and a
//! competitive-learning training rule.
//!
//! References: T. Kohonen, "Improved Versions of Learning Vector
//! Quantization", International Joint Conference on Neural Networks (IJCNN),
//! 1990.
//!
//! ## Architecture
//! - `sample`: `LabeledSample`, the (category, feature vector) unit of the dataset
//! - `network`: `LvqNetwork` — ingestion, normalization, codebook seeding,
//!   one-epoch training, prediction
//! - `prediction`: ranked classification results and network summaries
//!
//! Lifecycle: construct with learning parameters, ingest samples, `normalize()`
//! exactly once, `initialize_output_layer()`, then `train()` repeatedly (one
//! call per epoch). An engine is discarded wholesale on rebuild; there is no
//! partial-update path for dimensionality or learning parameters.

mod network;
mod prediction;
mod sample;

pub use network::{LvqNetwork, SeedSelection};
pub use prediction::{CategoryDistance, NetworkSummary, Prediction};
pub use sample::LabeledSample;

use thiserror::Error;

/// Errors from the LVQ engine.
///
/// None of these are retried internally; retry policy belongs to the caller.
/// A failed operation never leaves the engine partially mutated.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Input has illegal dimensions ({got}, expected {expected})")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("Not ready: {0}")]
    NotReady(&'static str),

    #[error("Dataset is already normalized; normalization parameters are fixed per engine")]
    AlreadyNormalized,
}
