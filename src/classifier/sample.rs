//! Labeled feature vectors — the atomic unit of the training set.

use serde::{Deserialize, Serialize};

/// A feature vector tagged with a category id.
///
/// Categories are opaque integers; mapping human-readable names to ids is the
/// dataset collaborator's concern (see `dataset::CategoryRegistry`). Codebook
/// entries reuse this type: a center is just a labeled vector that moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    /// Category id this vector belongs to.
    pub category: u32,
    /// Feature values, one per dimension.
    pub features: Vec<f64>,
}

impl LabeledSample {
    pub fn new(category: u32, features: Vec<f64>) -> Self {
        Self { category, features }
    }

    /// Number of feature dimensions in this sample.
    pub fn dimension(&self) -> usize {
        self.features.len()
    }
}
