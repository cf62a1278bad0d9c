//! Classification results and network summaries.

use serde::{Deserialize, Serialize};

/// Distance from a query to one codebook entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistance {
    /// Category of the codebook entry.
    pub category: u32,
    /// Euclidean distance from the normalized query to the entry's vector.
    pub distance: f64,
}

/// The network's guess when asked to classify a vector.
///
/// Entries in `ranked` are sorted by ascending distance; ties resolve to the
/// lower codebook index, so the ordering is deterministic across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Category of the nearest codebook entry.
    pub category: u32,
    /// Distance to that nearest entry.
    pub distance: f64,
    /// Confidence margin: `best_distance / second_best_distance`.
    ///
    /// Smaller is more confident. This is an inverted margin, not a calibrated
    /// probability. `None` when the codebook has fewer than 2 entries.
    pub likelihood: Option<f64>,
    /// Distances to every codebook entry, ascending.
    pub ranked: Vec<CategoryDistance>,
}

/// Read-only statistics snapshot of an `LvqNetwork`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Times the network has been trained (epochs completed).
    pub epoch: u32,
    /// Current step size after decay.
    pub current_step_size: f64,
    /// Number of vectors in the training set.
    pub training_set_size: usize,
    /// Number of codebook entries (one per known category).
    pub codebook_size: usize,
    /// Feature dimensions that had zero variance at normalization time.
    pub degenerate_dimensions: Vec<usize>,
}
