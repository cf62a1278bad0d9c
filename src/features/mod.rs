//! Feature extraction from time-ordered angle sequences.
//!
//! Reduces an ordered sequence of scalar angle observations to a fixed
//! 4-dimensional feature vector capturing how much and how erratically the
//! signal moves:
//!
//! 1. dispersion of the raw sequence
//! 2. mean of the raw sequence
//! 3. dispersion of the first-difference (delta) sequence
//! 4. mean of the delta sequence
//!
//! "Dispersion" is the population variance `Σ(v − mean)² / n` without a final
//! square root and without Bessel correction. Every persisted dataset was
//! produced with this convention, so it must stay consistent between training
//! ingestion and live classification.

use statrs::statistics::Statistics;
use thiserror::Error;

/// Number of features extracted from an angle sequence.
pub const FEATURE_COUNT: usize = 4;

/// Errors from feature extraction.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Sequence has {0} element(s); at least 2 are required to compute a delta")]
    SequenceTooShort(usize),
}

/// First-difference sequence: `delta[i] = sequence[i+1] − sequence[i]`.
///
/// Requires at least 2 elements.
pub fn delta(sequence: &[f64]) -> Result<Vec<f64>, FeatureError> {
    if sequence.len() < 2 {
        return Err(FeatureError::SequenceTooShort(sequence.len()));
    }
    Ok(sequence.windows(2).map(|w| w[1] - w[0]).collect())
}

/// Population variance of a sequence, no square root applied.
pub fn dispersion(values: &[f64]) -> f64 {
    values.population_variance()
}

/// Extract the 4-dimensional feature vector from an angle sequence.
///
/// Returns `[dispersion(x), mean(x), dispersion(Δx), mean(Δx)]`.
/// Fails when the sequence is too short to compute a delta.
pub fn extract_features(sequence: &[f64]) -> Result<Vec<f64>, FeatureError> {
    let deltas = delta(sequence)?;

    Ok(vec![
        dispersion(sequence),
        sequence.mean(),
        dispersion(&deltas),
        deltas.mean(),
    ])
}
