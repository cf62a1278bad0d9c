//! The LVQ network: training set, codebook, and the competitive-learning rule.

use tracing::warn;

use super::prediction::{CategoryDistance, NetworkSummary, Prediction};
use super::sample::LabeledSample;
use super::ClassifierError;

/// How codebook seeds are chosen during output-layer initialization.
///
/// Any sample inside the correct category's feature region works — the
/// iterative update amortizes the choice within a few epochs. The strategy
/// only matters for reproducibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedSelection {
    /// Seed each category from its first sample in insertion order.
    /// Deterministic; the default.
    #[default]
    FirstByInsertion,
    /// Seed each category from a uniformly random sample of that category.
    Random,
}

/// A learning-vector-quantization network.
///
/// Owns its training set and codebook exclusively; no two engine instances
/// ever share storage. Thread safety is the caller's concern — see
/// `model::ModelHandle` for the publish/read wrapper.
#[derive(Debug, Clone)]
pub struct LvqNetwork {
    /// All labeled training vectors, in insertion order.
    samples: Vec<LabeledSample>,
    /// One learned center per category (the output layer).
    codebook: Vec<LabeledSample>,
    /// Per-dimension (min, max) fixed by `normalize()`, retained for the
    /// lifetime of the engine so queries scale consistently with training.
    min_max: Option<Vec<(f64, f64)>>,
    /// Dimensions that had zero variance at normalization time.
    degenerate_dims: Vec<usize>,
    step_size: f64,
    step_decay_rate: f64,
    min_step_size: f64,
    /// Times the network has been trained.
    epoch: u32,
    /// Number of dimensions expected from input vectors.
    dimension: usize,
    seed_selection: SeedSelection,
}

impl LvqNetwork {
    /// Create a new LVQ network with the given learning parameters.
    ///
    /// Recommended values: `step_size` 0.5, `step_decay_rate` 0.99,
    /// `min_step_size` 0.10. The step size multiplies by the decay rate after
    /// each epoch and floors at `min_step_size`.
    pub fn new(dimension: usize, step_size: f64, step_decay_rate: f64, min_step_size: f64) -> Self {
        Self {
            samples: Vec::new(),
            codebook: Vec::new(),
            min_max: None,
            degenerate_dims: Vec::new(),
            step_size,
            step_decay_rate,
            min_step_size,
            epoch: 0,
            dimension,
            seed_selection: SeedSelection::default(),
        }
    }

    /// Override the codebook seed-selection strategy.
    pub fn with_seed_selection(mut self, strategy: SeedSelection) -> Self {
        self.seed_selection = strategy;
        self
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Add a labeled vector to the training set.
    ///
    /// Rejects vectors whose length does not match the configured dimension;
    /// a rejected sample never corrupts existing state.
    pub fn add_sample(&mut self, sample: LabeledSample) -> Result<(), ClassifierError> {
        if sample.dimension() != self.dimension {
            return Err(ClassifierError::DimensionMismatch {
                got: sample.dimension(),
                expected: self.dimension,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    // ========================================================================
    // Normalization
    // ========================================================================

    /// Fix per-dimension normalization parameters and rescale the training
    /// set in place with `(v − min) / (max − min)`.
    ///
    /// Runs exactly once per engine: the stored (min, max) pairs also scale
    /// every future prediction query, so recomputing them over an
    /// already-rescaled dataset would corrupt the mapping. A dimension with
    /// zero variance normalizes to 0.0 for every sample and is recorded in
    /// the summary rather than propagating NaN into the model.
    pub fn normalize(&mut self) -> Result<(), ClassifierError> {
        if self.samples.is_empty() {
            return Err(ClassifierError::NotReady(
                "cannot normalize an empty training set",
            ));
        }
        if self.min_max.is_some() {
            return Err(ClassifierError::AlreadyNormalized);
        }

        let mut min_max = Vec::with_capacity(self.dimension);
        for dim in 0..self.dimension {
            let min = self
                .samples
                .iter()
                .map(|s| s.features[dim])
                .fold(f64::INFINITY, f64::min);
            let max = self
                .samples
                .iter()
                .map(|s| s.features[dim])
                .fold(f64::NEG_INFINITY, f64::max);

            if max == min {
                warn!(
                    dimension = dim,
                    value = min,
                    "Degenerate feature dimension (zero variance); normalizing to 0"
                );
                self.degenerate_dims.push(dim);
            }
            min_max.push((min, max));

            for sample in &mut self.samples {
                sample.features[dim] = scale(sample.features[dim], min, max);
            }
        }

        self.min_max = Some(min_max);
        Ok(())
    }

    // ========================================================================
    // Output layer initialization
    // ========================================================================

    /// Seed the codebook with one entry per distinct category and reset the
    /// epoch counter.
    ///
    /// Seeds are deep copies — the codebook never aliases training-set
    /// storage, so training mutations on one never perturb the other. The
    /// network converges faster seeded from in-category samples than from
    /// random vectors.
    pub fn initialize_output_layer(&mut self) -> Result<(), ClassifierError> {
        if self.samples.is_empty() {
            return Err(ClassifierError::NotReady(
                "cannot seed the output layer from an empty training set",
            ));
        }

        // Knowledge the output layer held is dropped; start from scratch.
        self.epoch = 0;
        self.codebook.clear();

        let mut categories: Vec<u32> = self.samples.iter().map(|s| s.category).collect();
        categories.sort_unstable();
        categories.dedup();

        for category in categories {
            let seed = match self.seed_selection {
                SeedSelection::FirstByInsertion => self
                    .samples
                    .iter()
                    .find(|s| s.category == category),
                SeedSelection::Random => {
                    use rand::seq::IteratorRandom;
                    let mut rng = rand::thread_rng();
                    self.samples
                        .iter()
                        .filter(|s| s.category == category)
                        .choose(&mut rng)
                }
            };
            if let Some(seed) = seed {
                self.codebook.push(seed.clone());
            }
        }

        Ok(())
    }

    // ========================================================================
    // Training
    // ========================================================================

    /// Run one training epoch: a full pass of the competitive-learning rule
    /// over every sample in insertion order.
    ///
    /// For each sample the nearest codebook entry (the winner) moves by
    /// `step_size * (sample − winner)` — towards the sample when their
    /// categories match, away otherwise. Winners are mutated in place and
    /// persist identity across epochs. All precondition checks happen before
    /// any mutation, so a failed call never partially applies.
    pub fn train(&mut self) -> Result<(), ClassifierError> {
        if self.codebook.is_empty() {
            return Err(ClassifierError::NotReady(
                "output layer is not initialized yet",
            ));
        }

        let step = self.step_size;
        let codebook = &mut self.codebook;
        for sample in &self.samples {
            let winner_idx = nearest(codebook, &sample.features);
            let winner = &mut codebook[winner_idx];

            let attract = sample.category == winner.category;
            for (w, &s) in winner.features.iter_mut().zip(sample.features.iter()) {
                let delta = step * (s - *w);
                if attract {
                    *w += delta;
                } else {
                    *w -= delta;
                }
            }
        }

        // Decay the step size until it floors at min_step_size.
        self.step_size = (self.step_size * self.step_decay_rate).max(self.min_step_size);
        self.epoch += 1;
        Ok(())
    }

    // ========================================================================
    // Prediction
    // ========================================================================

    /// Classify a raw (un-normalized) feature vector.
    ///
    /// The query is scaled with the training-time (min, max) parameters —
    /// never a fresh min/max of the query — then ranked against every
    /// codebook entry by Euclidean distance.
    pub fn predict(&self, raw_features: &[f64]) -> Result<Prediction, ClassifierError> {
        if raw_features.len() != self.dimension {
            return Err(ClassifierError::DimensionMismatch {
                got: raw_features.len(),
                expected: self.dimension,
            });
        }
        if self.codebook.is_empty() {
            return Err(ClassifierError::NotReady(
                "output layer is not initialized yet",
            ));
        }
        let Some(min_max) = &self.min_max else {
            return Err(ClassifierError::NotReady(
                "normalization parameters have not been fixed yet",
            ));
        };

        let normalized: Vec<f64> = raw_features
            .iter()
            .zip(min_max.iter())
            .map(|(&v, &(min, max))| scale(v, min, max))
            .collect();

        let mut ranked: Vec<CategoryDistance> = self
            .codebook
            .iter()
            .map(|entry| CategoryDistance {
                category: entry.category,
                distance: euclidean_distance(&normalized, &entry.features),
            })
            .collect();
        // Stable sort: equal distances keep codebook order, so ties resolve
        // to the lowest index.
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(Prediction {
            category: ranked[0].category,
            distance: ranked[0].distance,
            likelihood: ranked.get(1).map(|second| ranked[0].distance / second.distance),
            ranked,
        })
    }

    // ========================================================================
    // Observability
    // ========================================================================

    /// Read-only statistics snapshot; never mutates state.
    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            epoch: self.epoch,
            current_step_size: self.step_size,
            training_set_size: self.samples.len(),
            codebook_size: self.codebook.len(),
            degenerate_dimensions: self.degenerate_dims.clone(),
        }
    }

    /// Number of dimensions expected from input vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Times the network has been trained.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Current step size after decay.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Whether the output layer has been seeded.
    pub fn is_initialized(&self) -> bool {
        !self.codebook.is_empty()
    }

    /// The fixed per-dimension (min, max) pairs, once `normalize()` has run.
    pub fn normalization(&self) -> Option<&[(f64, f64)]> {
        self.min_max.as_deref()
    }

    /// The normalized training vectors, in insertion order.
    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    /// The current codebook entries.
    pub fn codebook(&self) -> &[LabeledSample] {
        &self.codebook
    }
}

/// Feature scaling against fixed bounds. A degenerate dimension
/// (`max == min`) maps every value to 0.0 instead of dividing by zero.
fn scale(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

/// Euclidean distance between two equal-length vectors.
fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Index of the codebook entry nearest to `vector`.
///
/// Strict `<` comparison keeps the first (lowest-index) entry on ties.
fn nearest(entries: &[LabeledSample], vector: &[f64]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (i, entry) in entries.iter().enumerate() {
        let dist = euclidean_distance(vector, &entry.features);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cluster_network() -> LvqNetwork {
        let mut network = LvqNetwork::new(2, 0.5, 0.99, 0.10);
        for features in [[0.3, 0.5], [-0.1, -0.2], [0.4, 0.6], [0.6, 0.2], [0.3, 0.1]] {
            network
                .add_sample(LabeledSample::new(0, features.to_vec()))
                .expect("sample");
        }
        for features in [[0.8, 0.6], [0.7, 0.9], [0.5, 0.8], [0.4, 0.8], [0.6, 0.3]] {
            network
                .add_sample(LabeledSample::new(1, features.to_vec()))
                .expect("sample");
        }
        network
    }

    #[test]
    fn test_add_sample_rejects_wrong_dimension() {
        let mut network = LvqNetwork::new(4, 0.5, 0.99, 0.10);
        let err = network
            .add_sample(LabeledSample::new(0, vec![1.0, 2.0]))
            .expect_err("must reject");
        assert!(matches!(
            err,
            ClassifierError::DimensionMismatch { got: 2, expected: 4 }
        ));
        // Rejected input never corrupts existing state.
        assert_eq!(network.summary().training_set_size, 0);
    }

    #[test]
    fn test_train_before_initialize_fails() {
        let mut network = two_cluster_network();
        assert!(matches!(
            network.train(),
            Err(ClassifierError::NotReady(_))
        ));
    }

    #[test]
    fn test_predict_before_initialize_fails() {
        let network = two_cluster_network();
        assert!(matches!(
            network.predict(&[0.4, 0.4]),
            Err(ClassifierError::NotReady(_))
        ));
    }

    #[test]
    fn test_initialize_on_empty_training_set_fails() {
        let mut network = LvqNetwork::new(2, 0.5, 0.99, 0.10);
        assert!(matches!(
            network.initialize_output_layer(),
            Err(ClassifierError::NotReady(_))
        ));
    }

    #[test]
    fn test_normalize_twice_fails() {
        let mut network = two_cluster_network();
        network.normalize().expect("first normalize");
        assert!(matches!(
            network.normalize(),
            Err(ClassifierError::AlreadyNormalized)
        ));
    }

    #[test]
    fn test_normalize_rescales_into_unit_range() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        for sample in network.samples() {
            for &v in &sample.features {
                assert!((0.0..=1.0).contains(&v), "normalized value out of range: {v}");
            }
        }
    }

    #[test]
    fn test_normalization_round_trip() {
        // Re-applying the stored (min, max) to the original raw values must
        // reproduce the stored normalized values exactly.
        let raw = [[0.3, 0.5], [-0.1, -0.2], [0.4, 0.6], [0.6, 0.2], [0.3, 0.1]];
        let mut network = LvqNetwork::new(2, 0.5, 0.99, 0.10);
        for features in raw {
            network
                .add_sample(LabeledSample::new(0, features.to_vec()))
                .expect("sample");
        }
        network.normalize().expect("normalize");

        let min_max = network.normalization().expect("params fixed").to_vec();
        for (sample, original) in network.samples().iter().zip(raw.iter()) {
            for dim in 0..2 {
                let (min, max) = min_max[dim];
                let recomputed = (original[dim] - min) / (max - min);
                assert!((recomputed - sample.features[dim]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_degenerate_dimension_normalizes_to_zero() {
        let mut network = LvqNetwork::new(2, 0.5, 0.99, 0.10);
        // Dimension 1 is constant across the whole training set.
        for (category, x) in [(0u32, 0.1), (0, 0.4), (1, 0.9)] {
            network
                .add_sample(LabeledSample::new(category, vec![x, 7.0]))
                .expect("sample");
        }
        network.normalize().expect("normalize");

        for sample in network.samples() {
            assert_eq!(sample.features[1], 0.0);
            assert!(sample.features[1].is_finite());
        }
        assert_eq!(network.summary().degenerate_dimensions, vec![1]);

        // Queries scale the degenerate dimension to 0 as well.
        network.initialize_output_layer().expect("initialize");
        let prediction = network.predict(&[0.2, 123.0]).expect("predict");
        assert!(prediction.distance.is_finite());
    }

    #[test]
    fn test_initialize_seeds_one_entry_per_category() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");

        let summary = network.summary();
        assert_eq!(summary.codebook_size, 2);
        assert_eq!(summary.epoch, 0);

        let categories: Vec<u32> = network.codebook().iter().map(|c| c.category).collect();
        assert_eq!(categories, vec![0, 1]);
    }

    #[test]
    fn test_seed_is_deep_copy() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");

        let seed_before = network.codebook()[0].features.clone();
        let sample_before = network.samples()[0].features.clone();
        network.train().expect("train");

        // The winner moved but its seed sample is untouched.
        assert_eq!(network.samples()[0].features, sample_before);
        assert_ne!(network.codebook()[0].features, seed_before);
    }

    #[test]
    fn test_reinitialize_resets_epoch() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");
        for _ in 0..5 {
            network.train().expect("train");
        }
        assert_eq!(network.epoch(), 5);

        network.initialize_output_layer().expect("re-initialize");
        assert_eq!(network.epoch(), 0);
        assert_eq!(network.summary().codebook_size, 2);
    }

    #[test]
    fn test_step_size_monotonic_and_floored() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");

        let mut previous = network.step_size();
        for _ in 0..500 {
            network.train().expect("train");
            let current = network.step_size();
            assert!(current <= previous, "step size must never increase");
            assert!(current >= 0.10, "step size must floor at min_step_size");
            previous = current;
        }
        assert!((network.step_size() - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_winner_tie_break_is_lowest_index() {
        // Two codebook entries equidistant from the query: the lower index
        // must win, reproducibly.
        let mut network = LvqNetwork::new(1, 0.5, 0.99, 0.10);
        network
            .add_sample(LabeledSample::new(0, vec![0.0]))
            .expect("sample");
        network
            .add_sample(LabeledSample::new(1, vec![1.0]))
            .expect("sample");
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");

        for _ in 0..10 {
            let prediction = network.predict(&[0.5]).expect("predict");
            assert_eq!(prediction.category, 0);
            assert_eq!(prediction.ranked[0].category, 0);
            assert_eq!(prediction.ranked[1].category, 1);
        }
    }

    #[test]
    fn test_training_is_deterministic_with_pinned_seeds() {
        let run = || {
            let mut network = two_cluster_network();
            network.normalize().expect("normalize");
            network.initialize_output_layer().expect("initialize");
            for _ in 0..50 {
                network.train().expect("train");
            }
            network
                .codebook()
                .iter()
                .map(|c| c.features.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_likelihood_requires_two_entries() {
        let mut network = LvqNetwork::new(1, 0.5, 0.99, 0.10);
        network
            .add_sample(LabeledSample::new(0, vec![0.2]))
            .expect("sample");
        network
            .add_sample(LabeledSample::new(0, vec![0.8]))
            .expect("sample");
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");

        let prediction = network.predict(&[0.5]).expect("predict");
        assert_eq!(prediction.ranked.len(), 1);
        assert!(prediction.likelihood.is_none());
    }

    #[test]
    fn test_predict_rejects_wrong_dimension() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");
        assert!(matches!(
            network.predict(&[0.1, 0.2, 0.3]),
            Err(ClassifierError::DimensionMismatch { got: 3, expected: 2 })
        ));
    }

    #[test]
    fn test_trained_network_classifies_clusters() {
        let mut network = two_cluster_network();
        network.normalize().expect("normalize");
        network.initialize_output_layer().expect("initialize");
        for _ in 0..100 {
            network.train().expect("train");
        }

        let prediction = network.predict(&[0.4, 0.4]).expect("predict");
        assert_eq!(prediction.category, 0);
        let likelihood = prediction.likelihood.expect("two entries");
        assert!(likelihood < 1.0, "best distance must beat second best");
    }
}
