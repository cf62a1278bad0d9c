//! Background rebuild orchestration.
//!
//! A rebuild constructs a fresh engine from scratch — ingest every sample
//! from the dataset source, fix normalization, seed the output layer, run the
//! configured number of training epochs — and only then publishes it through
//! the [`ModelHandle`]. Prediction traffic is never blocked: readers keep the
//! previously published model until the swap, and never observe a model
//! mid-normalization or mid-initialization.
//!
//! Concurrent rebuilds resolve by strict request order: every rebuild request
//! takes a generation ticket when it is issued, and a finished rebuild
//! publishes only if its ticket is newer than the last published one. A slow
//! superseded rebuild completes, is discarded, and is logged — it can never
//! clobber a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classifier::{ClassifierError, LabeledSample, LvqNetwork, NetworkSummary, Prediction};
use crate::config::EngineConfig;
use crate::dataset::{CategoryRegistry, DatasetError, DatasetSource};
use crate::features::{self, FeatureError};
use crate::model::ModelHandle;

/// Errors from a rebuild attempt.
///
/// A failed rebuild publishes nothing; the previous model keeps serving.
/// Retry policy belongs to the caller (e.g. re-trigger after fixing a
/// malformed dataset).
#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Engine error: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Errors from classifying a raw angle sequence.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Feature extraction failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),
}

/// How a completed rebuild resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// The rebuilt engine was published.
    Published { generation: u64 },
    /// A newer rebuild already published; this result was discarded.
    Superseded { generation: u64 },
    /// The service was shut down before the rebuild finished.
    Cancelled { generation: u64 },
}

/// Read-only service observability snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    /// Summary of the currently published network.
    pub network: NetworkSummary,
    /// Rebuilds that finished and published.
    pub rebuilds_completed: u64,
    /// Rebuilds that finished but were superseded by a newer one.
    pub rebuilds_discarded: u64,
    /// Completion time of the last published rebuild.
    pub last_rebuild_time: Option<DateTime<Utc>>,
}

/// Owns the model handle and runs rebuilds on background tasks.
pub struct RebuildService {
    params: EngineConfig,
    handle: Arc<ModelHandle>,
    /// Name ↔ id table matching the published model, rebuilt on every publish.
    registry: RwLock<CategoryRegistry>,
    /// Ticket counter; incremented at request time, so ticket order is
    /// request order.
    next_generation: AtomicU64,
    /// Ticket of the last published rebuild; guarded by a mutex so the
    /// compare-and-publish step is atomic.
    last_published: Mutex<u64>,
    rebuilds_completed: AtomicU64,
    rebuilds_discarded: AtomicU64,
    last_rebuild_time: Mutex<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
}

impl RebuildService {
    /// Create a service with an empty, unpublished-knowledge engine.
    ///
    /// Predictions before the first completed rebuild fail with a not-ready
    /// error, which is surfaced to the caller rather than retried.
    pub fn new(params: EngineConfig) -> Self {
        let initial = LvqNetwork::new(
            params.dimension,
            params.step_size,
            params.step_decay_rate,
            params.min_step_size,
        );
        Self {
            params,
            handle: Arc::new(ModelHandle::new(initial)),
            registry: RwLock::new(CategoryRegistry::new()),
            next_generation: AtomicU64::new(0),
            last_published: Mutex::new(0),
            rebuilds_completed: AtomicU64::new(0),
            rebuilds_discarded: AtomicU64::new(0),
            last_rebuild_time: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// The shared model handle, for prediction paths that want to hold their
    /// own reference.
    pub fn handle(&self) -> Arc<ModelHandle> {
        Arc::clone(&self.handle)
    }

    /// Snapshot of the currently published engine.
    pub fn snapshot(&self) -> Arc<LvqNetwork> {
        self.handle.snapshot()
    }

    /// Run a full rebuild on a background task.
    ///
    /// The generation ticket is taken here, synchronously, so the supersede
    /// order matches the order in which callers requested rebuilds — not the
    /// order in which the tasks happen to finish.
    pub fn spawn_rebuild(
        self: &Arc<Self>,
        source: Arc<dyn DatasetSource>,
    ) -> JoinHandle<Result<RebuildOutcome, RebuildError>> {
        let generation = self.take_ticket();
        let service = Arc::clone(self);
        tokio::spawn(async move { service.run_rebuild(generation, source.as_ref()).await })
    }

    /// Run a full rebuild inline (awaiting it).
    pub async fn rebuild(
        &self,
        source: &dyn DatasetSource,
    ) -> Result<RebuildOutcome, RebuildError> {
        let generation = self.take_ticket();
        self.run_rebuild(generation, source).await
    }

    /// Extract features from a raw angle sequence and classify them against
    /// the current snapshot.
    pub fn classify_sequence(&self, angles: &[f64]) -> Result<Prediction, ClassifyError> {
        let features = features::extract_features(angles)?;
        Ok(self.snapshot().predict(&features)?)
    }

    /// Resolve a category id from a prediction back to its name.
    pub fn resolve_category(&self, id: u32) -> Option<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .name_of(id)
            .map(str::to_string)
    }

    /// Read-only observability snapshot; never mutates state.
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            network: self.snapshot().summary(),
            rebuilds_completed: self.rebuilds_completed.load(Ordering::Relaxed),
            rebuilds_discarded: self.rebuilds_discarded.load(Ordering::Relaxed),
            last_rebuild_time: *self
                .last_rebuild_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Cancel in-flight rebuilds. Already-published models keep serving.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn take_ticket(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run_rebuild(
        &self,
        generation: u64,
        source: &dyn DatasetSource,
    ) -> Result<RebuildOutcome, RebuildError> {
        info!(
            generation,
            source = source.source_name(),
            dimension = self.params.dimension,
            epochs = self.params.epochs_per_rebuild,
            "Starting model rebuild"
        );

        let categories = source.load().await?;

        // Build the fresh engine and its registry entirely off to the side;
        // nothing is visible to readers until the publish swap below.
        let mut registry = CategoryRegistry::new();
        let mut engine = LvqNetwork::new(
            self.params.dimension,
            self.params.step_size,
            self.params.step_decay_rate,
            self.params.min_step_size,
        );
        let mut sample_count = 0usize;
        for category in &categories {
            let id = registry.register(&category.name);
            for features in &category.samples {
                engine.add_sample(LabeledSample::new(id, features.clone()))?;
                sample_count += 1;
            }
        }

        engine.normalize()?;
        engine.initialize_output_layer()?;

        for _ in 0..self.params.epochs_per_rebuild {
            if self.cancel.is_cancelled() {
                info!(generation, "Rebuild cancelled by shutdown");
                return Ok(RebuildOutcome::Cancelled { generation });
            }
            engine.train()?;
        }

        let summary = engine.summary();
        if self.publish_if_newer(generation, engine, registry) {
            info!(
                generation,
                samples = sample_count,
                categories = summary.codebook_size,
                epoch = summary.epoch,
                step_size = summary.current_step_size,
                "Model rebuild published"
            );
            Ok(RebuildOutcome::Published { generation })
        } else {
            warn!(
                generation,
                "Rebuild superseded by a newer generation; discarding result"
            );
            Ok(RebuildOutcome::Superseded { generation })
        }
    }

    /// Atomically publish `engine` if `generation` is newer than the last
    /// published ticket. Returns whether the publish happened.
    fn publish_if_newer(
        &self,
        generation: u64,
        engine: LvqNetwork,
        registry: CategoryRegistry,
    ) -> bool {
        let mut last = self
            .last_published
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if generation <= *last {
            self.rebuilds_discarded.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        *self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner) = registry;
        self.handle.replace(engine);
        *last = generation;
        self.rebuilds_completed.fetch_add(1, Ordering::Relaxed);
        *self
            .last_rebuild_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemorySource;

    fn clustered_source() -> MemorySource {
        let mut source = MemorySource::default();
        source.add_category(
            "normal",
            vec![
                vec![0.30, 0.40],
                vec![0.28, 0.42],
                vec![0.32, 0.38],
                vec![0.29, 0.41],
                vec![0.31, 0.39],
            ],
        );
        source.add_category(
            "assisted",
            vec![
                vec![0.60, 0.70],
                vec![0.58, 0.72],
                vec![0.62, 0.68],
                vec![0.59, 0.71],
                vec![0.61, 0.69],
            ],
        );
        source
    }

    fn test_params() -> EngineConfig {
        EngineConfig {
            dimension: 2,
            step_size: 0.5,
            step_decay_rate: 0.99,
            min_step_size: 0.10,
            epochs_per_rebuild: 100,
        }
    }

    #[tokio::test]
    async fn test_rebuild_publishes_trained_model() {
        let service = RebuildService::new(test_params());
        let source = clustered_source();

        // Before the first rebuild the engine is empty and predictions fail.
        assert!(matches!(
            service.snapshot().predict(&[0.35, 0.45]),
            Err(ClassifierError::NotReady(_))
        ));

        let outcome = service.rebuild(&source).await.expect("rebuild");
        assert_eq!(outcome, RebuildOutcome::Published { generation: 1 });

        let prediction = service.snapshot().predict(&[0.35, 0.45]).expect("predict");
        assert_eq!(prediction.category, 0);
        assert_eq!(service.resolve_category(prediction.category).as_deref(), Some("normal"));

        let status = service.status();
        assert_eq!(status.rebuilds_completed, 1);
        assert_eq!(status.rebuilds_discarded, 0);
        assert_eq!(status.network.epoch, 100);
        assert_eq!(status.network.training_set_size, 10);
        assert_eq!(status.network.codebook_size, 2);
        assert!(status.last_rebuild_time.is_some());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_model() {
        let service = RebuildService::new(test_params());
        service.rebuild(&clustered_source()).await.expect("rebuild");
        let published = service.snapshot();

        // A dataset with wrong-dimension vectors fails ingestion.
        let mut bad = MemorySource::default();
        bad.add_category("broken", vec![vec![1.0, 2.0, 3.0]]);
        let err = service.rebuild(&bad).await.expect_err("must fail");
        assert!(matches!(
            err,
            RebuildError::Classifier(ClassifierError::DimensionMismatch { .. })
        ));

        // The previously published engine is still serving, bit for bit.
        assert!(Arc::ptr_eq(&published, &service.snapshot()));
        assert_eq!(service.status().rebuilds_completed, 1);
    }

    #[tokio::test]
    async fn test_empty_dataset_fails_not_ready() {
        let service = RebuildService::new(test_params());
        let err = service
            .rebuild(&MemorySource::default())
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            RebuildError::Classifier(ClassifierError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let service = RebuildService::new(test_params());
        let source = clustered_source();

        // Two requests issued in order; the older one finishes last.
        let older = service.take_ticket();
        let newer = service.take_ticket();

        let outcome = service
            .run_rebuild(newer, &source)
            .await
            .expect("newer rebuild");
        assert_eq!(outcome, RebuildOutcome::Published { generation: newer });
        let published = service.snapshot();

        let outcome = service
            .run_rebuild(older, &source)
            .await
            .expect("older rebuild");
        assert_eq!(outcome, RebuildOutcome::Superseded { generation: older });

        // The newer result stayed published.
        assert!(Arc::ptr_eq(&published, &service.snapshot()));
        let status = service.status();
        assert_eq!(status.rebuilds_completed, 1);
        assert_eq!(status.rebuilds_discarded, 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_rebuild() {
        let service = RebuildService::new(test_params());
        service.shutdown();
        let outcome = service
            .rebuild(&clustered_source())
            .await
            .expect("rebuild resolves");
        assert_eq!(outcome, RebuildOutcome::Cancelled { generation: 1 });
        assert!(!service.snapshot().is_initialized());
    }

    #[tokio::test]
    async fn test_classify_sequence_surfaces_short_input() {
        let service = RebuildService::new(test_params());
        assert!(matches!(
            service.classify_sequence(&[1.0]),
            Err(ClassifyError::Feature(_))
        ));
    }
}
