//! Motion Sentinel: Online Behavioral Motion Classification
//!
//! Distinguishes behavioral categories (distinct motion patterns) from short
//! feature vectors derived from time-ordered angle sequences, using a
//! learning-vector-quantization classifier retrained in the background while
//! predictions keep being served.
//!
//! ## Architecture
//!
//! - **Feature Extractor**: angle sequence → 4-dimensional feature vector
//! - **LVQ Engine**: labeled training set, per-dimension normalization,
//!   competitive-learning training loop, nearest-center prediction
//! - **Model Handle**: atomic publish/read so a retrain never corrupts or
//!   blocks concurrent predictions
//! - **Rebuild Service**: background rebuild orchestration with strict
//!   request-order supersede

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod features;
pub mod model;
pub mod trainer;

// Re-export the classifier core
pub use classifier::{
    CategoryDistance, ClassifierError, LabeledSample, LvqNetwork, NetworkSummary, Prediction,
    SeedSelection,
};

// Re-export the dataset boundary
pub use dataset::{CategoryData, CategoryRegistry, DatasetError, DatasetSource, MemorySource};

// Re-export feature extraction
pub use features::{extract_features, FeatureError, FEATURE_COUNT};

// Re-export concurrency components
pub use model::ModelHandle;
pub use trainer::{ClassifyError, RebuildError, RebuildOutcome, RebuildService, ServiceStatus};
