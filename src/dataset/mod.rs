//! Dataset source boundary and category naming.
//!
//! The engine only ever sees integer category ids; mapping human-readable
//! category names to ids is handled here, at the seam between the engine and
//! whatever supplies training data. How samples are persisted is the
//! collaborator's concern — this module defines the contract and an
//! in-memory implementation for tests and the demo binary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a dataset source.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed dataset for category '{category}': {message}")]
    Malformed { category: String, message: String },
}

/// All samples for one named category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryData {
    /// Human-readable category name (e.g. "normal", "assisted").
    pub name: String,
    /// Feature vectors, each of the engine's configured dimension.
    pub samples: Vec<Vec<f64>>,
}

/// Trait abstracting where labeled training data comes from.
///
/// The rebuild task calls [`load`](DatasetSource::load) once per rebuild and
/// ingests everything it returns. Vector lengths must match the engine
/// dimension; violations fail the rebuild with a dimension error and the
/// previously published model keeps serving.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Load every category and its samples.
    async fn load(&self) -> Result<Vec<CategoryData>, DatasetError>;

    /// Human-readable name for logging (e.g. "memory", "category-files").
    fn source_name(&self) -> &str;
}

// ============================================================================
// In-memory source
// ============================================================================

/// Dataset source backed by in-memory category data.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    categories: Vec<CategoryData>,
}

impl MemorySource {
    pub fn new(categories: Vec<CategoryData>) -> Self {
        Self { categories }
    }

    /// Append samples to a category, creating it if absent.
    pub fn add_category(&mut self, name: &str, samples: Vec<Vec<f64>>) {
        if let Some(existing) = self.categories.iter_mut().find(|c| c.name == name) {
            existing.samples.extend(samples);
        } else {
            self.categories.push(CategoryData {
                name: name.to_string(),
                samples,
            });
        }
    }
}

#[async_trait]
impl DatasetSource for MemorySource {
    async fn load(&self) -> Result<Vec<CategoryData>, DatasetError> {
        Ok(self.categories.clone())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Category registry
// ============================================================================

/// Bidirectional category name ↔ id table.
///
/// Ids are assigned in registration order starting at 0, so the same source
/// contents always produce the same mapping. The registry is cleared and
/// rebuilt on every model rebuild.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRegistry {
    names: Vec<String>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category name, returning its id. Registering an existing
    /// name returns the existing id.
    pub fn register(&mut self, name: &str) -> u32 {
        if let Some(id) = self.id_of(name) {
            return id;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Drop all mappings, used when reloading the whole dataset.
    pub fn clear(&mut self) {
        self.names.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_assigns_ids_in_registration_order() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.register("normal"), 0);
        assert_eq!(registry.register("assisted"), 1);
        assert_eq!(registry.register("normal"), 0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name_of(1), Some("assisted"));
        assert_eq!(registry.id_of("assisted"), Some(1));
        assert_eq!(registry.name_of(5), None);
    }

    #[test]
    fn test_registry_clear() {
        let mut registry = CategoryRegistry::new();
        registry.register("normal");
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.register("assisted"), 0);
    }

    #[tokio::test]
    async fn test_memory_source_round_trip() {
        let mut source = MemorySource::default();
        source.add_category("normal", vec![vec![0.1, 0.2]]);
        source.add_category("normal", vec![vec![0.3, 0.4]]);
        source.add_category("assisted", vec![vec![0.9, 0.9]]);

        let categories = source.load().await.expect("load");
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "normal");
        assert_eq!(categories[0].samples.len(), 2);
        assert_eq!(source.source_name(), "memory");
    }
}
