//! Atomically-replaceable published model.
//!
//! The only structure in the system touched by more than one logical task.
//! A background rebuild trains a fresh engine off to the side and publishes
//! it with a single atomic swap; prediction paths read a snapshot and keep it
//! alive for as long as they need it. Readers never block on a rebuild, and
//! never observe a model mid-normalization, mid-initialization, or with a
//! torn vector.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::classifier::LvqNetwork;

/// Concurrency wrapper around the published LVQ engine.
///
/// `snapshot` / `replace` are lock-free (`arc-swap`). In-place mutation is
/// copy-on-write: the engine is cloned, mutated, and republished, so an
/// engine instance is never written while readers hold it.
pub struct ModelHandle {
    published: ArcSwap<LvqNetwork>,
    /// Serializes mutate-republish cycles so concurrent mutators cannot
    /// lose each other's updates.
    mutate_lock: Mutex<()>,
}

impl ModelHandle {
    pub fn new(initial: LvqNetwork) -> Self {
        Self {
            published: ArcSwap::from_pointee(initial),
            mutate_lock: Mutex::new(()),
        }
    }

    /// The currently published engine, for read-only prediction use.
    ///
    /// Never blocks on an in-progress rebuild. The returned `Arc` stays valid
    /// even if a newer engine is published while it is held.
    pub fn snapshot(&self) -> Arc<LvqNetwork> {
        self.published.load_full()
    }

    /// Atomically publish a new engine.
    ///
    /// The previous instance is dropped once the last in-flight reader
    /// releases its snapshot.
    pub fn replace(&self, engine: LvqNetwork) {
        self.published.store(Arc::new(engine));
    }

    /// Apply a mutation to the published engine via copy-on-write.
    ///
    /// The engine's operations are all-or-nothing (a failed call leaves it
    /// untouched), so republishing after a failed mutation is harmless —
    /// readers see the same state either way.
    pub fn mutate_in_place<T>(&self, mutation: impl FnOnce(&mut LvqNetwork) -> T) -> T {
        let _guard = self
            .mutate_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut engine = (*self.published.load_full()).clone();
        let result = mutation(&mut engine);
        self.published.store(Arc::new(engine));
        result
    }
}
