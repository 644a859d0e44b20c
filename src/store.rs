//! Atomic publication of index snapshots.
//!
//! Readers load the current `Arc<Index>` without locking and keep using it
//! for as long as they hold it; the refresh driver publishes a fully built
//! replacement in a single swap. A reader therefore sees either the old or
//! the new snapshot, never a mix.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::model::Index;
use crate::search::{self, PackageOrOption};

pub struct IndexHandle {
    current: ArcSwap<Index>,
    generation: AtomicU64,
}

impl IndexHandle {
    pub fn new(index: Index) -> Self {
        Self {
            current: ArcSwap::from_pointee(index),
            generation: AtomicU64::new(0),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn load(&self) -> Arc<Index> {
        self.current.load_full()
    }

    /// Replaces the current snapshot; returns the published one.
    pub fn publish(&self, index: Index) -> Arc<Index> {
        let index = Arc::new(index);
        self.current.store(Arc::clone(&index));
        self.generation.fetch_add(1, Ordering::AcqRel);
        index
    }

    /// Number of snapshots published since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Searches the current snapshot.
    pub fn search(&self, query: &str) -> Vec<PackageOrOption> {
        search::search(&self.load(), query)
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new(Index::default())
    }
}
