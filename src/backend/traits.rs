//! Backend traits for vector search

use std::path::Path;

use crate::store::Result;

/// A mutable nearest-neighbour index keyed by integer record keys
pub trait VectorIndex: Send + Sync {
    /// Insert vectors under the given keys
    fn add(&mut self, entries: &[(u64, Vec<f32>)]) -> Result<()>;

    /// Remove the vectors stored under `keys`, returning how many were present
    fn remove(&mut self, keys: &[u64]) -> Result<usize>;

    /// Search for nearest neighbours
    ///
    /// Returns `(key, distance)` pairs ordered by increasing distance.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(u64, f32)>>;

    /// Persist the index to `path`
    fn save(&self, path: &Path) -> Result<()>;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
