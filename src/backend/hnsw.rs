//! HNSW backend using usearch crate

use std::path::Path;

use tracing::debug;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::store::{HnswParams, Result, Space, StoreError};

use super::traits::VectorIndex;

/// HNSW index using usearch
pub struct HnswIndex {
    index: Index,
}

fn options(space: Space, dimensions: usize, params: &HnswParams) -> IndexOptions {
    let metric = match space {
        Space::L2 => MetricKind::L2sq,
        Space::Ip => MetricKind::IP,
        Space::Cosine => MetricKind::Cos,
    };

    IndexOptions {
        dimensions,
        metric,
        quantization: ScalarKind::F32,
        connectivity: params.connectivity,
        expansion_add: params.expansion_add,
        expansion_search: params.expansion_search,
        multi: false,
    }
}

impl HnswIndex {
    /// Create an empty in-memory index
    pub fn create(space: Space, dimensions: usize, params: &HnswParams) -> Result<Self> {
        let index = Index::new(&options(space, dimensions, params)).map_err(StoreError::index)?;
        debug!("Created HNSW index ({} dims, {} space)", dimensions, space);
        Ok(Self { index })
    }

    /// Load an HNSW index from disk
    pub fn load(path: &Path, space: Space, dimensions: usize, params: &HnswParams) -> Result<Self> {
        if !path.exists() {
            return Err(StoreError::Corrupted {
                path: path.display().to_string(),
                message: "index file not found".to_string(),
            });
        }

        let index = Index::new(&options(space, dimensions, params)).map_err(StoreError::index)?;
        index
            .load(path.to_string_lossy().as_ref())
            .map_err(|e| StoreError::Corrupted {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if index.dimensions() != dimensions {
            return Err(StoreError::Corrupted {
                path: path.display().to_string(),
                message: format!(
                    "index has {} dimensions, collection expects {}",
                    index.dimensions(),
                    dimensions
                ),
            });
        }

        debug!("Loaded HNSW index with {} vectors from {:?}", index.size(), path);
        Ok(Self { index })
    }
}

impl VectorIndex for HnswIndex {
    fn add(&mut self, entries: &[(u64, Vec<f32>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        // Removed slots are not necessarily reclaimed, so grow from capacity
        let needed = self.index.capacity().max(self.index.size()) + entries.len();
        self.index.reserve(needed).map_err(StoreError::index)?;

        for (key, vector) in entries {
            self.index.add(*key, vector.as_slice()).map_err(StoreError::index)?;
        }

        Ok(())
    }

    fn remove(&mut self, keys: &[u64]) -> Result<usize> {
        let mut removed = 0;
        for key in keys {
            removed += self.index.remove(*key).map_err(StoreError::index)?;
        }
        Ok(removed)
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(u64, f32)>> {
        if top_k == 0 || self.index.size() == 0 {
            return Ok(Vec::new());
        }

        let matches = self.index.search(query, top_k).map_err(StoreError::index)?;

        Ok(matches
            .keys
            .iter()
            .copied()
            .zip(matches.distances.iter().copied())
            .collect())
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.index
            .save(path.to_string_lossy().as_ref())
            .map_err(StoreError::index)?;
        debug!("Saved HNSW index with {} vectors to {:?}", self.index.size(), path);
        Ok(())
    }

    fn len(&self) -> usize {
        self.index.size()
    }
}
