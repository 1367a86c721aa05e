//! Collection metadata handling

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::types::Space;

/// Current metadata format version
pub const META_VERSION: &str = "1.0";

/// HNSW construction and search parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Graph degree (M)
    pub connectivity: usize,
    /// Candidate list size while inserting
    pub expansion_add: usize,
    /// Candidate list size while searching
    pub expansion_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            connectivity: 16,
            expansion_add: 100,
            expansion_search: 100,
        }
    }
}

/// Metadata stored alongside a collection's records and index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMeta {
    /// Metadata format version
    pub version: String,

    /// Stable collection identifier (UUID v4)
    pub id: String,

    /// Collection name, equal to its directory name
    pub name: String,

    /// Distance space of the vector index
    #[serde(default)]
    pub space: Space,

    /// Embedding dimensions, fixed by the first add
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Name of the embedding function used when the collection was created
    pub embedding_function: String,

    /// Next unused vector key
    #[serde(default)]
    pub next_key: u64,

    /// Number of live records
    #[serde(default)]
    pub record_count: usize,

    #[serde(default)]
    pub hnsw: HnswParams,
}

impl CollectionMeta {
    /// Fresh metadata for a new, empty collection
    pub fn new(name: &str, space: Space, embedding_function: &str) -> Self {
        Self {
            version: META_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            space,
            dimensions: None,
            embedding_function: embedding_function.to_string(),
            next_key: 0,
            record_count: 0,
            hnsw: HnswParams::default(),
        }
    }

    /// Load metadata from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let meta: CollectionMeta = serde_json::from_str(&content)?;
        Ok(meta)
    }

    /// Save metadata to a JSON file
    ///
    /// Writes a sibling temp file and renames it over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.meta.json");

        let mut meta = CollectionMeta::new("notes", Space::Cosine, "zero");
        meta.dimensions = Some(384);
        meta.next_key = 7;
        meta.save(&path).unwrap();

        let loaded = CollectionMeta::load(&path).unwrap();
        assert_eq!(loaded.id, meta.id);
        assert_eq!(loaded.space, Space::Cosine);
        assert_eq!(loaded.dimensions, Some(384));
        assert_eq!(loaded.next_key, 7);
        assert_eq!(loaded.hnsw, HnswParams::default());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_older_meta_gets_defaults() {
        let json = r#"{"version":"1.0","id":"x","name":"notes","embedding_function":"zero"}"#;
        let meta: CollectionMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.space, Space::L2);
        assert_eq!(meta.dimensions, None);
        assert_eq!(meta.record_count, 0);
    }
}
