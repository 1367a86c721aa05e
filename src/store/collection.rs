//! A single collection: records, vector index and on-disk persistence

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{HnswIndex, VectorIndex};

use super::error::{Result, StoreError};
use super::filter::{Where, WhereDocument};
use super::meta::CollectionMeta;
use super::records::{load_records, rewrite_records, Record, RecordWriter};
use super::types::{CollectionInfo, GetResult, Metadata, QueryHit, Space};

pub(super) const META_FILE: &str = "collection.meta.json";
const RECORDS_FILE: &str = "records.jsonl";
const INDEX_FILE: &str = "vectors.index";

/// Check a collection name against the naming rules
///
/// Names are 3-63 characters of `[A-Za-z0-9._-]`, start and end with an
/// alphanumeric character, contain no `..` and are not IPv4 addresses.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| StoreError::InvalidCollectionName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !(3..=63).contains(&name.chars().count()) {
        return Err(invalid("must be between 3 and 63 characters long"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    let edges_ok = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if !name.chars().all(allowed) || !edges_ok {
        return Err(invalid(
            "may only contain [a-zA-Z0-9._-] and must start and end with a letter or digit",
        ));
    }
    if name.contains("..") {
        return Err(invalid("must not contain two consecutive periods"));
    }
    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("must not be a valid IPv4 address"));
    }
    Ok(())
}

/// Check that ids are non-empty and unique within one batch
pub fn validate_ids(ids: &[String]) -> Result<()> {
    if ids.iter().any(|id| id.is_empty()) {
        return Err(StoreError::EmptyId);
    }

    let mut seen = FxHashSet::default();
    let mut duplicates: Vec<&str> = Vec::new();
    for id in ids {
        if !seen.insert(id.as_str()) && !duplicates.contains(&id.as_str()) {
            duplicates.push(id);
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(StoreError::DuplicateIds(duplicates.join(", ")))
    }
}

/// Check that every metadata value is a string, number or bool
pub fn validate_metadata(metadata: &Metadata) -> Result<()> {
    for (key, value) in metadata {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {}
            other => {
                return Err(StoreError::InvalidMetadata(format!(
                    "expected a string, number or bool for key '{}', got {}",
                    key, other
                )))
            }
        }
    }
    Ok(())
}

/// An open collection
///
/// Records live in memory in insertion order. Persistent collections mirror
/// every mutation to their directory; ephemeral ones (`dir == None`) never
/// touch the disk.
pub struct Collection {
    meta: CollectionMeta,
    records: Vec<Record>,
    by_id: FxHashMap<String, usize>,
    by_key: FxHashMap<u64, usize>,
    index: Option<Box<dyn VectorIndex>>,
    dir: Option<PathBuf>,
}

impl Collection {
    /// Create a new, empty collection, writing its metadata if `dir` is set
    pub fn create(
        name: &str,
        space: Space,
        embedding_function: &str,
        dir: Option<PathBuf>,
    ) -> Result<Self> {
        validate_collection_name(name)?;

        let meta = CollectionMeta::new(name, space, embedding_function);
        if let Some(dir) = &dir {
            std::fs::create_dir_all(dir)?;
            meta.save(&dir.join(META_FILE))?;
        }

        debug!("Created collection '{}' ({} space)", name, space);

        Ok(Self {
            meta,
            records: Vec::new(),
            by_id: FxHashMap::default(),
            by_key: FxHashMap::default(),
            index: None,
            dir,
        })
    }

    /// Open a collection previously persisted to `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        let mut meta = CollectionMeta::load(&dir.join(META_FILE))?;
        let records = load_records(&dir.join(RECORDS_FILE))?;

        // An interrupted add can leave records the meta's key counter missed
        if let Some(max_key) = records.iter().map(|r| r.key).max() {
            if max_key >= meta.next_key {
                warn!(
                    "Collection '{}' key counter {} is behind stored key {}, advancing",
                    meta.name, meta.next_key, max_key
                );
                meta.next_key = max_key + 1;
            }
        }

        let index_path = dir.join(INDEX_FILE);
        let index: Option<Box<dyn VectorIndex>> = match meta.dimensions {
            Some(dims) if index_path.exists() => Some(Box::new(HnswIndex::load(
                &index_path,
                meta.space,
                dims,
                &meta.hnsw,
            )?)),
            Some(dims) if records.is_empty() => {
                Some(Box::new(HnswIndex::create(meta.space, dims, &meta.hnsw)?))
            }
            Some(_) => {
                return Err(StoreError::Corrupted {
                    path: index_path.display().to_string(),
                    message: "index file missing for a non-empty collection".to_string(),
                })
            }
            None => None,
        };

        if let Some(index) = &index {
            if index.len() != records.len() {
                warn!(
                    "Collection '{}' has {} records but {} indexed vectors",
                    meta.name,
                    records.len(),
                    index.len()
                );
            }
        }

        let mut collection = Self {
            meta,
            records,
            by_id: FxHashMap::default(),
            by_key: FxHashMap::default(),
            index,
            dir: Some(dir.to_path_buf()),
        };
        collection.reindex();

        debug!(
            "Loaded collection '{}' with {} records",
            collection.meta.name,
            collection.records.len()
        );
        Ok(collection)
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_key.clear();
        for (pos, record) in self.records.iter().enumerate() {
            self.by_id.insert(record.id.clone(), pos);
            self.by_key.insert(record.key, pos);
        }
    }

    /// Name of the embedding function that created the collection
    pub fn embedding_function(&self) -> &str {
        &self.meta.embedding_function
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn info(&self) -> CollectionInfo {
        CollectionInfo {
            id: self.meta.id.clone(),
            name: self.meta.name.clone(),
            space: self.meta.space,
            dimensions: self.meta.dimensions,
            count: self.records.len(),
        }
    }

    /// Add records with precomputed embeddings
    ///
    /// Ids already present are skipped with a warning. Returns the number of
    /// records actually added.
    pub fn add(
        &mut self,
        ids: Vec<String>,
        documents: Vec<String>,
        metadatas: Vec<Option<Metadata>>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<usize> {
        let n = ids.len();
        if documents.len() != n || metadatas.len() != n || embeddings.len() != n {
            return Err(StoreError::LengthMismatch(format!(
                "ids: {}, documents: {}, metadatas: {}, embeddings: {}",
                n,
                documents.len(),
                metadatas.len(),
                embeddings.len()
            )));
        }
        validate_ids(&ids)?;
        for metadata in metadatas.iter().flatten() {
            validate_metadata(metadata)?;
        }

        let dims = match (self.meta.dimensions, embeddings.first()) {
            (Some(dims), _) => dims,
            (None, Some(first)) if !first.is_empty() => first.len(),
            (None, Some(_)) => return Err(StoreError::index("embeddings must not be empty")),
            (None, None) => return Ok(0),
        };
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dims) {
            return Err(StoreError::DimensionMismatch {
                expected: dims,
                got: bad.len(),
            });
        }

        let mut new_records = Vec::with_capacity(n);
        let mut vectors = Vec::with_capacity(n);
        let mut key = self.meta.next_key;

        for (((id, document), metadata), embedding) in ids
            .into_iter()
            .zip(documents)
            .zip(metadatas)
            .zip(embeddings)
        {
            if self.contains(&id) {
                warn!("Add of existing embedding ID: {}", id);
                continue;
            }
            new_records.push(Record {
                key,
                id,
                document,
                metadata: metadata.filter(|m| !m.is_empty()),
            });
            vectors.push((key, embedding));
            key += 1;
        }

        if new_records.is_empty() {
            return Ok(0);
        }

        let mut index: Box<dyn VectorIndex> = match self.index.take() {
            Some(index) => index,
            None => Box::new(HnswIndex::create(self.meta.space, dims, &self.meta.hnsw)?),
        };
        let indexed = index.add(&vectors);
        self.index = Some(index);
        indexed?;
        self.meta.dimensions = Some(dims);

        if let Some(dir) = &self.dir {
            let mut writer = RecordWriter::append(&dir.join(RECORDS_FILE))?;
            for record in &new_records {
                writer.add(record)?;
            }
            let written = writer.finish()?;
            debug!("Appended {} records to {}", written, RECORDS_FILE);
        }

        let added = new_records.len();
        for record in new_records {
            let pos = self.records.len();
            self.by_id.insert(record.id.clone(), pos);
            self.by_key.insert(record.key, pos);
            self.records.push(record);
        }
        self.meta.next_key = key;
        self.persist()?;

        debug!("Added {} records to '{}'", added, self.meta.name);
        Ok(added)
    }

    /// Nearest neighbours of `embedding`, restricted by the optional filters
    ///
    /// Filtered queries rank every vector, then keep the best `n_results`
    /// matches, so the result is exact for the filter.
    pub fn query(
        &self,
        embedding: &[f32],
        n_results: usize,
        where_clause: Option<&Where>,
        where_document: Option<&WhereDocument>,
    ) -> Result<Vec<QueryHit>> {
        let Some(index) = &self.index else {
            return Ok(Vec::new());
        };
        if n_results == 0 || index.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(dims) = self.meta.dimensions {
            if embedding.len() != dims {
                return Err(StoreError::DimensionMismatch {
                    expected: dims,
                    got: embedding.len(),
                });
            }
        }

        let filtered = where_clause.is_some() || where_document.is_some();
        let fetch_k = if filtered { index.len() } else { n_results };

        let mut hits = Vec::with_capacity(n_results);
        for (key, distance) in index.search(embedding, fetch_k)? {
            if hits.len() >= n_results {
                break;
            }
            let Some(&pos) = self.by_key.get(&key) else {
                warn!("Index key {} has no record in '{}'", key, self.meta.name);
                continue;
            };
            let record = &self.records[pos];
            if !matches_filters(record, where_clause, where_document) {
                continue;
            }
            hits.push(QueryHit {
                id: record.id.clone(),
                document: record.document.clone(),
                metadata: record.metadata.clone(),
                distance,
            });
        }

        Ok(hits)
    }

    /// Records selected by ids and filters, in insertion order
    pub fn get(
        &self,
        ids: Option<&[String]>,
        where_clause: Option<&Where>,
        where_document: Option<&WhereDocument>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> GetResult {
        let id_set: Option<FxHashSet<&str>> =
            ids.map(|ids| ids.iter().map(String::as_str).collect());

        let mut result = GetResult::default();
        let selected = self
            .records
            .iter()
            .filter(|r| id_set.as_ref().map_or(true, |set| set.contains(r.id.as_str())))
            .filter(|r| matches_filters(r, where_clause, where_document))
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX));

        for record in selected {
            result.ids.push(record.id.clone());
            result.documents.push(record.document.clone());
            result.metadatas.push(record.metadata.clone());
        }
        result
    }

    /// Delete the records matching every given criterion, returning their ids
    pub fn delete(
        &mut self,
        ids: Option<&[String]>,
        where_clause: Option<&Where>,
        where_document: Option<&WhereDocument>,
    ) -> Result<Vec<String>> {
        let id_set: Option<FxHashSet<&str>> =
            ids.map(|ids| ids.iter().map(String::as_str).collect());

        let (removed, kept): (Vec<Record>, Vec<Record>) =
            std::mem::take(&mut self.records).into_iter().partition(|r| {
                id_set.as_ref().map_or(true, |set| set.contains(r.id.as_str()))
                    && matches_filters(r, where_clause, where_document)
            });
        self.records = kept;

        if removed.is_empty() {
            return Ok(Vec::new());
        }
        self.reindex();

        let keys: Vec<u64> = removed.iter().map(|r| r.key).collect();
        if let Some(index) = &mut self.index {
            let dropped = index.remove(&keys)?;
            if dropped != keys.len() {
                warn!(
                    "Removed {} of {} vectors from '{}'",
                    dropped,
                    keys.len(),
                    self.meta.name
                );
            }
        }

        if let Some(dir) = &self.dir {
            rewrite_records(&dir.join(RECORDS_FILE), &self.records)?;
        }
        self.persist()?;

        debug!("Deleted {} records from '{}'", removed.len(), self.meta.name);
        Ok(removed.into_iter().map(|r| r.id).collect())
    }

    /// Save index and metadata after a mutation
    fn persist(&mut self) -> Result<()> {
        self.meta.record_count = self.records.len();
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        if let Some(index) = &self.index {
            index.save(&dir.join(INDEX_FILE))?;
        }
        self.meta.save(&dir.join(META_FILE))
    }
}

fn matches_filters(
    record: &Record,
    where_clause: Option<&Where>,
    where_document: Option<&WhereDocument>,
) -> bool {
    where_clause.map_or(true, |w| w.matches(record.metadata.as_ref()))
        && where_document.map_or(true, |w| w.matches(&record.document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Option<Metadata> {
        value.as_object().cloned()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample(dir: Option<PathBuf>) -> Collection {
        let mut collection = Collection::create("notes", Space::L2, "test", dir).unwrap();
        collection
            .add(
                strings(&["a", "b", "c"]),
                strings(&["rust is fast", "python is friendly", "rust has traits"]),
                vec![
                    meta(json!({"lang": "rust", "year": 2015})),
                    meta(json!({"lang": "python", "year": 1991})),
                    None,
                ],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
            )
            .unwrap();
        collection
    }

    #[test]
    fn test_collection_names() {
        assert!(validate_collection_name("notes").is_ok());
        assert!(validate_collection_name("my-docs_v1.2").is_ok());

        for bad in ["ab", "-notes", "notes.", "a..b", "192.168.0.1", "with space"] {
            assert!(
                matches!(
                    validate_collection_name(bad),
                    Err(StoreError::InvalidCollectionName { .. })
                ),
                "{bad} should be rejected"
            );
        }
        assert!(validate_collection_name(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_validate_ids() {
        assert!(validate_ids(&strings(&["a", "b"])).is_ok());
        assert!(matches!(validate_ids(&strings(&["a", ""])), Err(StoreError::EmptyId)));
        match validate_ids(&strings(&["a", "b", "a", "a"])) {
            Err(StoreError::DuplicateIds(ids)) => assert_eq!(ids, "a"),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_validate_metadata() {
        assert!(validate_metadata(&meta(json!({"a": 1, "b": "x", "c": true})).unwrap()).is_ok());
        assert!(validate_metadata(&meta(json!({"a": [1, 2]})).unwrap()).is_err());
        assert!(validate_metadata(&meta(json!({"a": null})).unwrap()).is_err());
    }

    #[test]
    fn test_query_nearest() {
        let collection = sample(None);
        let hits = collection.query(&[1.0, 0.0], 2, None, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_query_with_filters() {
        let collection = sample(None);

        let w = Where::from_json(&json!({"lang": "python"})).unwrap();
        let hits = collection.query(&[1.0, 0.0], 1, Some(&w), None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");

        let wd = WhereDocument::from_json(&json!({"$contains": "traits"})).unwrap();
        let hits = collection.query(&[0.0, 1.0], 3, None, Some(&wd)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c");
    }

    #[test]
    fn test_query_zero_results() {
        let collection = sample(None);
        assert!(collection.query(&[1.0, 0.0], 0, None, None).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut collection = sample(None);
        let err = collection
            .add(strings(&["d"]), strings(&["x"]), vec![None], vec![vec![1.0, 0.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 2, got: 3 }));

        assert!(collection.query(&[1.0], 1, None, None).is_err());
    }

    #[test]
    fn test_existing_ids_are_skipped() {
        let mut collection = sample(None);
        let added = collection
            .add(
                strings(&["a", "d"]),
                strings(&["replacement", "new"]),
                vec![None, None],
                vec![vec![0.5, 0.5], vec![0.5, 0.5]],
            )
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(collection.count(), 4);

        let got = collection.get(Some(&strings(&["a"])), None, None, None, None);
        assert_eq!(got.documents, strings(&["rust is fast"]));
    }

    #[test]
    fn test_get_limit_offset() {
        let collection = sample(None);
        let all = collection.get(None, None, None, None, None);
        assert_eq!(all.ids, strings(&["a", "b", "c"]));

        let page = collection.get(None, None, None, Some(1), Some(1));
        assert_eq!(page.ids, strings(&["b"]));

        let w = Where::from_json(&json!({"year": {"$gt": 2000}})).unwrap();
        let filtered = collection.get(None, Some(&w), None, None, None);
        assert_eq!(filtered.ids, strings(&["a"]));
    }

    #[test]
    fn test_delete_combines_criteria() {
        let mut collection = sample(None);
        let wd = WhereDocument::from_json(&json!({"$contains": "rust"})).unwrap();

        let deleted = collection
            .delete(Some(&strings(&["a", "b"])), None, Some(&wd))
            .unwrap();
        assert_eq!(deleted, strings(&["a"]));
        assert_eq!(collection.count(), 2);

        let hits = collection.query(&[1.0, 0.0], 3, None, None).unwrap();
        assert!(hits.iter().all(|h| h.id != "a"));

        assert!(collection.delete(Some(&strings(&["zzz"])), None, None).unwrap().is_empty());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("notes");

        let mut collection = sample(Some(dir.clone()));
        collection.delete(Some(&strings(&["b"])), None, None).unwrap();
        let id = collection.info().id;
        drop(collection);

        let reopened = Collection::open(&dir).unwrap();
        let info = reopened.info();
        assert_eq!(info.id, id);
        assert_eq!(info.dimensions, Some(2));
        assert_eq!(info.count, 2);

        let got = reopened.get(None, None, None, None, None);
        assert_eq!(got.ids, strings(&["a", "c"]));
        assert_eq!(got.metadatas[0], meta(json!({"lang": "rust", "year": 2015})));

        let hits = reopened.query(&[0.0, 1.0], 1, None, None).unwrap();
        assert_ne!(hits[0].id, "b");
    }

    #[test]
    fn test_stale_key_counter_is_advanced_on_open() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("notes");
        drop(sample(Some(dir.clone())));

        // Meta written before the last add reached it
        let meta_path = dir.join(META_FILE);
        let mut meta = CollectionMeta::load(&meta_path).unwrap();
        meta.next_key = 1;
        meta.save(&meta_path).unwrap();

        let mut collection = Collection::open(&dir).unwrap();
        collection
            .add(
                strings(&["d"]),
                strings(&["go is simple"]),
                vec![None],
                vec![vec![0.5, 0.5]],
            )
            .unwrap();

        let keys: Vec<u64> = collection.records.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
        assert_eq!(collection.meta.next_key, 4);

        let removed = collection
            .delete(Some(&strings(&["b"])), None, None)
            .unwrap();
        assert_eq!(removed, strings(&["b"]));
        let reopened = Collection::open(&dir).unwrap();
        assert!(reopened.contains("d"));
        assert!(reopened.contains("a"));
        assert!(!reopened.contains("b"));
    }

    #[test]
    fn test_empty_metadata_is_dropped() {
        let mut collection = Collection::create("notes", Space::L2, "test", None).unwrap();
        collection
            .add(strings(&["a"]), strings(&["x"]), vec![meta(json!({}))], vec![vec![1.0]])
            .unwrap();
        let got = collection.get(None, None, None, None, None);
        assert_eq!(got.metadatas, vec![None]);
    }
}
