//! Database client - the collection-level API used by the application facade

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingFunction;

use super::collection::{
    validate_collection_name, validate_ids, validate_metadata, Collection, META_FILE,
};
use super::error::{Result, StoreError};
use super::filter::{Where, WhereDocument};
use super::meta::CollectionMeta;
use super::types::{
    AddRequest, CollectionInfo, DeleteRequest, GetRequest, GetResult, Metadata, QueryRequest,
    QueryResult, Space,
};

const COLLECTIONS_DIR: &str = "collections";

/// Operations the application needs from a vector database
#[async_trait]
pub trait VectorClient: Send {
    /// Create a collection; fails if it already exists
    fn create_collection(&mut self, name: &str) -> Result<CollectionInfo>;

    /// Open a collection, creating it if needed
    fn get_or_create_collection(&mut self, name: &str) -> Result<CollectionInfo>;

    /// Delete a collection and all its records
    fn delete_collection(&mut self, name: &str) -> Result<()>;

    /// All collections, sorted by name
    fn list_collections(&mut self) -> Result<Vec<CollectionInfo>>;

    /// Embed and store documents, returning the ids actually added
    async fn add(&mut self, collection: &str, request: AddRequest) -> Result<Vec<String>>;

    /// Nearest-neighbour search, one result group per query text
    async fn query(&mut self, collection: &str, request: QueryRequest) -> Result<QueryResult>;

    /// Fetch records by id and filters
    fn get(&mut self, collection: &str, request: GetRequest) -> Result<GetResult>;

    /// Delete records matching every given criterion, returning their ids
    fn delete(&mut self, collection: &str, request: DeleteRequest) -> Result<Vec<String>>;
}

/// Local vector database
///
/// Persistent clients keep one directory per collection under
/// `<root>/collections/`; ephemeral clients hold everything in memory.
pub struct Client {
    root: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingFunction>,
    space: Space,
    collections: BTreeMap<String, Collection>,
}

impl Client {
    /// Open (or initialise) a database stored under `root`
    pub fn persistent(
        root: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingFunction>,
        space: Space,
    ) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(COLLECTIONS_DIR))?;
        info!("Opened persistent database at {}", root.display());

        Ok(Self {
            root: Some(root),
            embedder,
            space,
            collections: BTreeMap::new(),
        })
    }

    /// In-memory database; nothing outlives the process
    pub fn ephemeral(embedder: Arc<dyn EmbeddingFunction>, space: Space) -> Self {
        info!("Opened in-memory database");
        Self {
            root: None,
            embedder,
            space,
            collections: BTreeMap::new(),
        }
    }

    fn collection_dir(&self, name: &str) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(COLLECTIONS_DIR).join(name))
    }

    fn exists(&self, name: &str) -> bool {
        self.collections.contains_key(name)
            || self.collection_dir(name).is_some_and(|dir| dir.is_dir())
    }

    /// Load a collection into the cache on first use
    fn collection_mut(&mut self, name: &str) -> Result<&mut Collection> {
        if !self.collections.contains_key(name) {
            validate_collection_name(name)?;
            let dir = self
                .collection_dir(name)
                .filter(|dir| dir.is_dir())
                .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;

            let collection = Collection::open(&dir)?;
            if collection.embedding_function() != self.embedder.name() {
                warn!(
                    "Collection '{}' was created with embedding function '{}', now using '{}'",
                    name,
                    collection.embedding_function(),
                    self.embedder.name()
                );
            }
            info!("Loaded collection '{}' ({} documents)", name, collection.count());
            self.collections.insert(name.to_string(), collection);
        }

        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn insert_new(&mut self, name: &str) -> Result<CollectionInfo> {
        let collection =
            Collection::create(name, self.space, self.embedder.name(), self.collection_dir(name))?;
        let info = collection.info();
        self.collections.insert(name.to_string(), collection);
        Ok(info)
    }
}

/// Embed texts, mapping provider failures into store errors
async fn embed(embedder: &dyn EmbeddingFunction, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let embeddings = embedder
        .embed(&refs)
        .await
        .map_err(|e| StoreError::Embedding {
            name: embedder.name().to_string(),
            message: format!("{:#}", e),
        })?;

    if embeddings.len() != texts.len() {
        return Err(StoreError::Embedding {
            name: embedder.name().to_string(),
            message: format!(
                "returned {} embeddings for {} texts",
                embeddings.len(),
                texts.len()
            ),
        });
    }
    Ok(embeddings)
}

fn compile_filters(
    where_clause: Option<&serde_json::Value>,
    where_document: Option<&serde_json::Value>,
) -> Result<(Option<Where>, Option<WhereDocument>)> {
    let where_clause = where_clause.map(Where::from_json).transpose()?;
    let where_document = where_document.map(WhereDocument::from_json).transpose()?;
    Ok((where_clause, where_document))
}

#[async_trait]
impl VectorClient for Client {
    fn create_collection(&mut self, name: &str) -> Result<CollectionInfo> {
        validate_collection_name(name)?;
        if self.exists(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        self.insert_new(name)
    }

    fn get_or_create_collection(&mut self, name: &str) -> Result<CollectionInfo> {
        validate_collection_name(name)?;
        if self.exists(name) {
            return Ok(self.collection_mut(name)?.info());
        }
        self.insert_new(name)
    }

    fn delete_collection(&mut self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        if !self.exists(name) {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }
        self.collections.remove(name);
        if let Some(dir) = self.collection_dir(name).filter(|dir| dir.is_dir()) {
            std::fs::remove_dir_all(&dir)?;
        }
        debug!("Deleted collection '{}'", name);
        Ok(())
    }

    fn list_collections(&mut self) -> Result<Vec<CollectionInfo>> {
        let mut infos: BTreeMap<String, CollectionInfo> = self
            .collections
            .iter()
            .map(|(name, c)| (name.clone(), c.info()))
            .collect();

        if let Some(root) = &self.root {
            for entry in std::fs::read_dir(root.join(COLLECTIONS_DIR))? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if infos.contains_key(&name) || !entry.path().is_dir() {
                    continue;
                }
                match CollectionMeta::load(&entry.path().join(META_FILE)) {
                    Ok(meta) => {
                        infos.insert(
                            name,
                            CollectionInfo {
                                id: meta.id,
                                name: meta.name,
                                space: meta.space,
                                dimensions: meta.dimensions,
                                count: meta.record_count,
                            },
                        );
                    }
                    Err(e) => warn!("Skipping unreadable collection '{}': {}", name, e),
                }
            }
        }

        Ok(infos.into_values().collect())
    }

    async fn add(&mut self, collection: &str, request: AddRequest) -> Result<Vec<String>> {
        let embedder = Arc::clone(&self.embedder);
        let target = self.collection_mut(collection)?;

        let n = request.documents.len();
        let ids = request
            .ids
            .unwrap_or_else(|| (0..n).map(|_| uuid::Uuid::new_v4().to_string()).collect());
        let metadatas = request.metadatas.unwrap_or_else(|| vec![None; n]);

        if ids.len() != n || metadatas.len() != n {
            return Err(StoreError::LengthMismatch(format!(
                "ids: {}, documents: {}, metadatas: {}",
                ids.len(),
                n,
                metadatas.len()
            )));
        }
        validate_ids(&ids)?;
        for metadata in metadatas.iter().flatten() {
            validate_metadata(metadata)?;
        }

        // Skip known ids before paying for their embeddings
        let mut new_ids = Vec::with_capacity(n);
        let mut new_documents = Vec::with_capacity(n);
        let mut new_metadatas: Vec<Option<Metadata>> = Vec::with_capacity(n);
        for ((id, document), metadata) in ids.into_iter().zip(request.documents).zip(metadatas) {
            if target.contains(&id) {
                warn!("Add of existing embedding ID: {}", id);
                continue;
            }
            new_ids.push(id);
            new_documents.push(document);
            new_metadatas.push(metadata);
        }
        if new_ids.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = embed(embedder.as_ref(), &new_documents).await?;
        target.add(new_ids.clone(), new_documents, new_metadatas, embeddings)?;
        Ok(new_ids)
    }

    async fn query(&mut self, collection: &str, request: QueryRequest) -> Result<QueryResult> {
        let embedder = Arc::clone(&self.embedder);
        let target = self.collection_mut(collection)?;
        let (where_clause, where_document) =
            compile_filters(request.where_clause.as_ref(), request.where_document.as_ref())?;

        let mut n_results = request.n_results;
        let count = target.count();
        if n_results > count {
            warn!(
                "Number of requested results {} is greater than number of elements in index {}, updating n_results = {}",
                n_results, count, count
            );
            n_results = count;
        }

        let mut result = QueryResult::default();
        if n_results == 0 {
            for _ in &request.query_texts {
                result.push_group(Vec::new());
            }
            return Ok(result);
        }

        let embeddings = embed(embedder.as_ref(), &request.query_texts).await?;
        for embedding in &embeddings {
            let hits = target.query(
                embedding,
                n_results,
                where_clause.as_ref(),
                where_document.as_ref(),
            )?;
            result.push_group(hits);
        }
        if result.is_empty() {
            debug!("No matches in '{}' for {} queries", collection, result.len());
        }
        Ok(result)
    }

    fn get(&mut self, collection: &str, request: GetRequest) -> Result<GetResult> {
        let (where_clause, where_document) =
            compile_filters(request.where_clause.as_ref(), request.where_document.as_ref())?;
        let target = self.collection_mut(collection)?;
        Ok(target.get(
            request.ids.as_deref(),
            where_clause.as_ref(),
            where_document.as_ref(),
            request.limit,
            request.offset,
        ))
    }

    fn delete(&mut self, collection: &str, request: DeleteRequest) -> Result<Vec<String>> {
        if request.is_unbounded() {
            return Err(StoreError::UnboundedDelete);
        }
        let (where_clause, where_document) =
            compile_filters(request.where_clause.as_ref(), request.where_document.as_ref())?;
        let target = self.collection_mut(collection)?;
        target.delete(
            request.ids.as_deref(),
            where_clause.as_ref(),
            where_document.as_ref(),
        )
    }
}
