//! Application facade - one method per CLI action
//!
//! Every method validates its inputs, calls the database client, prints a
//! human-readable summary and returns a value. Errors never escape: they are
//! printed and turned into an empty or `None` result.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::debug;

use crate::store::{
    AddRequest, CollectionInfo, DeleteRequest, GetRequest, GetResult, Metadata, QueryRequest,
    QueryResult, StoreError, VectorClient,
};

/// Default number of neighbours returned per query text
pub const DEFAULT_N_RESULTS: usize = 5;

/// How a document operation failed
enum OpError {
    /// The collection could not be opened or created
    Collection { name: String, source: StoreError },
    /// The operation itself failed
    Operation(StoreError),
}

impl OpError {
    fn report(&self, verb: &str, noun: &str) {
        match self {
            OpError::Collection { name, source } => eprintln!(
                "Error {} {}: Could not get or create collection '{}': {}",
                verb, noun, name, source
            ),
            OpError::Operation(e) => eprintln!(
                "An unexpected error occurred while {} {}: {}",
                verb, noun, e
            ),
        }
    }
}

impl From<StoreError> for OpError {
    fn from(e: StoreError) -> Self {
        OpError::Operation(e)
    }
}

/// Collection and document operations over a [`VectorClient`]
pub struct ChromaApp<C> {
    client: C,
}

impl<C: VectorClient> ChromaApp<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Open the collection every document operation works on
    fn acquire(&mut self, name: &str) -> Result<CollectionInfo, OpError> {
        self.client
            .get_or_create_collection(name)
            .map_err(|source| OpError::Collection {
                name: name.to_string(),
                source,
            })
    }

    /// Create a collection; `None` if it exists or cannot be created
    pub fn create_collection(&mut self, name: &str) -> Option<CollectionInfo> {
        match self.client.create_collection(name) {
            Ok(info) => {
                println!("Collection '{}' created successfully.", name);
                Some(info)
            }
            Err(e) => {
                eprintln!("Error creating collection '{}': {}", name, e);
                None
            }
        }
    }

    /// Delete a collection, returning whether it was removed
    pub fn delete_collection(&mut self, name: &str) -> bool {
        match self.client.delete_collection(name) {
            Ok(()) => {
                println!("Collection '{}' deleted successfully.", name);
                true
            }
            Err(e) => {
                eprintln!("Error deleting collection '{}': {}", name, e);
                false
            }
        }
    }

    /// Print and return every collection
    pub fn list_collections(&mut self) -> Vec<CollectionInfo> {
        match self.client.list_collections() {
            Ok(collections) => {
                if collections.is_empty() {
                    println!("No collections found.");
                } else {
                    println!("Available Collections:");
                    for collection in &collections {
                        println!("- {}", collection.name);
                        debug!(
                            "{}: id={} space={} dimensions={:?} count={}",
                            collection.name,
                            collection.id,
                            collection.space,
                            collection.dimensions,
                            collection.count
                        );
                    }
                }
                collections
            }
            Err(e) => {
                eprintln!("Error listing collections: {}", e);
                Vec::new()
            }
        }
    }

    /// Add documents, creating the collection if needed
    ///
    /// Returns the ids that were stored, or `None` when nothing was sent.
    pub async fn add_documents(
        &mut self,
        collection: &str,
        documents: Vec<String>,
        metadatas: Option<Vec<Option<Metadata>>>,
        ids: Option<Vec<String>>,
    ) -> Option<Vec<String>> {
        if documents.is_empty() {
            println!("No documents provided to add.");
            return None;
        }

        let metadatas = metadatas.filter(|m| !m.is_empty());
        if metadatas.as_ref().is_some_and(|m| m.len() != documents.len()) {
            eprintln!("Error: Length of metadatas must match length of documents.");
            return None;
        }

        let ids = ids.filter(|ids| !ids.is_empty());
        if ids.as_ref().is_some_and(|ids| ids.len() != documents.len()) {
            eprintln!("Error: Length of ids must match length of documents.");
            return None;
        }

        let request = AddRequest {
            documents,
            metadatas,
            ids,
        };
        match self.add_inner(collection, request).await {
            Ok(added) => {
                println!(
                    "Added {} document(s) to collection '{}'.",
                    added.len(),
                    collection
                );
                Some(added)
            }
            Err(e) => {
                e.report("adding", "documents");
                None
            }
        }
    }

    async fn add_inner(
        &mut self,
        collection: &str,
        request: AddRequest,
    ) -> Result<Vec<String>, OpError> {
        self.acquire(collection)?;
        let progress = spinner(format!("Embedding {} document(s)...", request.documents.len()));
        let result = self.client.add(collection, request).await;
        progress.finish_and_clear();
        Ok(result?)
    }

    /// Query a collection and print one result group per query text
    pub async fn query_documents(
        &mut self,
        collection: &str,
        query_texts: Vec<String>,
        n_results: usize,
        where_clause: Option<Value>,
        where_document: Option<Value>,
    ) -> Option<QueryResult> {
        if query_texts.is_empty() {
            println!("No query texts provided.");
            return None;
        }

        let request = QueryRequest {
            query_texts: query_texts.clone(),
            n_results,
            where_clause: non_empty(where_clause),
            where_document: non_empty(where_document),
        };

        match self.query_inner(collection, request).await {
            Ok(results) => {
                print_query_results(collection, &query_texts, &results);
                Some(results)
            }
            Err(e) => {
                e.report("querying", "documents");
                None
            }
        }
    }

    async fn query_inner(
        &mut self,
        collection: &str,
        request: QueryRequest,
    ) -> Result<QueryResult, OpError> {
        self.acquire(collection)?;
        let progress = spinner(format!("Searching '{}'...", collection));
        let result = self.client.query(collection, request).await;
        progress.finish_and_clear();
        Ok(result?)
    }

    /// Delete documents matching ids and filters (combined with AND)
    ///
    /// Returns the deleted ids; empty when nothing matched or on error.
    pub fn delete_documents(
        &mut self,
        collection: &str,
        ids: Option<Vec<String>>,
        where_clause: Option<Value>,
        where_document: Option<Value>,
    ) -> Vec<String> {
        let request = DeleteRequest {
            ids: ids.filter(|ids| !ids.is_empty()),
            where_clause: non_empty(where_clause),
            where_document: non_empty(where_document),
        };
        if request.is_unbounded() {
            println!("No IDs or filters provided for deletion. Specify at least one criterion.");
            return Vec::new();
        }

        let result = self
            .acquire(collection)
            .and_then(|_| Ok(self.client.delete(collection, request)?));

        match result {
            Ok(deleted) if deleted.is_empty() => {
                println!(
                    "No documents matched the criteria for deletion in collection '{}'.",
                    collection
                );
                deleted
            }
            Ok(deleted) => {
                println!(
                    "Deleted {} document(s) from collection '{}'.",
                    deleted.len(),
                    collection
                );
                println!("Deleted IDs: {:?}", deleted);
                deleted
            }
            Err(e) => {
                e.report("deleting", "documents");
                Vec::new()
            }
        }
    }

    /// Print and return every document in a collection
    pub fn get_all_documents(&mut self, collection: &str) -> Option<GetResult> {
        let result = self
            .acquire(collection)
            .and_then(|_| Ok(self.client.get(collection, GetRequest::default())?));

        match result {
            Ok(all) => {
                if all.is_empty() {
                    println!("No documents found in collection '{}'.", collection);
                } else {
                    println!(
                        "Retrieved {} documents from collection '{}':",
                        all.len(),
                        collection
                    );
                    for ((id, document), metadata) in
                        all.ids.iter().zip(&all.documents).zip(&all.metadatas)
                    {
                        println!("\n--- Document ID: {} ---", id);
                        println!("  Document: {}", document);
                        if let Some(metadata) = metadata {
                            println!("  Metadata: {}", display_metadata(metadata));
                        }
                    }
                }
                Some(all)
            }
            Err(e) => {
                e.report("retrieving all", "documents");
                None
            }
        }
    }
}

fn print_query_results(collection: &str, query_texts: &[String], results: &QueryResult) {
    println!("Query results from collection '{}':", collection);
    if results.ids.is_empty() {
        println!("No results found for the query.");
        return;
    }

    for (i, query) in query_texts.iter().enumerate().take(results.len()) {
        println!("\n--- Query: '{}' ---", query);
        if results.ids[i].is_empty() {
            println!("  No matching documents found.");
            continue;
        }
        for (j, id) in results.ids[i].iter().enumerate() {
            println!("  Result {} (ID: {}):", j + 1, id);
            println!("    Document: {}", results.documents[i][j]);
            println!("    Distance: {:.4}", results.distances[i][j]);
            if let Some(metadata) = &results.metadatas[i][j] {
                println!("    Metadata: {}", display_metadata(metadata));
            }
        }
    }
}

fn display_metadata(metadata: &Metadata) -> Value {
    Value::Object(metadata.clone())
}

/// An empty JSON object means "no filter"
fn non_empty(filter: Option<Value>) -> Option<Value> {
    filter.filter(|f| f.as_object().map_or(true, |obj| !obj.is_empty()))
}

/// Spinner on stderr; invisible when stderr is not a terminal
fn spinner(message: String) -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::WordEmbedding;
    use crate::store::{Client, Result as StoreResult, Space};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    /// Fake client that records calls and can refuse collections
    #[derive(Default)]
    struct RecordingClient {
        calls: Vec<String>,
        refuse_collections: bool,
        deleted: Vec<String>,
    }

    impl RecordingClient {
        fn refusing() -> Self {
            Self {
                refuse_collections: true,
                ..Default::default()
            }
        }

        fn info(name: &str) -> CollectionInfo {
            CollectionInfo {
                id: "id".to_string(),
                name: name.to_string(),
                space: Space::L2,
                dimensions: None,
                count: 0,
            }
        }
    }

    #[async_trait]
    impl VectorClient for RecordingClient {
        fn create_collection(&mut self, name: &str) -> StoreResult<CollectionInfo> {
            self.calls.push(format!("create:{}", name));
            Ok(Self::info(name))
        }

        fn get_or_create_collection(&mut self, name: &str) -> StoreResult<CollectionInfo> {
            self.calls.push(format!("get_or_create:{}", name));
            if self.refuse_collections {
                return Err(StoreError::InvalidCollectionName {
                    name: name.to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(Self::info(name))
        }

        fn delete_collection(&mut self, name: &str) -> StoreResult<()> {
            self.calls.push(format!("delete_collection:{}", name));
            Err(StoreError::CollectionNotFound(name.to_string()))
        }

        fn list_collections(&mut self) -> StoreResult<Vec<CollectionInfo>> {
            self.calls.push("list".to_string());
            Err(StoreError::Io(std::io::Error::other("disk gone")))
        }

        async fn add(&mut self, collection: &str, request: AddRequest) -> StoreResult<Vec<String>> {
            self.calls.push(format!("add:{}", collection));
            Ok(request
                .ids
                .unwrap_or_else(|| vec!["gen".to_string(); request.documents.len()]))
        }

        async fn query(
            &mut self,
            collection: &str,
            request: QueryRequest,
        ) -> StoreResult<QueryResult> {
            self.calls.push(format!(
                "query:{}:{}:{}",
                collection,
                request.n_results,
                request.where_clause.is_some()
            ));
            let mut result = QueryResult::default();
            for _ in &request.query_texts {
                result.push_group(Vec::new());
            }
            Ok(result)
        }

        fn get(&mut self, collection: &str, _request: GetRequest) -> StoreResult<GetResult> {
            self.calls.push(format!("get:{}", collection));
            Ok(GetResult::default())
        }

        fn delete(&mut self, collection: &str, request: DeleteRequest) -> StoreResult<Vec<String>> {
            self.calls.push(format!("delete:{}", collection));
            Ok(request.ids.unwrap_or_else(|| self.deleted.clone()))
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_without_documents_makes_no_call() {
        let mut app = ChromaApp::new(RecordingClient::default());
        assert!(app.add_documents("notes", Vec::new(), None, None).await.is_none());
        assert!(app.client.calls.is_empty());
    }

    #[tokio::test]
    async fn test_add_length_mismatch_makes_no_call() {
        let mut app = ChromaApp::new(RecordingClient::default());

        let metadatas = Some(vec![None, None, None]);
        let added = app
            .add_documents("notes", strings(&["a", "b"]), metadatas, None)
            .await;
        assert!(added.is_none());

        let ids = Some(strings(&["1"]));
        let added = app.add_documents("notes", strings(&["a", "b"]), None, ids).await;
        assert!(added.is_none());

        assert!(app.client.calls.is_empty());
    }

    #[tokio::test]
    async fn test_add_acquires_collection_first() {
        let mut app = ChromaApp::new(RecordingClient::default());
        let added = app
            .add_documents("notes", strings(&["a"]), Some(Vec::new()), Some(strings(&["x"])))
            .await;
        assert_eq!(added, Some(strings(&["x"])));
        assert_eq!(app.client.calls, strings(&["get_or_create:notes", "add:notes"]));
    }

    #[tokio::test]
    async fn test_collection_failure_stops_add() {
        let mut app = ChromaApp::new(RecordingClient::refusing());
        assert!(app.add_documents("notes", strings(&["a"]), None, None).await.is_none());
        assert_eq!(app.client.calls, strings(&["get_or_create:notes"]));
    }

    #[tokio::test]
    async fn test_query_validation_and_forwarding() {
        let mut app = ChromaApp::new(RecordingClient::default());
        assert!(app
            .query_documents("notes", Vec::new(), 5, None, None)
            .await
            .is_none());
        assert!(app.client.calls.is_empty());

        let result = app
            .query_documents("notes", strings(&["q1", "q2"]), 0, Some(json!({})), None)
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.is_empty());
        assert_eq!(
            app.client.calls,
            strings(&["get_or_create:notes", "query:notes:0:false"])
        );
    }

    #[test]
    fn test_delete_requires_a_criterion() {
        let mut app = ChromaApp::new(RecordingClient::default());
        assert!(app.delete_documents("notes", None, None, None).is_empty());
        assert!(app
            .delete_documents("notes", Some(Vec::new()), Some(json!({})), Some(json!({})))
            .is_empty());
        assert!(app.client.calls.is_empty());

        let deleted = app.delete_documents("notes", Some(strings(&["a"])), None, None);
        assert_eq!(deleted, strings(&["a"]));
        assert_eq!(app.client.calls, strings(&["get_or_create:notes", "delete:notes"]));
    }

    #[test]
    fn test_errors_become_empty_results() {
        let mut app = ChromaApp::new(RecordingClient::refusing());
        assert!(app.list_collections().is_empty());
        assert!(!app.delete_collection("notes"));
        assert!(app.get_all_documents("notes").is_none());
        assert!(app
            .delete_documents("notes", None, Some(json!({"k": "v"})), None)
            .is_empty());
    }

    #[test]
    fn test_create_collection() {
        let mut app = ChromaApp::new(RecordingClient::default());
        let info = app.create_collection("notes").unwrap();
        assert_eq!(info.name, "notes");
    }

    #[tokio::test]
    async fn test_roundtrip_through_real_client() {
        let client = Client::ephemeral(Arc::new(WordEmbedding::default()), Space::L2);
        let mut app = ChromaApp::new(client);

        let metadatas = vec![
            json!({"k": "1"}).as_object().cloned(),
            json!({"k": "2"}).as_object().cloned(),
        ];
        let added = app
            .add_documents(
                "notes",
                strings(&["first document", "second document"]),
                Some(metadatas.clone()),
                Some(strings(&["a", "b"])),
            )
            .await
            .unwrap();
        assert_eq!(added, strings(&["a", "b"]));

        let all = app.get_all_documents("notes").unwrap();
        assert_eq!(all.ids, strings(&["a", "b"]));
        assert_eq!(all.documents, strings(&["first document", "second document"]));
        assert_eq!(all.metadatas, metadatas);

        let results = app
            .query_documents(
                "notes",
                strings(&["second document"]),
                DEFAULT_N_RESULTS,
                Some(json!({"k": "2"})),
                None,
            )
            .await
            .unwrap();
        assert_eq!(results.ids, vec![strings(&["b"])]);

        let deleted = app.delete_documents(
            "notes",
            None,
            None,
            Some(json!({"$contains": "first"})),
        );
        assert_eq!(deleted, strings(&["a"]));
        assert_eq!(app.get_all_documents("notes").unwrap().ids, strings(&["b"]));
    }
}
