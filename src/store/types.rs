//! Request and result types shared by the client and its callers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document metadata: string keys mapped to scalar JSON values
pub type Metadata = serde_json::Map<String, Value>;

/// Distance space of a collection's vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// Squared euclidean distance
    #[default]
    L2,
    /// Inner product distance (1 - dot)
    Ip,
    /// Cosine distance
    Cosine,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::L2 => write!(f, "l2"),
            Space::Ip => write!(f, "ip"),
            Space::Cosine => write!(f, "cosine"),
        }
    }
}

impl FromStr for Space {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" => Ok(Space::L2),
            "ip" => Ok(Space::Ip),
            "cosine" => Ok(Space::Cosine),
            other => Err(format!("unknown distance space '{}' (expected l2, ip or cosine)", other)),
        }
    }
}

/// Summary of a collection as returned by create/list calls
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
    pub space: Space,
    pub dimensions: Option<usize>,
    pub count: usize,
}

/// Documents to add to a collection
#[derive(Debug, Clone, Default)]
pub struct AddRequest {
    pub documents: Vec<String>,
    /// One entry per document when present
    pub metadatas: Option<Vec<Option<Metadata>>>,
    /// One id per document when present; generated otherwise
    pub ids: Option<Vec<String>>,
}

/// Similarity query against a collection
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query_texts: Vec<String>,
    pub n_results: usize,
    pub where_clause: Option<Value>,
    pub where_document: Option<Value>,
}

/// Column-oriented query results, one inner vector per query text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<Option<Metadata>>>,
    pub distances: Vec<Vec<f32>>,
}

impl QueryResult {
    /// Append the hits of one query as a new result group
    pub fn push_group(&mut self, hits: Vec<QueryHit>) {
        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());

        for hit in hits {
            ids.push(hit.id);
            documents.push(hit.document);
            metadatas.push(hit.metadata);
            distances.push(hit.distance);
        }

        self.ids.push(ids);
        self.documents.push(documents);
        self.metadatas.push(metadatas);
        self.distances.push(distances);
    }

    /// Number of result groups (one per query text)
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no group holds any hit
    pub fn is_empty(&self) -> bool {
        self.ids.iter().all(|group| group.is_empty())
    }
}

/// A single nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Option<Metadata>,
    pub distance: f32,
}

/// Selection of records to fetch; all fields empty means "everything"
#[derive(Debug, Clone, Default)]
pub struct GetRequest {
    pub ids: Option<Vec<String>>,
    pub where_clause: Option<Value>,
    pub where_document: Option<Value>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Column-oriented get results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Option<Metadata>>,
}

impl GetResult {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Selection of records to delete; criteria combine with AND
#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub ids: Option<Vec<String>>,
    pub where_clause: Option<Value>,
    pub where_document: Option<Value>,
}

impl DeleteRequest {
    /// True when no criterion is set
    pub fn is_unbounded(&self) -> bool {
        self.ids.is_none() && self.where_clause.is_none() && self.where_document.is_none()
    }
}
