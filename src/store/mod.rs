//! Store module - collections, records, filters and the database client

mod client;
mod collection;
mod error;
mod filter;
mod meta;
mod records;
mod types;

pub use client::{Client, VectorClient};
pub use error::{Result, StoreError};
pub use meta::HnswParams;
pub use types::{
    AddRequest, CollectionInfo, DeleteRequest, GetRequest, GetResult, Metadata, QueryRequest,
    QueryResult, Space,
};
