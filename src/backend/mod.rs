//! Backend module - vector search on top of usearch HNSW

mod hnsw;
mod traits;

pub use hnsw::HnswIndex;
pub use traits::VectorIndex;
