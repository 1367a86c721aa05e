//! Embedding function trait

use async_trait::async_trait;

/// Turns texts into fixed-length vectors
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Identifier recorded on collections created with this function
    fn name(&self) -> &str;

    /// Get embedding dimensions, 0 when only known after the first call
    fn dimensions(&self) -> usize;

    /// Compute embeddings for texts, one vector per text
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}
