//! Zero-vector embedding function

use async_trait::async_trait;

use super::traits::EmbeddingFunction;

/// Maps every text to the zero vector
///
/// Used when the configured embedding function cannot be loaded. Documents
/// can still be stored and listed, but query distances carry no meaning.
pub struct ZeroEmbedding {
    dimensions: usize,
}

impl ZeroEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingFunction for ZeroEmbedding {
    fn name(&self) -> &str {
        "zero"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(vec![vec![0.0; self.dimensions]; texts.len()])
    }
}
