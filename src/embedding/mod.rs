//! Embedding module - turn documents and queries into vectors

mod models;
mod ollama;
mod openai;
mod traits;
mod zero;

#[cfg(feature = "local-embeddings")]
mod candle;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::EmbeddingConfig;

pub use traits::EmbeddingFunction;
pub use zero::ZeroEmbedding;

/// Dimensions of the fallback zero-vector function (all-MiniLM-L6-v2 size)
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Build the embedding function named by the config
pub fn from_config(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingFunction>> {
    let function: Arc<dyn EmbeddingFunction> = match config.provider.as_str() {
        "default" | "local" => load_local(config)?,
        "ollama" => Arc::new(ollama::OllamaEmbedding::new(
            config.model.clone(),
            config.host.clone(),
            config.batch_size,
        )?),
        "openai" => Arc::new(openai::OpenAIEmbedding::new(
            config.model.clone(),
            config.api_key.clone(),
            config.base_url.clone(),
            config.batch_size,
        )?),
        "zero" => Arc::new(ZeroEmbedding::new(DEFAULT_DIMENSIONS)),
        other => anyhow::bail!(
            "Unknown embedding provider '{}' (expected default, local, ollama, openai or zero)",
            other
        ),
    };

    info!(
        "Using embedding function: {} ({} dims)",
        function.name(),
        function.dimensions()
    );
    Ok(function)
}

/// Build the configured embedding function, substituting zero vectors on failure
pub fn load_or_fallback(config: &EmbeddingConfig) -> Arc<dyn EmbeddingFunction> {
    match from_config(config) {
        Ok(function) => function,
        Err(e) => {
            warn!(
                "Could not load embedding function '{}': {:#}",
                config.provider, e
            );
            warn!("Using a zero-vector embedding function. Document additions and queries will not be meaningful.");
            Arc::new(ZeroEmbedding::new(DEFAULT_DIMENSIONS))
        }
    }
}

#[cfg(feature = "local-embeddings")]
fn load_local(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingFunction>> {
    Ok(Arc::new(candle::LocalEmbedding::new(
        config.model.clone(),
        config.batch_size,
    )?))
}

#[cfg(not(feature = "local-embeddings"))]
fn load_local(_config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingFunction>> {
    anyhow::bail!("local embeddings require building with the `local-embeddings` feature")
}
