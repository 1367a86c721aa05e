//! Ollama embedding function

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http::{check_response, create_client};

use super::models::known_dimensions;
use super::traits::EmbeddingFunction;

pub const DEFAULT_OLLAMA_MODEL: &str = "all-minilm";
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Ollama embedding function
pub struct OllamaEmbedding {
    client: Client,
    host: String,
    model_name: String,
    name: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding function
    pub fn new(
        model_name: Option<String>,
        host: Option<String>,
        batch_size: Option<usize>,
    ) -> anyhow::Result<Self> {
        let model_name = model_name.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
        let host = host
            .or_else(|| env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
        let host = host.trim_end_matches('/').to_string();

        let dimensions = known_dimensions(&model_name).unwrap_or(0);

        info!("Ollama embedding function: {} @ {}", model_name, host);

        Ok(Self {
            client: create_client()?,
            name: format!("ollama:{}", model_name),
            host,
            model_name,
            dimensions,
            batch_size: batch_size.unwrap_or(32).max(1),
        })
    }
}

#[async_trait]
impl EmbeddingFunction for OllamaEmbedding {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = EmbedRequest {
                model: &self.model_name,
                input: batch,
            };

            let response = self
                .client
                .post(format!("{}/api/embed", self.host))
                .json(&request)
                .send()
                .await?;
            let response = check_response(response, "Ollama").await?;

            let embed_response: EmbedResponse = response.json().await?;
            all_embeddings.extend(embed_response.embeddings);
        }

        Ok(all_embeddings)
    }
}
