//! OpenAI embedding function

use std::env;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use tracing::info;

use super::models::known_dimensions;
use super::traits::EmbeddingFunction;

pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// OpenAI (or OpenAI-compatible) embedding function
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model_name: String,
    name: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding function; fails without an API key
    pub fn new(
        model_name: Option<String>,
        api_key: Option<String>,
        base_url: Option<String>,
        batch_size: Option<usize>,
    ) -> anyhow::Result<Self> {
        let model_name = model_name.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let api_key = api_key
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = base_url.or_else(|| env::var("OPENAI_BASE_URL").ok()) {
            config = config.with_api_base(base_url);
        }

        let dimensions = known_dimensions(&model_name).unwrap_or(0);

        info!(
            "OpenAI embedding function: {} ({} dims)",
            model_name,
            if dimensions == 0 {
                "auto".to_string()
            } else {
                dimensions.to_string()
            }
        );

        Ok(Self {
            client: Client::with_config(config),
            name: format!("openai:{}", model_name),
            model_name,
            dimensions,
            batch_size: batch_size.unwrap_or(100).max(1),
        })
    }
}

#[async_trait]
impl EmbeddingFunction for OpenAIEmbedding {
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
            let input: Vec<String> = batch.iter().map(|s| s.to_string()).collect();
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model_name)
                .input(EmbeddingInput::StringArray(input))
                .build()?;

            let response = self.client.embeddings().create(request).await?;

            // The API tags each vector with its input position
            let mut data = response.data;
            data.sort_by_key(|d| d.index);
            all_embeddings.extend(data.into_iter().map(|d| d.embedding));
        }

        Ok(all_embeddings)
    }
}
