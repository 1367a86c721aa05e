//! Local sentence-transformers embeddings using Candle

use std::path::PathBuf;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Encoding, Tokenizer};
use tracing::info;

use super::traits::EmbeddingFunction;

pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// BERT-family model run in-process on the CPU
pub struct LocalEmbedding {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
    dimensions: usize,
    batch_size: usize,
}

impl LocalEmbedding {
    /// Load a model from a local directory or the Hugging Face Hub
    ///
    /// `model` is either a directory holding `config.json`, `tokenizer.json`
    /// and `model.safetensors`, or a Hub repository id.
    pub fn new(model: Option<String>, batch_size: Option<usize>) -> anyhow::Result<Self> {
        let model_name = model.unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        info!("Loading local embedding model: {}", model_name);

        let device = Device::Cpu;

        let local_dir = PathBuf::from(&model_name);
        let (config_path, tokenizer_path, weights_path) = if local_dir.is_dir() {
            (
                local_dir.join("config.json"),
                local_dir.join("tokenizer.json"),
                local_dir.join("model.safetensors"),
            )
        } else {
            let api = Api::new()?;
            let repo = api.repo(Repo::new(model_name.clone(), RepoType::Model));

            let config = repo.get("config.json")?;
            let tokenizer = repo.get("tokenizer.json")?;
            let weights = repo
                .get("model.safetensors")
                .or_else(|_| repo.get("pytorch_model.bin"))?;

            (config, tokenizer, weights)
        };

        let config_content = std::fs::read_to_string(&config_path)?;
        let config: BertConfig = serde_json::from_str(&config_content)?;
        let dimensions = config.hidden_size;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
            // SAFETY: the weights file is not modified while mapped
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(weights_path, DTYPE, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        info!("Loaded model: {} dims, device: {:?}", dimensions, device);

        Ok(Self {
            model,
            tokenizer,
            device,
            name: format!("local:{}", model_name),
            dimensions,
            batch_size: batch_size.unwrap_or(32).max(1),
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let rows = encodings.len();
        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        let padded = |field: fn(&Encoding) -> &[u32]| -> anyhow::Result<Tensor> {
            let mut flat = Vec::with_capacity(rows * max_len);
            for encoding in &encodings {
                let values = field(encoding);
                flat.extend_from_slice(values);
                flat.resize(flat.len() + max_len - values.len(), 0);
            }
            Ok(Tensor::from_vec(flat, (rows, max_len), &self.device)?)
        };

        let input_ids = padded(Encoding::get_ids)?;
        let token_type_ids = padded(Encoding::get_type_ids)?;
        let attention_mask = padded(Encoding::get_attention_mask)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = mean_pooling(&output, &attention_mask)?;
        let normalized = l2_normalize(&pooled)?;

        Ok(normalized.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}

/// Average token vectors, ignoring padding
fn mean_pooling(output: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
    // output: (batch, seq_len, hidden), mask: (batch, seq_len)
    let mask = attention_mask.to_dtype(output.dtype())?;
    let summed = output.broadcast_mul(&mask.unsqueeze(2)?)?.sum(1)?;
    let counts = mask.sum_keepdim(1)?.clamp(1e-9, f64::INFINITY)?;
    Ok(summed.broadcast_div(&counts)?)
}

fn l2_normalize(embeddings: &Tensor) -> anyhow::Result<Tensor> {
    let norm = embeddings
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-12, f64::INFINITY)?;
    Ok(embeddings.broadcast_div(&norm)?)
}

#[async_trait]
impl EmbeddingFunction for LocalEmbedding {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.embed_batch(batch)?);
        }
        Ok(all_embeddings)
    }
}
