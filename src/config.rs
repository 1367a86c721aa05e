//! Configuration file support for chroma-cli
//!
//! Config file location: ~/.config/chroma-cli/config.toml
//! (override with `CHROMA_CLI_CONFIG`)
//!
//! Example config:
//! ```toml
//! [database]
//! name = "my_chroma_app_db"
//!
//! [collection]
//! space = "l2"  # l2, ip, cosine
//!
//! [embedding]
//! provider = "default"  # default, local, ollama, openai, zero
//! # model = "all-minilm"
//! # host = "http://localhost:11434"  # for ollama
//! # api_key = "sk-..."  # for openai
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::store::Space;

/// Database name used when neither `--db-name` nor the config file sets one
pub const DEFAULT_DB_NAME: &str = "my_chroma_app_db";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "CHROMA_CLI_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

/// Database naming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory name under ~/.chromadb/
    #[serde(default = "default_db_name")]
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_db_name(),
        }
    }
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

/// Settings applied to newly created collections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Distance space: l2, ip, cosine
    #[serde(default)]
    pub space: Space,
}

/// Embedding function configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type: default, local, ollama, openai, zero
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name; each provider has its own default
    pub model: Option<String>,

    /// Host for Ollama (e.g., http://localhost:11434)
    pub host: Option<String>,

    /// Base URL for OpenAI-compatible APIs
    pub base_url: Option<String>,

    /// API key for OpenAI
    pub api_key: Option<String>,

    /// Batch size for embedding requests
    pub batch_size: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            host: None,
            base_url: None,
            api_key: None,
            batch_size: None,
        }
    }
}

fn default_provider() -> String {
    "default".to_string()
}

const EXAMPLE_CONFIG: &str = r#"# chroma-cli configuration

[database]
# Directory name under ~/.chromadb/ (overridden by --db-name)
name = "my_chroma_app_db"

[collection]
# Distance space for new collections: l2, ip, cosine
space = "l2"

[embedding]
# Provider: default, local, ollama, openai, zero
#   default/local: sentence-transformers/all-MiniLM-L6-v2 run locally
#                  (needs the local-embeddings feature)
#   zero:          384-dimension zero vectors, for testing only
provider = "default"

# Model name (provider-specific)
# Ollama: all-minilm, nomic-embed-text, mxbai-embed-large
# OpenAI: text-embedding-3-small, text-embedding-3-large
# model = "all-minilm"

# Ollama host (default: http://localhost:11434)
# host = "http://localhost:11434"

# OpenAI-compatible base URL
# base_url = "https://api.openai.com/v1"

# API key (or set OPENAI_API_KEY)
# api_key = "sk-..."

# Batch size for embedding requests (default: 32 for ollama, 100 for openai)
# batch_size = 32
"#;

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chroma-cli")
            .join("config.toml")
    }

    /// Load config from the default location, returning defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, returning defaults if missing or unparsable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config file {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Write the commented example config to `path`
    ///
    /// Returns `false` without touching the file if it exists and `force` is
    /// not set.
    pub fn write_example(path: &Path, force: bool) -> anyhow::Result<bool> {
        if path.exists() && !force {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, EXAMPLE_CONFIG)?;
        Ok(true)
    }
}
