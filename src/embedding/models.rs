//! Known embedding model dimensions

/// Output dimensions of well-known embedding models
///
/// Version tags such as `:latest` and organisation prefixes such as
/// `sentence-transformers/` are ignored.
pub fn known_dimensions(model_name: &str) -> Option<usize> {
    let base_name = model_name.split(':').next().unwrap_or(model_name);
    let base_name = base_name.rsplit('/').next().unwrap_or(base_name);

    let dims = match base_name {
        "all-minilm" | "all-MiniLM-L6-v2" | "all-MiniLM-L12-v2" => 384,
        "bge-small-en-v1.5" | "e5-small-v2" | "gte-small" => 384,
        "all-mpnet-base-v2" | "nomic-embed-text" | "bge-base-en-v1.5" => 768,
        "mxbai-embed-large" | "bge-m3" | "snowflake-arctic-embed" => 1024,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "text-embedding-3-large" => 3072,
        _ => return None,
    };
    Some(dims)
}
