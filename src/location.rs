//! Database location and client start-up

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::embedding::EmbeddingFunction;
use crate::store::{Client, Space};

/// Environment variable consulted when no `--db-path` is given
pub const DB_PATH_ENV: &str = "CHROMA_DB_PATH";

/// Resolve the database directory
///
/// Precedence:
/// 1. Explicit path (`--db-path`)
/// 2. `CHROMA_DB_PATH`
/// 3. `<home>/.chromadb/<db_name>`
///
/// Empty values count as unset. Returns `None` only when nothing is given
/// and there is no home directory.
pub fn resolve_db_dir(
    explicit: Option<&str>,
    env_value: Option<&str>,
    home: Option<&Path>,
    db_name: &str,
) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Some(normalize(path, home));
    }
    if let Some(path) = env_value.filter(|p| !p.is_empty()) {
        return Some(normalize(path, home));
    }
    home.map(|home| home.join(".chromadb").join(db_name))
}

/// [`resolve_db_dir`] against the real environment
pub fn resolve_from_env(explicit: Option<&str>, db_name: &str) -> Option<PathBuf> {
    let env_value = std::env::var(DB_PATH_ENV).ok();
    let home = dirs::home_dir();
    resolve_db_dir(explicit, env_value.as_deref(), home.as_deref(), db_name)
}

/// Expand a leading `~` and make the path absolute
fn normalize(path: &str, home: Option<&Path>) -> PathBuf {
    let expanded = match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(path),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Open a persistent client at `dir`, or an in-memory one without a directory
pub fn open_client(
    dir: Option<PathBuf>,
    embedder: Arc<dyn EmbeddingFunction>,
    space: Space,
) -> anyhow::Result<Client> {
    match dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            info!("Initializing persistent database at: {}", dir.display());
            Ok(Client::persistent(dir, embedder, space)?)
        }
        None => {
            info!("Initializing in-memory database.");
            Ok(Client::ephemeral(embedder, space))
        }
    }
}
