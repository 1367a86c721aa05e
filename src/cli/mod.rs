//! CLI module - command definitions and handlers

mod collection;
mod config_cmd;
mod document;

use clap::{CommandFactory, Parser, Subcommand};

pub use collection::CollectionArgs;
pub use config_cmd::ConfigArgs;
pub use document::DocumentArgs;

use crate::app::ChromaApp;
use crate::config::{Config, DEFAULT_DB_NAME};
use crate::embedding;
use crate::location::{open_client, resolve_from_env};
use crate::store::Client;

/// chroma-cli - manage a local vector database from the command line
#[derive(Parser)]
#[command(name = "chroma-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Explicit path to the database directory. Overrides CHROMA_DB_PATH and the default
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Database name, used in the default path (~/.chromadb/<db_name>/).
    /// Defaults to the config file's value or 'my_chroma_app_db'. Ignored if --db-path is given
    #[arg(long, global = true)]
    pub db_name: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage collections
    Collection(CollectionArgs),

    /// Manage documents within a collection
    Document(DocumentArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Collection(args)) => collection::run(args, &self.globals),
            Some(Commands::Document(args)) => document::run(args, &self.globals).await,
            Some(Commands::Config(args)) => config_cmd::run(args),
            None => {
                Cli::command().print_help()?;
                Ok(())
            }
        }
    }
}

/// Resolve the database location and embedding function, then open the app
pub(crate) fn open_app(globals: &GlobalArgs) -> anyhow::Result<ChromaApp<Client>> {
    let config = Config::load();

    let db_name = db_name(globals.db_name.as_deref(), &config);
    let db_dir = resolve_from_env(globals.db_path.as_deref(), &db_name);
    let embedder = embedding::load_or_fallback(&config.embedding);
    let client = open_client(db_dir, embedder, config.collection.space)?;

    Ok(ChromaApp::new(client))
}

/// `--db-name`, else the config file's `[database] name`, else the default
fn db_name(flag: Option<&str>, config: &Config) -> String {
    flag.filter(|name| !name.is_empty())
        .or(Some(config.database.name.as_str()).filter(|name| !name.is_empty()))
        .unwrap_or(DEFAULT_DB_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_parses() {
        let cli = Cli::try_parse_from(["chroma-cli"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.globals.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chroma-cli",
            "collection",
            "list",
            "--db-path",
            "/tmp/db",
            "--db-name",
            "other",
        ])
        .unwrap();
        assert_eq!(cli.globals.db_path.as_deref(), Some("/tmp/db"));
        assert_eq!(cli.globals.db_name.as_deref(), Some("other"));
    }

    #[test]
    fn test_db_name_precedence() {
        let mut config = Config::default();
        config.database.name = "from_config".to_string();
        assert_eq!(db_name(Some("flag"), &config), "flag");
        assert_eq!(db_name(Some(""), &config), "from_config");
        assert_eq!(db_name(None, &config), "from_config");

        config.database.name.clear();
        assert_eq!(db_name(None, &config), DEFAULT_DB_NAME);
    }
}
