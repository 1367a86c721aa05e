//! Config command - manage chroma-cli configuration

use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let path = Config::config_path();

    match args.command {
        ConfigCommands::Show => {
            let config = Config::load_from(&path);

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", path.display());
            }
            println!();
            println!("[database]");
            println!("name = \"{}\"", config.database.name);
            println!();
            println!("[collection]");
            println!("space = \"{}\"", config.collection.space);
            println!();
            println!("[embedding]");
            println!("provider = \"{}\"", config.embedding.provider);
            if let Some(model) = &config.embedding.model {
                println!("model = \"{}\"", model);
            }
            if let Some(host) = &config.embedding.host {
                println!("host = \"{}\"", host);
            }
            if let Some(base_url) = &config.embedding.base_url {
                println!("base_url = \"{}\"", base_url);
            }
            if config.embedding.api_key.is_some() {
                println!("api_key = \"***\"");
            }
            if let Some(batch_size) = config.embedding.batch_size {
                println!("batch_size = {}", batch_size);
            }
        }

        ConfigCommands::Init { force } => {
            if !Config::write_example(&path, force)? {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            println!("Created config file at {}", path.display());
            println!();
            println!("Edit the file to choose the database name and embedding function.");
        }

        ConfigCommands::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}
