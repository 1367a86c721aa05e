//! Collection command - create, delete and list collections

use clap::{Args, Subcommand};

use super::{open_app, GlobalArgs};

#[derive(Args)]
pub struct CollectionArgs {
    #[command(subcommand)]
    pub command: CollectionCommands,
}

#[derive(Subcommand)]
pub enum CollectionCommands {
    /// Create a new collection
    Create {
        /// Name of the collection to create
        name: String,
    },

    /// Delete a collection
    Delete {
        /// Name of the collection to delete
        name: String,
    },

    /// List all collections
    List,
}

pub fn run(args: CollectionArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let mut app = open_app(globals)?;

    match args.command {
        CollectionCommands::Create { name } => {
            app.create_collection(&name);
        }
        CollectionCommands::Delete { name } => {
            app.delete_collection(&name);
        }
        CollectionCommands::List => {
            app.list_collections();
        }
    }

    Ok(())
}
