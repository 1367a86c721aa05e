//! chroma-cli - command-line front end for a local vector database
//!
//! Manages collections and documents, runs similarity queries with metadata
//! and document-content filters, and persists everything under a single
//! database directory.

mod app;
mod backend;
mod cli;
mod config;
mod embedding;
mod http;
mod location;
mod store;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.globals.verbose {
        "chroma_cli=debug,info"
    } else {
        "chroma_cli=info,warn"
    };

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = cli.run().await {
        eprintln!("An error occurred: {:#}", e);
    }
}
