//! Document command - add, query, delete and list documents

use clap::{Args, Subcommand};
use serde_json::Value;
use tracing::warn;

use crate::app::DEFAULT_N_RESULTS;
use crate::store::Metadata;

use super::{open_app, GlobalArgs};

/// Printed when `--where` or `--where-document` is not valid JSON
pub const INVALID_JSON_MESSAGE: &str =
    "Error: Invalid JSON format for --where or --where-document. Please ensure it's valid JSON.";

#[derive(Args)]
pub struct DocumentArgs {
    #[command(subcommand)]
    pub command: DocumentCommands,
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Add documents to a collection
    Add {
        /// Name of the collection to add documents to
        collection_name: String,

        /// Text content of the document. Repeat for multiple documents
        #[arg(long = "text", required = true)]
        texts: Vec<String>,

        /// Metadata in 'key=value' format, one per document in order,
        /// or a single one applied to every document
        #[arg(long = "metadata")]
        metadatas: Vec<String>,

        /// Unique ID for the document. Repeat for multiple documents
        #[arg(long = "id")]
        ids: Vec<String>,
    },

    /// Query documents in a collection
    Query {
        /// Name of the collection to query
        collection_name: String,

        /// Text to query for similarity. Repeat for multiple queries
        #[arg(long = "query-text", required = true)]
        query_texts: Vec<String>,

        /// Number of top results to return
        #[arg(long, default_value_t = DEFAULT_N_RESULTS)]
        n_results: usize,

        /// JSON metadata filter, e.g. '{"author": "John"}'
        #[arg(long = "where")]
        where_clause: Option<String>,

        /// JSON document content filter, e.g. '{"$contains": "keyword"}'
        #[arg(long)]
        where_document: Option<String>,
    },

    /// Delete documents from a collection
    Delete {
        /// Name of the collection to delete documents from
        collection_name: String,

        /// ID of a document to delete. Repeat for multiple documents
        #[arg(long = "id")]
        ids: Vec<String>,

        /// JSON metadata filter, e.g. '{"author": "John"}'
        #[arg(long = "where")]
        where_clause: Option<String>,

        /// JSON document content filter, e.g. '{"$contains": "keyword"}'
        #[arg(long)]
        where_document: Option<String>,
    },

    /// Retrieve all documents from a collection
    GetAll {
        /// Name of the collection to retrieve documents from
        collection_name: String,
    },
}

pub async fn run(args: DocumentArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    match args.command {
        DocumentCommands::Add {
            collection_name,
            texts,
            metadatas,
            ids,
        } => {
            let metadatas = resolve_metadatas(&metadatas, texts.len());
            let ids = (!ids.is_empty()).then_some(ids);

            let mut app = open_app(globals)?;
            app.add_documents(&collection_name, texts, metadatas, ids)
                .await;
        }

        DocumentCommands::Query {
            collection_name,
            query_texts,
            n_results,
            where_clause,
            where_document,
        } => {
            let Some((where_clause, where_document)) =
                decode_filters(where_clause.as_deref(), where_document.as_deref())
            else {
                eprintln!("{}", INVALID_JSON_MESSAGE);
                return Ok(());
            };

            let mut app = open_app(globals)?;
            app.query_documents(
                &collection_name,
                query_texts,
                n_results,
                where_clause,
                where_document,
            )
            .await;
        }

        DocumentCommands::Delete {
            collection_name,
            ids,
            where_clause,
            where_document,
        } => {
            let Some((where_clause, where_document)) =
                decode_filters(where_clause.as_deref(), where_document.as_deref())
            else {
                eprintln!("{}", INVALID_JSON_MESSAGE);
                return Ok(());
            };

            let mut app = open_app(globals)?;
            let ids = (!ids.is_empty()).then_some(ids);
            app.delete_documents(&collection_name, ids, where_clause, where_document);
        }

        DocumentCommands::GetAll { collection_name } => {
            let mut app = open_app(globals)?;
            app.get_all_documents(&collection_name);
        }
    }

    Ok(())
}

/// Parse `key=value` items into one metadata map
///
/// Items without `=` are ignored with a warning. Values stay strings.
/// Returns `None` when no pair was parsed.
pub fn parse_metadata_items<S: AsRef<str>>(items: &[S]) -> Option<Metadata> {
    let mut metadata = Metadata::new();
    for item in items {
        let item = item.as_ref();
        match item.split_once('=') {
            Some((key, value)) => {
                metadata.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => warn!(
                "Metadata item '{}' is not in 'key=value' format and will be ignored.",
                item
            ),
        }
    }
    (!metadata.is_empty()).then_some(metadata)
}

/// Pair `--metadata` items with `--text` documents
///
/// One item per document maps in order; a single item is applied to every
/// document; any other count drops the metadata with a warning.
pub fn resolve_metadatas(items: &[String], documents: usize) -> Option<Vec<Option<Metadata>>> {
    if items.is_empty() {
        return None;
    }

    if items.len() == documents {
        Some(
            items
                .iter()
                .map(|item| parse_metadata_items(std::slice::from_ref(item)))
                .collect(),
        )
    } else if items.len() == 1 && documents > 1 {
        let shared = parse_metadata_items(items);
        Some(vec![shared; documents])
    } else {
        warn!(
            "Number of --metadata arguments ({}) does not match number of --text arguments ({}). Metadata will be ignored.",
            items.len(),
            documents
        );
        None
    }
}

/// Decode an optional JSON filter; empty strings count as absent
pub fn decode_filter(raw: Option<&str>) -> Result<Option<Value>, serde_json::Error> {
    raw.filter(|s| !s.is_empty())
        .map(serde_json::from_str::<Value>)
        .transpose()
}

/// Decode both filters, `None` if either is malformed
fn decode_filters(
    where_clause: Option<&str>,
    where_document: Option<&str>,
) -> Option<(Option<Value>, Option<Value>)> {
    let where_clause = decode_filter(where_clause).ok()?;
    let where_document = decode_filter(where_document).ok()?;
    Some((where_clause, where_document))
}
