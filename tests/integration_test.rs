//! Integration tests for the chroma-cli binary

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// A throwaway database plus a config selecting the zero-vector embedder
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("config.toml"),
            "[embedding]\nprovider = \"zero\"\n",
        )
        .expect("Failed to write config");
        Self { dir }
    }

    fn db_path(&self) -> std::path::PathBuf {
        self.dir.path().join("db")
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_chroma-cli"))
            .arg("--db-path")
            .arg(self.db_path())
            .args(args)
            .env("CHROMA_CLI_CONFIG", self.dir.path().join("config.toml"))
            .env_remove("CHROMA_DB_PATH")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run command")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_chroma-cli"))
        .arg("--help")
        .output()
        .expect("Failed to run command");
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("collection"));
    assert!(out.contains("document"));
    assert!(out.contains("--db-path"));
    assert!(out.contains("--db-name"));
}

#[test]
fn test_no_command_prints_help() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
    assert!(!Path::new(&sandbox.db_path()).exists());
}

#[test]
fn test_document_query_help() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["document", "query", "--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("--query-text"));
    assert!(out.contains("--n-results"));
    assert!(out.contains("--where-document"));
}

#[test]
fn test_collection_lifecycle() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["collection", "list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No collections found."));

    let output = sandbox.run(&["collection", "create", "notes"]);
    assert!(stdout(&output).contains("Collection 'notes' created successfully."));

    let output = sandbox.run(&["collection", "create", "notes"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("Error creating collection 'notes'"));

    let output = sandbox.run(&["collection", "list"]);
    let out = stdout(&output);
    assert!(out.contains("Available Collections:"));
    assert!(out.contains("- notes"));

    let output = sandbox.run(&["collection", "delete", "notes"]);
    assert!(stdout(&output).contains("Collection 'notes' deleted successfully."));

    let output = sandbox.run(&["collection", "delete", "notes"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("Error deleting collection 'notes'"));
}

#[test]
fn test_add_and_get_all_roundtrip() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&[
        "document", "add", "notes",
        "--text", "apples are red",
        "--text", "the sky is blue",
        "--metadata", "k=1",
        "--metadata", "k=2",
        "--id", "d1",
        "--id", "d2",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Added 2 document(s) to collection 'notes'."));

    let output = sandbox.run(&["document", "get-all", "notes"]);
    let out = stdout(&output);
    assert!(out.contains("Retrieved 2 documents from collection 'notes':"));
    assert!(out.contains("--- Document ID: d1 ---"));
    assert!(out.contains("  Document: apples are red"));
    assert!(out.contains(r#"  Metadata: {"k":"1"}"#));
    assert!(out.contains("--- Document ID: d2 ---"));
    assert!(out.contains(r#"  Metadata: {"k":"2"}"#));
}

#[test]
fn test_mismatched_metadata_is_dropped() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&[
        "document", "add", "notes",
        "--text", "first",
        "--text", "second",
        "--text", "third",
        "--metadata", "k=1",
        "--metadata", "k=2",
        "--id", "m1",
        "--id", "m2",
        "--id", "m3",
    ]);
    assert!(output.status.success());
    assert!(stderr(&output).contains(
        "Number of --metadata arguments (2) does not match number of --text arguments (3)"
    ));
    assert!(stdout(&output).contains("Added 3 document(s) to collection 'notes'."));

    let output = sandbox.run(&["document", "get-all", "notes"]);
    let out = stdout(&output);
    assert!(out.contains("Retrieved 3 documents from collection 'notes':"));
    assert!(out.contains("--- Document ID: m3 ---"));
    assert!(!out.contains("Metadata:"));
}

#[test]
fn test_query_with_filter() {
    let sandbox = Sandbox::new();
    sandbox.run(&[
        "document", "add", "notes",
        "--text", "rust is fast",
        "--text", "python is friendly",
        "--metadata", "lang=rust",
        "--metadata", "lang=python",
        "--id", "r",
        "--id", "p",
    ]);

    let output = sandbox.run(&[
        "document", "query", "notes",
        "--query-text", "anything",
        "--where", r#"{"lang": "python"}"#,
    ]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Query results from collection 'notes':"));
    assert!(out.contains("--- Query: 'anything' ---"));
    assert!(out.contains("Result 1 (ID: p):"));
    assert!(out.contains("Distance: 0.0000"));
    assert!(!out.contains("ID: r"));

    let output = sandbox.run(&[
        "document", "query", "notes",
        "--query-text", "anything",
        "--n-results", "0",
    ]);
    assert!(stdout(&output).contains("No matching documents found."));
}

#[test]
fn test_invalid_json_filter() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&[
        "document", "query", "notes",
        "--query-text", "q",
        "--where", "{bad json}",
    ]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("Error: Invalid JSON format for --where or --where-document."));
    assert!(stdout(&output).is_empty());
    assert!(!sandbox.db_path().exists());
}

#[test]
fn test_delete_documents() {
    let sandbox = Sandbox::new();
    sandbox.run(&[
        "document", "add", "notes",
        "--text", "keep me",
        "--text", "drop me",
        "--id", "keep",
        "--id", "drop",
    ]);

    let output = sandbox.run(&["document", "delete", "notes"]);
    assert!(stdout(&output)
        .contains("No IDs or filters provided for deletion. Specify at least one criterion."));

    let output = sandbox.run(&[
        "document", "delete", "notes",
        "--where-document", r#"{"$contains": "drop"}"#,
    ]);
    let out = stdout(&output);
    assert!(out.contains("Deleted 1 document(s) from collection 'notes'."));
    assert!(out.contains(r#"Deleted IDs: ["drop"]"#));

    let output = sandbox.run(&["document", "delete", "notes", "--id", "missing"]);
    assert!(stdout(&output)
        .contains("No documents matched the criteria for deletion in collection 'notes'."));

    let output = sandbox.run(&["document", "get-all", "notes"]);
    let out = stdout(&output);
    assert!(out.contains("Retrieved 1 documents"));
    assert!(out.contains("--- Document ID: keep ---"));
}

#[test]
fn test_empty_collection_get_all() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["document", "get-all", "empty"]);
    assert!(stdout(&output).contains("No documents found in collection 'empty'."));
}
