//! Record storage - JSONL file, appended on add and rewritten on delete

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, StoreError};
use super::types::Metadata;

/// A stored document with its vector key and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Integer key of the record's vector in the index
    pub key: u64,
    pub id: String,
    pub document: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Read every record from a JSONL file; a missing file holds no records
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(|e| StoreError::Corrupted {
            path: path.display().to_string(),
            message: format!("line {}: {}", line_no + 1, e),
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Writer for a record file
pub struct RecordWriter {
    writer: BufWriter<File>,
    written: usize,
}

impl RecordWriter {
    /// Create (or truncate) a record file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_file(file))
    }

    /// Open a record file for appending, creating it if needed
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        Self {
            writer: BufWriter::new(file),
            written: 0,
        }
    }

    /// Write one record as a JSON line
    pub fn add(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Flush buffered lines to disk, returning how many were written
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(self.written)
    }
}

/// Replace a record file's content with `records`
///
/// Writes to a sibling temp file first and renames it over the target.
pub fn rewrite_records(path: &Path, records: &[Record]) -> Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    let mut writer = RecordWriter::create(&tmp_path)?;
    for record in records {
        writer.add(record)?;
    }
    writer.finish()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(key: u64, id: &str, metadata: Option<Metadata>) -> Record {
        Record {
            key,
            id: id.to_string(),
            document: format!("document {}", id),
            metadata,
        }
    }

    #[test]
    fn test_append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let mut writer = RecordWriter::append(&path).unwrap();
        writer.add(&record(0, "a", None)).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);

        let meta = json!({"k": "v"}).as_object().cloned();
        let mut writer = RecordWriter::append(&path).unwrap();
        writer.add(&record(1, "b", meta.clone())).unwrap();
        writer.finish().unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record(0, "a", None));
        assert_eq!(records[1].metadata, meta);
    }

    #[test]
    fn test_rewrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        rewrite_records(&path, &[record(0, "a", None), record(1, "b", None)]).unwrap();
        rewrite_records(&path, &[record(1, "b", None)]).unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records, vec![record(1, "b", None)]);
        assert!(!path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = load_records(&dir.path().join("nope.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_corrupted_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        std::fs::write(&path, "{\"key\":0,\"id\":\"a\",\"document\":\"x\"}\nnot json\n").unwrap();

        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
