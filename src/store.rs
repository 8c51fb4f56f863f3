//! Document store collaborators. Records are untyped JSON objects; the
//! core only needs to read a whole collection in a stable order and to
//! append one record at a time.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;

pub trait DocumentStore {
    /// All records of a collection in insertion order. A collection that
    /// was never written to is empty.
    fn read_collection(&self, name: &str) -> Result<Vec<Value>>;

    fn insert_one(&mut self, collection: &str, record: Value) -> Result<()>;
}

/// One `<collection>.jsonl` file per collection under a root directory.
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(JsonlStore { root })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", name))
    }
}

impl DocumentStore for JsonlStore {
    fn read_collection(&self, name: &str) -> Result<Vec<Value>> {
        let path = self.collection_path(name);
        if !path.exists() {
            debug!("Collection {} has no file at {}", name, path.display());
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        debug!("Read {} records from collection {}", records.len(), name);
        Ok(records)
    }

    fn insert_one(&mut self, collection: &str, record: Value) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.collection_path(collection))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_collection(mut self, name: &str, records: Vec<Value>) -> Self {
        self.collections.insert(name.to_string(), records);
        self
    }
}

impl DocumentStore for MemoryStore {
    fn read_collection(&self, name: &str) -> Result<Vec<Value>> {
        Ok(self.collections.get(name).cloned().unwrap_or_default())
    }

    fn insert_one(&mut self, collection: &str, record: Value) -> Result<()> {
        self.collections.entry(collection.to_string()).or_default().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn jsonl_store_appends_and_reads_in_order() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonlStore::open(dir.path()).unwrap();

        store.insert_one("publications", json!({"title": "first"})).unwrap();
        store.insert_one("publications", json!({"title": "second"})).unwrap();

        let records = store.read_collection("publications").unwrap();
        assert_eq!(records, vec![json!({"title": "first"}), json!({"title": "second"})]);
    }

    #[test]
    fn missing_collection_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonlStore::open(dir.path()).unwrap();
        assert!(store.read_collection("nothing").unwrap().is_empty());
    }

    #[test]
    fn blank_lines_are_ignored_and_bad_lines_fail() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("raw.jsonl"), "{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        std::fs::write(dir.path().join("broken.jsonl"), "{\"a\":1}\nnot json\n").unwrap();
        let store = JsonlStore::open(dir.path()).unwrap();

        assert_eq!(store.read_collection("raw").unwrap().len(), 2);
        assert!(store.read_collection("broken").is_err());
    }

    #[test]
    fn memory_store_keeps_collections_apart() {
        let mut store = MemoryStore::new().with_collection("raw", vec![json!({"n": 1})]);
        store.insert_one("derived", json!({"n": 2})).unwrap();

        assert_eq!(store.read_collection("raw").unwrap(), vec![json!({"n": 1})]);
        assert_eq!(store.read_collection("derived").unwrap(), vec![json!({"n": 2})]);
    }
}
