//! JSON snapshot files backing the durable stores.
//!
//! Each table is one file holding a JSON object `{key: record}`. Writes go to
//! a sibling `*.tmp` file which is fsynced and then renamed over the snapshot,
//! so a crash leaves either the old or the new table on disk, never a torn
//! one.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Failure reading or writing a snapshot file.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error.
    #[error("snapshot I/O failed for {}: {source}", path.display())]
    Io {
        /// Snapshot being read or written.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },

    /// The file exists but does not hold a valid table.
    #[error("snapshot {} is not a valid table: {source}", path.display())]
    Json {
        /// Snapshot that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// One table's snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Handle for the snapshot at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the table. A missing file is an empty table.
    pub fn load<T: DeserializeOwned>(&self) -> Result<BTreeMap<String, T>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file with `table`.
    pub fn write<T: Serialize>(&self, table: &BTreeMap<String, T>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(table).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: tmp.clone(),
            source,
        };
        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("users.json"));
        let table: BTreeMap<String, u64> = file.load().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn write_then_load_returns_same_table() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("t.json"));
        let mut table = BTreeMap::new();
        table.insert("a".to_string(), 1u64);
        table.insert("b".to_string(), 2u64);

        file.write(&table).unwrap();
        let loaded: BTreeMap<String, u64> = file.load().unwrap();
        assert_eq!(loaded, table);
        assert!(!dir.path().join("t.json.tmp").exists());
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("t.json"));
        let mut table = BTreeMap::new();
        table.insert("a".to_string(), 1u64);
        file.write(&table).unwrap();

        table.remove("a");
        table.insert("c".to_string(), 3u64);
        file.write(&table).unwrap();

        let loaded: BTreeMap<String, u64> = file.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("c"), Some(&3));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        fs::write(&path, b"{not json").unwrap();
        let err = SnapshotFile::new(&path).load::<u64>().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
        assert!(err.to_string().contains("t.json"));
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nope").join("t.json"));
        let err = file.write(&BTreeMap::<String, u64>::new()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
