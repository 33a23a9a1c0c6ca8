//! # Persistence Layer
//!
//! Optional on-disk persistence for the two tables.
//!
//! ## Architecture
//!
//! The persistence layer is **optional**. When `DEEDSHARE_DATA_DIR` is set,
//! every write to the user or property store is written through to a JSON
//! snapshot in that directory, and the stores are hydrated from those files at
//! startup. When absent, the API runs in-memory only (suitable for
//! development and testing).
//!
//! ## Files
//!
//! | File              | Table                        |
//! |-------------------|------------------------------|
//! | `users.json`      | username → user              |
//! | `properties.json` | property id → property       |

#![deny(missing_docs)]

pub mod snapshot;

use std::fs;
use std::path::{Path, PathBuf};

pub use snapshot::{SnapshotFile, StoreError};

/// Snapshot file of the user table.
pub const USERS_FILE: &str = "users.json";

/// Snapshot file of the property table.
pub const PROPERTIES_FILE: &str = "properties.json";

/// Locations of both table snapshots.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Directory holding the snapshots.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot of the user table, `users.json` under the root.
    pub fn users(&self) -> SnapshotFile {
        SnapshotFile::new(self.root.join(USERS_FILE))
    }

    /// Snapshot of the property table, `properties.json` under the root.
    pub fn properties(&self) -> SnapshotFile {
        SnapshotFile::new(self.root.join(PROPERTIES_FILE))
    }
}

/// Prepare the data directory, creating it if needed.
///
/// Returns `None` if no directory is configured (in-memory-only mode).
pub fn init_data_dir(dir: Option<&Path>) -> Result<Option<DataDir>, StoreError> {
    let Some(dir) = dir else {
        tracing::warn!(
            "DEEDSHARE_DATA_DIR not set, running in-memory only. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    tracing::info!(data_dir = %dir.display(), "snapshot persistence enabled");

    Ok(Some(DataDir {
        root: dir.to_path_buf(),
    }))
}
