//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds the two durable tables and the runtime configuration:
//! - **Users**: username → [`User`]
//! - **Properties**: property id → [`Property`]
//!
//! Records refer to each other by key only. Handlers look a user up by
//! username when a property operation names one.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use deedshare_core::{Property, User};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::db::{DataDir, SnapshotFile, StoreError};

// -- Durable Store ------------------------------------------------------------

/// Thread-safe, cloneable key-value table with optional write-through
/// persistence.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because we never hold the lock across `.await` points. Every mutation
/// runs under one write guard: the change is applied, the snapshot (if any)
/// is rewritten, and if that write fails the change is rolled back before
/// the guard is released.
#[derive(Debug)]
pub struct Store<T> {
    data: Arc<RwLock<BTreeMap<String, T>>>,
    snapshot: Option<Arc<SnapshotFile>>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<T> Store<T>
where
    T: Clone + Serialize + Send + Sync,
{
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            snapshot: None,
        }
    }

    /// Open a store backed by `file`, loading whatever it already holds.
    pub fn open(file: SnapshotFile) -> Result<Self, StoreError>
    where
        T: DeserializeOwned,
    {
        let table = file.load()?;
        Ok(Self {
            data: Arc::new(RwLock::new(table)),
            snapshot: Some(Arc::new(file)),
        })
    }

    /// Retrieve a record by key.
    pub fn get(&self, key: &str) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    /// Whether a record exists.
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// List all records in key order.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, key: impl Into<String>, value: T) -> Result<Option<T>, StoreError> {
        let key = key.into();
        let mut guard = self.data.write();
        let previous = guard.insert(key.clone(), value);
        if let Err(e) = self.persist(&guard) {
            match previous {
                Some(old) => guard.insert(key, old),
                None => guard.remove(&key),
            };
            return Err(e);
        }
        Ok(previous)
    }

    /// Atomically check-then-insert.
    ///
    /// `check` sees the whole table under the write lock; the record is
    /// inserted only if it returns `Ok`. An existing record under `key` is
    /// replaced, so callers that need uniqueness must check for it.
    pub fn try_insert<E>(
        &self,
        key: impl Into<String>,
        value: T,
        check: impl FnOnce(&BTreeMap<String, T>) -> Result<(), E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let key = key.into();
        let mut guard = self.data.write();
        check(&guard)?;
        let previous = guard.insert(key.clone(), value.clone());
        if let Err(e) = self.persist(&guard) {
            match previous {
                Some(old) => guard.insert(key, old),
                None => guard.remove(&key),
            };
            return Err(e.into());
        }
        Ok(value)
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a copy of the current record and may inspect it,
    /// validate preconditions, mutate it and return `Ok(R)` or `Err(E)`. The
    /// stored record is replaced by the copy only when the closure succeeds
    /// and the snapshot write (if any) succeeds, so a failed operation leaves
    /// the table untouched.
    ///
    /// Returns `None` if the record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        key: &str,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>>
    where
        E: From<StoreError>,
    {
        let mut guard = self.data.write();
        let mut draft = guard.get(key)?.clone();
        let result = match f(&mut draft) {
            Ok(result) => result,
            Err(e) => return Some(Err(e)),
        };
        let previous = guard.insert(key.to_string(), draft);
        if let Err(e) = self.persist(&guard) {
            if let Some(old) = previous {
                guard.insert(key.to_string(), old);
            }
            return Some(Err(e.into()));
        }
        Some(Ok(result))
    }

    /// Atomically check-then-remove.
    ///
    /// Returns `None` if the record doesn't exist, otherwise the removed
    /// record or the error from `check`.
    pub fn try_remove<E>(&self, key: &str, check: impl FnOnce(&T) -> Result<(), E>) -> Option<Result<T, E>>
    where
        E: From<StoreError>,
    {
        let mut guard = self.data.write();
        if let Err(e) = check(guard.get(key)?) {
            return Some(Err(e));
        }
        let removed = guard.remove(key)?;
        if let Err(e) = self.persist(&guard) {
            guard.insert(key.to_string(), removed);
            return Some(Err(e.into()));
        }
        Some(Ok(removed))
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a read lock can be taken immediately.
    pub fn is_available(&self) -> bool {
        self.data.try_read().is_some()
    }

    fn persist(&self, table: &BTreeMap<String, T>) -> Result<(), StoreError> {
        match &self.snapshot {
            Some(file) => file.write(table),
            None => Ok(()),
        }
    }
}

impl<T> Default for Store<T>
where
    T: Clone + Serialize + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

// -- Configuration ------------------------------------------------------------

/// Invalid environment configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `DEEDSHARE_PORT` is not a valid port number.
    #[error("DEEDSHARE_PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    /// `DEEDSHARE_LOG_FORMAT` is neither `text` nor `json`.
    #[error("DEEDSHARE_LOG_FORMAT must be \"text\" or \"json\", got {0:?}")]
    InvalidLogFormat(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Directory for table snapshots. If `None`, state is in-memory only.
    pub data_dir: Option<PathBuf>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Build configuration from `DEEDSHARE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("DEEDSHARE_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8080,
        };

        let log_format = match var("DEEDSHARE_LOG_FORMAT") {
            None => LogFormat::Text,
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::InvalidLogFormat(raw)),
            },
        };

        Ok(Self {
            port,
            auth_token: var("DEEDSHARE_AUTH_TOKEN"),
            data_dir: var("DEEDSHARE_DATA_DIR").map(PathBuf::from),
            log_format,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("data_dir", &self.data_dir)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            data_dir: None,
            log_format: LogFormat::Text,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub users: Store<User>,
    pub properties: Store<Property>,
    pub config: AppConfig,
}

impl AppState {
    /// Create an in-memory application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create an in-memory application state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            users: Store::new(),
            properties: Store::new(),
            config,
        }
    }

    /// Create an application state whose tables are hydrated from, and
    /// written through to, the snapshots in `data`.
    pub fn open(config: AppConfig, data: &DataDir) -> Result<Self, StoreError> {
        let users = Store::open(data.users())?;
        let properties = Store::open(data.properties())?;

        tracing::info!(
            users = users.len(),
            properties = properties.len(),
            data_dir = %data.root().display(),
            "hydrated stores from snapshots"
        );

        Ok(Self {
            users,
            properties,
            config,
        })
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
