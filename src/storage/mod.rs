//! Namespaced key-value storage
//!
//! Two namespaces exist: [`StorageKind::Durable`] (file-backed, survives
//! restarts) and [`StorageKind::Session`] (in-memory). The namespace is
//! picked when a [`Store`] is built, never per call.
//!
//! Keys are stored under a fixed prefix ([`KEY_PREFIX`]); callers only ever
//! see unprefixed keys. Non-string values are stored as JSON text and
//! [`KeyValueStore::get`] hands back a [`ParseOutcome`].
//!
//! Backend faults never reach the caller: they are logged and the
//! operation degrades to "not found" / no-op.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::json::{ParseOutcome, safe_parse};
use crate::{Error, Result};

/// Prefix applied to every stored key
pub const KEY_PREFIX: &str = "app_";

/// Storage namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Persisted across process restarts
    Durable,
    /// Dropped when the process exits
    Session,
}

impl StorageKind {
    /// Tag used in logs and on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Durable => "durable",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "durable" | "local" => Ok(Self::Durable),
            "session" => Ok(Self::Session),
            other => Err(Error::Config(format!(
                "Invalid storage kind '{other}' (expected 'durable' or 'session')"
            ))),
        }
    }
}

/// Key-value store interface consumed by the rest of the crate
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when absent or the backend failed
    fn get(&self, key: &str) -> Option<ParseOutcome>;

    /// Store a raw string value
    fn set(&self, key: &str, value: &str);

    /// Remove one key
    fn remove(&self, key: &str);

    /// Remove every key in this namespace
    fn clear(&self);

    /// Unprefixed key at `index` in key order
    fn key_at(&self, index: usize) -> Option<String>;

    /// Number of keys in this namespace
    fn count(&self) -> usize;
}

enum Backend {
    Durable(FileBackend),
    Session(MemoryBackend),
}

impl Backend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::Durable(b) => b.read(key),
            Self::Session(b) => b.read(key),
        }
    }

    fn write(&self, key: &str, value: String) -> Result<()> {
        match self {
            Self::Durable(b) => b.write(key, value),
            Self::Session(b) => b.write(key, value),
        }
    }

    fn delete(&self, keys: &[String]) -> Result<()> {
        match self {
            Self::Durable(b) => b.delete(keys),
            Self::Session(b) => b.delete(keys),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        match self {
            Self::Durable(b) => b.keys(),
            Self::Session(b) => b.keys(),
        }
    }
}

/// A store bound to one namespace
pub struct Store {
    kind: StorageKind,
    backend: Backend,
}

impl Store {
    /// In-memory session store
    #[must_use]
    pub fn session() -> Self {
        Self {
            kind: StorageKind::Session,
            backend: Backend::Session(MemoryBackend::new()),
        }
    }

    /// Durable store backed by the file at `path`
    pub fn durable(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            kind: StorageKind::Durable,
            backend: Backend::Durable(FileBackend::open(path)?),
        })
    }

    /// Open a store of the given kind; durable stores use `path` or the default location
    pub fn open(kind: StorageKind, path: Option<PathBuf>) -> Result<Self> {
        match kind {
            StorageKind::Session => Ok(Self::session()),
            StorageKind::Durable => {
                let backend = match path {
                    Some(p) => FileBackend::open(p)?,
                    None => FileBackend::default_location()?,
                };
                Ok(Self {
                    kind,
                    backend: Backend::Durable(backend),
                })
            }
        }
    }

    /// Like [`Store::open`], but a store that cannot be opened is logged
    /// and replaced by an empty session store
    #[must_use]
    pub fn open_or_session(kind: StorageKind, path: Option<PathBuf>) -> Self {
        match Self::open(kind, path) {
            Ok(store) => store,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Failed to open storage, using session storage");
                Self::session()
            }
        }
    }

    /// Namespace of this store
    #[must_use]
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Store any serializable value: strings as-is, everything else as JSON text
    pub fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(Value::String(s)) => self.set(key, &s),
            Ok(other) => self.set(key, &other.to_string()),
            Err(e) => {
                warn!(kind = %self.kind, key = %key, error = %e, "Failed to serialize storage value");
            }
        }
    }

    /// Unprefixed keys in key order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.prefixed_keys()
            .iter()
            .filter_map(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string))
            .collect()
    }

    fn prefixed_keys(&self) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(KEY_PREFIX))
                .collect(),
            Err(e) => {
                warn!(kind = %self.kind, error = %e, "Failed to list storage keys");
                Vec::new()
            }
        }
    }
}

fn prefixed(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Option<ParseOutcome> {
        match self.backend.read(&prefixed(key)) {
            Ok(value) => value.map(|raw| safe_parse(&raw)),
            Err(e) => {
                warn!(kind = %self.kind, key = %key, error = %e, "Failed to read storage key");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.write(&prefixed(key), value.to_string()) {
            warn!(kind = %self.kind, key = %key, error = %e, "Failed to write storage key");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.backend.delete(&[prefixed(key)]) {
            warn!(kind = %self.kind, key = %key, error = %e, "Failed to remove storage key");
        }
    }

    fn clear(&self) {
        let keys = self.prefixed_keys();
        if let Err(e) = self.backend.delete(&keys) {
            warn!(kind = %self.kind, error = %e, "Failed to clear storage");
        }
    }

    fn key_at(&self, index: usize) -> Option<String> {
        self.keys().into_iter().nth(index)
    }

    fn count(&self) -> usize {
        self.prefixed_keys().len()
    }
}

/// Both namespaces side by side, addressed by [`StorageKind`]
pub struct Storage {
    durable: Store,
    session: Store,
}

impl Storage {
    /// Durable namespace at `path` (default location when `None`) plus a fresh session namespace
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            durable: Store::open(StorageKind::Durable, path)?,
            session: Store::session(),
        })
    }

    /// Select a namespace
    #[must_use]
    pub fn namespace(&self, kind: StorageKind) -> &Store {
        match kind {
            StorageKind::Durable => &self.durable,
            StorageKind::Session => &self.session,
        }
    }
}
