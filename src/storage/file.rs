//! Durable backend
//!
//! Persists all entries as one JSON object on disk so they survive restarts.
//! Every mutation is written through; the in-memory view only changes once
//! the file write succeeded.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// File-backed key/value map
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store. A file that exists but is not a
    /// JSON object of strings is refused rather than silently overwritten.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::Storage(format!("Corrupt storage file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Storage file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Default location (`~/.webapp-kit/storage.json`)
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Storage("Cannot determine home directory".to_string()))?;

        Self::open(home.join(".webapp-kit").join("storage.json"))
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    pub(crate) fn write(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    pub(crate) fn delete(&self, keys: &[String]) -> Result<()> {
        let mut entries = self.entries.write();
        if !keys.iter().any(|k| entries.contains_key(k)) {
            return Ok(());
        }
        let mut next = entries.clone();
        for key in keys {
            next.remove(key);
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    pub(crate) fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)?;

        // Owner read/write only: the store holds credentials
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        Ok(())
    }
}
