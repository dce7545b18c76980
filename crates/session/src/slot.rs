//! Single-slot local persistence for the current session.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")]
    NoDataDir,

    #[error("invalid slot key '{0}' (use ASCII letters, digits, '-' or '_')")]
    InvalidKey(String),
}

/// Key-value slots holding serialized text.
///
/// Writes are synchronous and whole-value; there is no versioning.
pub trait SlotStorage: Send + Sync + core::fmt::Debug {
    fn read(&self, key: &str) -> Result<Option<String>, SlotError>;

    fn write(&self, key: &str, value: &str) -> Result<(), SlotError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), SlotError>;
}

pub(crate) fn validate_key(key: &str) -> Result<(), SlotError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SlotError::InvalidKey(key.to_string()))
    }
}

/// File-backed slots: `{dir}/{key}.json`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Slots under the OS data directory: `{app_data_dir}/provilink/`.
    pub fn in_default_dir() -> Result<Self, SlotError> {
        Ok(Self::new(default_data_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SlotError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SlotError + '_ {
        move |source| SlotError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SlotStorage for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, SlotError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Self::io_error(&path)(err)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SlotError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(Self::io_error(&self.dir))?;

        // Write-then-rename so a reader never sees a half-written record.
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, value).map_err(Self::io_error(&staging))?;
        std::fs::rename(&staging, &path).map_err(Self::io_error(&path))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Self::io_error(&path)(err)),
        }
    }
}

/// In-memory slots for tests and hosts without a writable disk.
#[derive(Debug, Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot.
    pub fn with(key: &str, value: impl Into<String>) -> Self {
        let slot = Self::new();
        slot.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
        slot
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl SlotStorage for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, SlotError> {
        validate_key(key)?;
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SlotError> {
        validate_key(key)?;
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SlotError> {
        validate_key(key)?;
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Resolve `{app_data_dir}/provilink`.
pub fn default_data_dir() -> Result<PathBuf, SlotError> {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(SlotError::NoDataDir)?;
    dir.push("provilink");
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_slot_round_trip_and_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(tmp.path().join("nested"));

        assert_eq!(slot.read("currentUser").unwrap(), None);
        slot.write("currentUser", "{\"a\":1}").unwrap();
        assert_eq!(slot.read("currentUser").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(tmp.path().join("nested/currentUser.json").exists());
        assert!(!tmp.path().join("nested/currentUser.json.tmp").exists());

        slot.remove("currentUser").unwrap();
        assert_eq!(slot.read("currentUser").unwrap(), None);
        slot.remove("currentUser").unwrap();
    }

    #[test]
    fn file_slot_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(tmp.path());
        slot.write("k", "one").unwrap();
        slot.write("k", "two").unwrap();
        assert_eq!(slot.read("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(tmp.path());
        assert!(matches!(slot.write("../x", "v"), Err(SlotError::InvalidKey(_))));
        assert!(matches!(slot.read(""), Err(SlotError::InvalidKey(_))));
    }

    #[test]
    fn memory_slot_behaves_like_a_map() {
        let slot = MemorySlot::with("currentUser", "v1");
        assert!(slot.contains("currentUser"));
        slot.write("currentUser", "v2").unwrap();
        assert_eq!(slot.read("currentUser").unwrap().as_deref(), Some("v2"));
        slot.remove("currentUser").unwrap();
        assert!(!slot.contains("currentUser"));
    }
}
