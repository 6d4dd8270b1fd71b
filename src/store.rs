//! Persistent key-value storage
//!
//! The leaderboard is the only state that outlives a session. It is written
//! as a JSON string under a single key, so any string-to-string store will do.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Errors raised by a store
#[derive(Error, Debug)]
pub enum Error {
    /// The key contains characters the backend cannot store
    #[error("invalid key {0:?}")]
    InvalidKey(String),
    /// The value could not be encoded for storage
    #[error("could not encode value: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The backing storage failed
    #[error("storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// String storage keyed by name
pub trait KeyValueStore {
    /// Reads the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read. A missing key
    /// is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Replaces the value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), Error>;
}

/// A store that lives only as long as the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// A store that keeps each key in `<directory>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `directory`
    ///
    /// The directory is created on the first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory values are written to
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path(&self, key: &str) -> Result<PathBuf, Error> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::InvalidKey(key.to_owned()));
        }
        Ok(self.directory.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.directory)?;

        // write next to the target and rename so a crash never leaves half a file
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, value)?;
        std::fs::rename(&staging, &path)?;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        assert_eq!(store.get("hallOfFame").unwrap(), None);

        store.set("hallOfFame", "[]").unwrap();
        assert_eq!(store.get("hallOfFame").unwrap(), Some("[]".to_owned()));

        store.set("hallOfFame", "[1]").unwrap();
        assert_eq!(store.get("hallOfFame").unwrap(), Some("[1]".to_owned()));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("hallOfFame").unwrap(), None);
        store.set("hallOfFame", "[]").unwrap();
        assert_eq!(store.get("hallOfFame").unwrap(), Some("[]".to_owned()));
        assert!(dir.path().join("data").join("hallOfFame.json").exists());
        assert!(!dir.path().join("data").join("hallOfFame.json.tmp").exists());

        let reopened = FileStore::new(dir.path().join("data"));
        assert_eq!(reopened.get("hallOfFame").unwrap(), Some("[]".to_owned()));
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        assert!(matches!(
            store.set("../escape", "x"),
            Err(Error::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(Error::InvalidKey(_))));
    }
}
