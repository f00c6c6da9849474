//! Durable key-value storage
//!
//! Progress survives a restart of the proctor's session by being written
//! to a [`DurableStore`]. Values are opaque strings; the progress cache
//! owns the format.

use std::{collections::HashMap, fs, io::ErrorKind, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors raised by a durable store
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The backing medium could not be read or written
    #[error("storage unavailable for {key}: {message}")]
    Unavailable {
        /// Key being accessed
        key: String,
        /// Underlying failure
        message: String,
    },
    /// A stored value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// A string key-value store that outlives the process
///
/// There is a single writer, so writes simply overwrite the previous
/// value.
pub trait DurableStore {
    /// Reads the value under `key`, `None` if nothing was stored
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if the medium cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, Error>;

    /// Replaces the value under `key`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if the medium cannot be written.
    fn save(&mut self, key: &str, value: &str) -> Result<(), Error>;

    /// Deletes the value under `key`; deleting a missing key succeeds
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if the medium cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

/// In-memory store for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store keeping one `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn unavailable(key: &str, e: &std::io::Error) -> Error {
        Error::Unavailable {
            key: key.to_owned(),
            message: e.to_string(),
        }
    }
}

impl DurableStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::unavailable(key, &e)),
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::unavailable(key, &e))?;
        fs::write(self.path(key), value).map_err(|e| Self::unavailable(key, &e))
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::unavailable(key, &e)),
        }
    }
}
