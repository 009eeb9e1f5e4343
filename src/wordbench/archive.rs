//! Durable archive of model replies that could not be parsed, even after healing.
//!
//! Every sample is written under a fresh UUID v4 key (`<uuid>.txt`), never derived from its
//! content, so concurrent episodes can share one directory without locking and no sample
//! ever overwrites another. Archival is diagnostics only: [`FailureArchive::save`] logs write
//! failures and carries on.
//!
//! ```rust
//! use std::sync::Arc;
//! use wordbench::archive::{FailureArchive, MemoryStorage};
//!
//! let archive = FailureArchive::new(Arc::new(MemoryStorage::new()));
//! let key = archive.save("clue_id c1 / answer pool").unwrap();
//! assert_eq!(archive.load(&key).unwrap(), "clue_id c1 / answer pool");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SAMPLE_EXTENSION: &str = "txt";

#[derive(Debug)]
pub enum ArchiveError {
    /// Underlying filesystem failure.
    Io(io::Error),
    /// A key that is empty or would escape the storage root.
    InvalidKey(String),
    /// Nothing is stored under the key.
    NotFound(String),
    /// A key was written twice.
    AlreadyExists(String),
    /// Stored bytes are not valid UTF-8.
    NotUtf8(String),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Io(err) => write!(f, "Archive I/O error: {}", err),
            ArchiveError::InvalidKey(key) => write!(f, "Invalid archive key: {:?}", key),
            ArchiveError::NotFound(key) => write!(f, "No archived sample under {}", key),
            ArchiveError::AlreadyExists(key) => write!(f, "Archive key {} already used", key),
            ArchiveError::NotUtf8(key) => write!(f, "Archived sample {} is not UTF-8", key),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiveError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        ArchiveError::Io(err)
    }
}

/// Key/value storage for archived samples. Writes never overwrite an existing key.
pub trait DurableStorage: Send + Sync {
    fn write(&self, key: &str, content: &[u8]) -> Result<(), ArchiveError>;
    fn read(&self, key: &str) -> Result<Vec<u8>, ArchiveError>;
    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>, ArchiveError>;
}

fn validate_key(key: &str) -> Result<(), ArchiveError> {
    let bad = key.is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key == "."
        || key == "..";
    if bad {
        Err(ArchiveError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// One file per key under a directory, created on first write.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStorage { root: root.into() }
    }
}

impl DurableStorage for FsStorage {
    fn write(&self, key: &str, content: &[u8]) -> Result<(), ArchiveError> {
        validate_key(key)?;
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(key);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ArchiveError::AlreadyExists(key.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(content)?;
        file.flush()?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        validate_key(key)?;
        match fs::read(self.root.join(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, ArchiveError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-process storage, for tests and dry runs.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DurableStorage for MemoryStorage {
    fn write(&self, key: &str, content: &[u8]) -> Result<(), ArchiveError> {
        validate_key(key)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ArchiveError::Io(io::Error::new(io::ErrorKind::Other, "poisoned")))?;
        if entries.contains_key(key) {
            return Err(ArchiveError::AlreadyExists(key.to_string()));
        }
        entries.insert(key.to_string(), content.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ArchiveError::Io(io::Error::new(io::ErrorKind::Other, "poisoned")))?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(key.to_string()))
    }

    fn keys(&self) -> Result<Vec<String>, ArchiveError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ArchiveError::Io(io::Error::new(io::ErrorKind::Other, "poisoned")))?;
        Ok(entries.keys().cloned().collect())
    }
}

/// Best-effort store of unparseable model replies.
#[derive(Clone)]
pub struct FailureArchive {
    storage: Arc<dyn DurableStorage>,
}

impl FailureArchive {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        FailureArchive { storage }
    }

    /// Archive backed by a directory on disk.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsStorage::new(dir)))
    }

    /// Store `raw_text` under a freshly generated key.
    ///
    /// Returns the key, or `None` if the write failed; the failure is logged, never raised.
    pub fn save(&self, raw_text: &str) -> Option<String> {
        let key = format!("{}.{}", Uuid::new_v4(), SAMPLE_EXTENSION);
        match self.storage.write(&key, raw_text.as_bytes()) {
            Ok(()) => {
                log::info!("Archived unparseable response as {}", key);
                Some(key)
            }
            Err(err) => {
                log::error!("Failed to archive unparseable response: {}", err);
                None
            }
        }
    }

    /// Read a sample back.
    pub fn load(&self, key: &str) -> Result<String, ArchiveError> {
        let bytes = self.storage.read(key)?;
        String::from_utf8(bytes).map_err(|_| ArchiveError::NotUtf8(key.to_string()))
    }

    /// Keys of every archived sample, sorted.
    pub fn keys(&self) -> Result<Vec<String>, ArchiveError> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter(|key| key.ends_with(&format!(".{}", SAMPLE_EXTENSION)))
            .collect())
    }
}
