use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::RwLock;

use super::{normalize, FileStore};
use crate::error::StorageError;

/// In-process blob store. Content is copied in on save and out on open, so
/// a reader never shares a buffer with a concurrent writer.
#[derive(Default)]
pub struct MemoryFileStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the stored bytes, if any.
    pub fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = normalize(path)?;
        let blobs = self.blobs.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(blobs.get(&key).cloned())
    }

    pub fn paths(&self) -> Vec<String> {
        let blobs = match self.blobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("MemoryFileStore lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let mut paths: Vec<String> = blobs.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileStore for MemoryFileStore {
    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let key = normalize(path)?;
        let blobs = self.blobs.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(blobs.contains_key(&key))
    }

    fn save(&self, path: &str, content: &mut dyn Read) -> Result<(), StorageError> {
        let key = normalize(path)?;
        let mut buffer = Vec::new();
        content.read_to_end(&mut buffer)?;

        let mut blobs = self.blobs.write().map_err(|_| StorageError::LockPoisoned)?;
        blobs.insert(key, buffer);
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let bytes = self
            .get(path)?
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let key = normalize(path)?;
        let mut blobs = self.blobs.write().map_err(|_| StorageError::LockPoisoned)?;
        blobs
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}
