use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{segments, FileStore};
use crate::error::StorageError;

/// Move a file from `src` to `dst`. Uses `rename` first (atomic on the same
/// filesystem) and falls back to copy + delete for cross-device moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::WriteFile {
        path: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::DeleteFile {
        path: src.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// File store rooted at a directory on local disk.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a logical path to a location under the root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let mut resolved = self.root.clone();
        for segment in segments(path)? {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.resolve(path)?.is_file())
    }

    fn save(&self, path: &str, content: &mut dyn Read) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        let directory = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        self.ensure_directory(&directory)?;

        // Readers must never observe a half-written document, so the content
        // lands in a sibling temp file first.
        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("blob");
        let temp = directory.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        let mut write = |temp: &Path| -> Result<(), std::io::Error> {
            let mut file = File::create(temp)?;
            std::io::copy(&mut *content, &mut file)?;
            file.flush()?;
            file.sync_all()
        };

        if let Err(e) = write(&temp) {
            let _ = std::fs::remove_file(&temp);
            return Err(StorageError::WriteFile {
                path: target,
                source: e,
            });
        }

        if let Err(e) = move_file(&temp, &target) {
            let _ = std::fs::remove_file(&temp);
            return Err(e);
        }

        log::debug!("Stored {}", target.display());
        Ok(())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let target = self.resolve(path)?;
        match File::open(&target) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::ReadFile {
                path: target,
                source: e,
            }),
        }
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::DeleteFile {
                path: target,
                source: e,
            }),
        }
    }
}
