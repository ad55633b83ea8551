//! Logical file/blob store used by providers to exchange documents.
//!
//! Paths are `/`-separated and always relative to the store root; a leading
//! `/` is accepted and ignored.

use std::io::Read;

use crate::error::StorageError;

pub mod filesystem;
pub mod memory;

pub use filesystem::LocalFileStore;
pub use memory::MemoryFileStore;

pub trait FileStore: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Writes the full content of `content` to `path`, replacing any
    /// previous file.
    fn save(&self, path: &str, content: &mut dyn Read) -> Result<(), StorageError>;

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError>;

    fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Splits a logical path into its segments, rejecting anything that could
/// escape the store root.
pub(crate) fn segments(path: &str) -> Result<Vec<&str>, StorageError> {
    let parts: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if parts.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }

    for segment in &parts {
        if *segment == ".." || segment.contains('\\') || segment.contains('\0') {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
    }

    Ok(parts)
}

/// Canonical form of a logical path, used as a map key.
pub(crate) fn normalize(path: &str) -> Result<String, StorageError> {
    Ok(segments(path)?.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_leading_slash_and_dots() {
        assert_eq!(
            normalize("/media/filedrop/./job.xlf").unwrap(),
            "media/filedrop/job.xlf"
        );
        assert_eq!(normalize("media//job.xlf").unwrap(), "media/job.xlf");
    }

    #[test]
    fn test_parent_segments_rejected() {
        for bad in ["../secret", "/media/../../etc/passwd", "a/.."] {
            assert!(
                matches!(normalize(bad), Err(StorageError::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(normalize("/"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(normalize(""), Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_backslash_rejected() {
        assert!(matches!(
            normalize("media\\..\\x"),
            Err(StorageError::InvalidPath(_))
        ));
    }
}
