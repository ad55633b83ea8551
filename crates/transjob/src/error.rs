use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum TransjobError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid provider section '{alias}': {reason}")]
    InvalidProvider { alias: String, reason: String },
}

/// Why a document was refused by the loader.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatIssue {
    #[error("not recognised as XLIFF 2.0 ({found})")]
    NotXliff2 { found: String },

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("{attribute} is '{found}', the job expects '{expected}'")]
    LanguageMismatch {
        attribute: &'static str,
        expected: String,
        found: String,
    },
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Cannot decompose unit '{unit}': {reason}")]
    Serialization { unit: String, reason: String },

    #[error("Unusable interchange document: {0}")]
    Format(FormatIssue),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage path '{0}'")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream I/O failed: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Blob store lock poisoned")]
    LockPoisoned,
}

/// Errors surfaced by the job lifecycle: provider calls, state transitions
/// and batch orchestration.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Format error: {0}")]
    Format(FormatIssue),

    #[error("Translation not ready: {0}")]
    NotReady(String),

    #[error("Cannot {action} job {key} while it is {status}")]
    InvalidState {
        key: Uuid,
        status: JobStatus,
        action: &'static str,
    },

    #[error("Selection must resolve to exactly one translation set (found {found})")]
    AmbiguousSet { found: usize },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Unknown provider: {0}")]
    UnknownProvider(Uuid),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl From<CodecError> for JobError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Serialization { .. } => JobError::Serialization(err.to_string()),
            CodecError::Format(issue) => JobError::Format(issue),
            CodecError::Io(source) => JobError::Storage(StorageError::Stream(source)),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransjobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_format_maps_to_job_format() {
        let err: JobError = CodecError::Format(FormatIssue::NotXliff2 {
            found: "version 1.2".to_string(),
        })
        .into();
        assert!(matches!(
            err,
            JobError::Format(FormatIssue::NotXliff2 { .. })
        ));
    }

    #[test]
    fn test_codec_serialization_keeps_unit_in_message() {
        let err: JobError = CodecError::Serialization {
            unit: "12-body".to_string(),
            reason: "unclosed <p>".to_string(),
        }
        .into();
        match err {
            JobError::Serialization(message) => {
                assert!(message.contains("12-body"));
                assert!(message.contains("unclosed <p>"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_state_message() {
        let key = Uuid::nil();
        let err = JobError::InvalidState {
            key,
            status: JobStatus::Completed,
            action: "submit",
        };
        assert_eq!(
            err.to_string(),
            format!("Cannot submit job {key} while it is completed")
        );
    }
}
