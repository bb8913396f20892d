//! Error types for Pagemark Core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using PagemarkError
pub type Result<T> = std::result::Result<T, PagemarkError>;

/// Top-level error type for all Pagemark operations
#[derive(Debug, Error)]
pub enum PagemarkError {
    #[error("Bookmark error: {0}")]
    Codec(#[from] CodecError),

    #[error("Estimate error: {0}")]
    Estimate(#[from] EstimateError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PagemarkError {
    /// Whether this error must abort the whole operation rather than a single book
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PagemarkError::Config(_) | PagemarkError::Storage(StorageError::StoreCorrupt { .. })
        )
    }
}

/// Errors converting between device bookmarks and positions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("Malformed bookmark: {0}")]
    MalformedBookmark(String),

    #[error("File not in spine: {0}")]
    UnknownSpineFile(String),

    #[error("Spine index {index} out of range (spine has {len} documents)")]
    SpineIndexOutOfRange { index: usize, len: usize },
}

/// Errors computing a percent-read value
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    #[error("Book has no content weight")]
    EmptyBook,

    #[error("Position path depth {depth} exceeds limit {limit}")]
    PathTooDeep { depth: usize, limit: usize },

    #[error("No document tree for spine index {0}")]
    MissingDocument(usize),
}

/// Errors loading book content documents
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing content file: {0}")]
    MissingContentFile(String),
}

/// Errors from the device database or the library store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database at {path} failed its integrity check: {detail}")]
    StoreCorrupt { path: PathBuf, detail: String },

    #[error("Update of book {book_id} rolled back: {detail}")]
    PartialWriteFailure { book_id: u64, detail: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in the sync configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Option '{option}' requires the {column} column to be configured")]
    MissingColumn {
        option: &'static str,
        column: &'static str,
    },

    #[error("No library columns configured")]
    NoColumnsConfigured,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
