//! Device and library storage
//!
//! The device side is the reader's SQLite database; the library side is any
//! [`LibraryStore`]. Both are only touched from the coordinator's thread.

mod backup;
mod device;
mod library;

pub use backup::{backup_device_database, BackupOutcome, TIMESTAMP_PLACEHOLDER};
pub use device::{check_database_file, quarantine, DeviceDatabase, EPUB_MIME_TYPE};
pub use library::{BookEntry, JsonLibrary, LibraryFile, MemoryLibrary};

use crate::error::StorageError;
use crate::types::{BookId, LibraryChanges, LibraryReadingState};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// The library manager's metadata store
pub trait LibraryStore {
    /// Entries for the requested ids; unknown ids are skipped
    fn books(&self, ids: &[BookId]) -> StorageResult<Vec<BookEntry>>;

    /// Every book id in the library
    fn all_ids(&self) -> Vec<BookId>;

    /// Current reading state from the configured columns
    fn reading_state(&self, id: BookId) -> StorageResult<LibraryReadingState>;

    /// Apply one book's staged writes as a unit
    fn apply(&mut self, id: BookId, changes: &LibraryChanges) -> StorageResult<()>;

    /// Persist applied changes
    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }
}
