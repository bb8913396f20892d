//! Pagemark Core Library
//!
//! Reading-position synchronisation between an e-reader's device database and
//! a library manager's metadata. Device bookmarks are decoded into structured
//! [`Position`]s, turned into a percent-through-book estimate, and reconciled
//! against the library under a [`SyncPolicy`] by a [`SyncCoordinator`] that
//! runs per-book jobs on a worker pool.

pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod estimate;
pub mod reconcile;
pub mod storage;
pub mod sync;
pub mod types;

pub use config::{LibraryColumns, SyncConfig};
pub use error::{
    CodecError, ConfigError, DocumentError, EstimateError, PagemarkError, Result, StorageError,
};
pub use estimate::estimate;
pub use sync::{BatchReport, SyncCoordinator, SyncSummary};
pub use types::{
    BookId, DeviceReadingState, Disposition, LibraryReadingState, PathStep, Position, ReadStatus,
    ReconciliationResult, SpineDocument, SpineEntry, SyncDirection, SyncPolicy,
};
