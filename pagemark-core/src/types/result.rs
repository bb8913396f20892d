//! Per-book reconciliation results and the field writes they stage

use super::{DeviceReadingState, LibraryReadingState, ReadStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Library book identifier
pub type BookId = u64;

/// A single field's pending write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Staged<T> {
    /// Leave the stored value untouched
    #[default]
    Keep,
    /// Overwrite the stored value
    Write(T),
}

impl<T> Staged<T> {
    pub fn is_write(&self) -> bool {
        matches!(self, Staged::Write(_))
    }

    /// The value to write, if any
    pub fn as_write(&self) -> Option<&T> {
        match self {
            Staged::Write(value) => Some(value),
            Staged::Keep => None,
        }
    }
}

impl<T: PartialEq + Clone> Staged<T> {
    /// Stage `candidate` only when it differs from `current`
    pub fn if_differs(current: &T, candidate: &T) -> Self {
        if current == candidate {
            Staged::Keep
        } else {
            Staged::Write(candidate.clone())
        }
    }
}

/// Column writes for one library book
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryChanges {
    pub bookmark: Staged<Option<String>>,
    pub percent_read: Staged<Option<u8>>,
    pub last_read: Staged<Option<DateTime<Utc>>>,
}

impl LibraryChanges {
    pub fn is_empty(&self) -> bool {
        !(self.bookmark.is_write() || self.percent_read.is_write() || self.last_read.is_write())
    }
}

/// Column writes for one device content row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceChanges {
    pub bookmark: Staged<Option<String>>,
    pub read_status: Staged<ReadStatus>,
    pub percent_read: Staged<Option<u8>>,
    pub last_read: Staged<Option<DateTime<Utc>>>,
}

impl DeviceChanges {
    pub fn is_empty(&self) -> bool {
        !(self.bookmark.is_write()
            || self.read_status.is_write()
            || self.percent_read.is_write()
            || self.last_read.is_write())
    }
}

/// The merged state a reconciliation decided on, with the writes it needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum NewState {
    Library {
        candidate: LibraryReadingState,
        changes: LibraryChanges,
    },
    Device {
        content_id: String,
        candidate: DeviceReadingState,
        changes: DeviceChanges,
    },
}

/// Why a reconciliation ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// At least one field differs and is staged
    Changed,
    /// Candidate equals the stored values
    Unchanged,
    /// Device holds no bookmark and clearing is off
    NoBookmark,
    /// Device was not read more recently than the library records
    NotMoreRecent,
    /// Library already records the book as finished
    LibraryFinished,
    /// Book has no content row on the device
    NotOnDevice,
}

/// Outcome of reconciling one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub book_id: BookId,
    pub changed: bool,
    pub disposition: Disposition,

    /// Absent when there is nothing to compare against
    pub new_state: Option<NewState>,
}

impl ReconciliationResult {
    /// A result that stages nothing
    pub fn unchanged(book_id: BookId, disposition: Disposition, new_state: Option<NewState>) -> Self {
        Self {
            book_id,
            changed: false,
            disposition,
            new_state,
        }
    }

    /// Library writes staged by a store-direction result
    pub fn library_changes(&self) -> Option<&LibraryChanges> {
        match &self.new_state {
            Some(NewState::Library { changes, .. }) if self.changed => Some(changes),
            _ => None,
        }
    }

    /// Device writes staged by a restore-direction result
    pub fn device_changes(&self) -> Option<(&str, &DeviceChanges)> {
        match &self.new_state {
            Some(NewState::Device {
                content_id,
                changes,
                ..
            }) if self.changed => Some((content_id.as_str(), changes)),
            _ => None,
        }
    }
}
