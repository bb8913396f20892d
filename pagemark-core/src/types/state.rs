//! Reading state as tracked by the device and by the library

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device-side reading status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    #[default]
    Unread,
    Reading,
    Finished,
}

impl ReadStatus {
    /// Decode the device's numeric `ReadStatus` column
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => ReadStatus::Reading,
            2 => ReadStatus::Finished,
            _ => ReadStatus::Unread,
        }
    }

    /// Numeric value stored in the device database
    pub fn code(self) -> i64 {
        match self {
            ReadStatus::Unread => 0,
            ReadStatus::Reading => 1,
            ReadStatus::Finished => 2,
        }
    }

    /// Status implied by a percent-read value
    pub fn from_percent(percent: u8) -> Self {
        if percent >= 100 {
            ReadStatus::Finished
        } else {
            ReadStatus::Reading
        }
    }
}

/// Reading state as recorded on the device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceReadingState {
    /// Device bookmark (`<file>#point(<path>)`), possibly content-id prefixed
    pub mark: Option<String>,

    pub read_status: ReadStatus,

    /// Percent read as reported (or estimated) for the device copy
    pub raw_percent: Option<u8>,

    pub last_read: Option<DateTime<Utc>>,

    /// Device-native content; marks need no content-id translation
    pub native_format: bool,
}

impl DeviceReadingState {
    /// Whether this state is further along than `other`
    ///
    /// Used to pick one state when a book has several device copies.
    pub fn is_further_than(&self, other: &DeviceReadingState) -> bool {
        self.last_read > other.last_read || self.raw_percent > other.raw_percent
    }
}

/// Reading state as recorded in the library's custom columns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryReadingState {
    pub bookmark: Option<String>,
    pub percent_read: Option<u8>,
    pub last_read: Option<DateTime<Utc>>,
}

impl LibraryReadingState {
    /// The all-null state
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Whether every field is null
    pub fn is_cleared(&self) -> bool {
        self.bookmark.is_none() && self.percent_read.is_none() && self.last_read.is_none()
    }

    /// Whether the library already records the book as finished
    pub fn is_finished(&self) -> bool {
        self.percent_read == Some(100)
    }
}
