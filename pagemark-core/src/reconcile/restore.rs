//! Library to device

use crate::codec::to_device_mark;
use crate::config::LibraryColumns;
use crate::types::{
    BookId, DeviceChanges, DeviceReadingState, Disposition, LibraryReadingState, NewState,
    ReadStatus, ReconciliationResult, Staged, SyncPolicy,
};
use chrono::{DateTime, Utc};

/// Decide what the device should record for one book
///
/// `device` is the book's content row on the device with its current state,
/// or `None` when the book is not on the device.
pub fn reconcile_restore(
    book_id: BookId,
    device: Option<(&str, &DeviceReadingState)>,
    library: &LibraryReadingState,
    columns: &LibraryColumns,
    policy: &SyncPolicy,
    now: DateTime<Utc>,
) -> ReconciliationResult {
    let Some((content_id, current)) = device else {
        tracing::debug!("Book {} is not on the device", book_id);
        return ReconciliationResult::unchanged(book_id, Disposition::NotOnDevice, None);
    };

    let mut candidate = current.clone();

    if columns.has_bookmark() {
        if let Some(mark) = library
            .bookmark
            .as_deref()
            .and_then(|bookmark| to_device_mark(bookmark, content_id, current.native_format))
        {
            candidate.mark = Some(mark);
        }
    }
    // a library percent of 0 carries no progress; keep what the device has
    let restored_percent = if columns.has_percent_read() {
        library
            .percent_read
            .filter(|p| *p > 0)
            .or(current.raw_percent)
    } else {
        None
    };
    if restored_percent.is_some() {
        candidate.raw_percent = restored_percent;
    }
    if policy.set_reading_status_on_restore {
        if let Some(percent) = restored_percent.filter(|p| *p > 0) {
            candidate.read_status = ReadStatus::from_percent(percent);
        }
    }

    if policy.reset_position_on_restore {
        candidate.mark = None;
        // the device stores an unread percent as 0, not NULL
        candidate.raw_percent = Some(0);
        candidate.read_status = ReadStatus::Unread;
        candidate.last_read = None;
    } else if policy.stamp_now_on_restore {
        candidate.last_read = Some(now);
    } else if columns.has_last_read() && library.last_read.is_some() {
        candidate.last_read = library.last_read;
    }

    let changes = DeviceChanges {
        bookmark: Staged::if_differs(&current.mark, &candidate.mark),
        read_status: Staged::if_differs(&current.read_status, &candidate.read_status),
        percent_read: Staged::if_differs(&current.raw_percent, &candidate.raw_percent),
        last_read: Staged::if_differs(&current.last_read, &candidate.last_read),
    };
    let changed = !changes.is_empty();
    tracing::debug!(
        "Book {} ({}): {}",
        book_id,
        content_id,
        if changed { "device update staged" } else { "device already current" }
    );

    ReconciliationResult {
        book_id,
        changed,
        disposition: if changed {
            Disposition::Changed
        } else {
            Disposition::Unchanged
        },
        new_state: Some(NewState::Device {
            content_id: content_id.to_string(),
            candidate,
            changes,
        }),
    }
}
