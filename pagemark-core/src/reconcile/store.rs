//! Device to library

use crate::codec::to_library_bookmark;
use crate::config::LibraryColumns;
use crate::error::CodecError;
use crate::types::{
    BookId, DeviceReadingState, Disposition, LibraryChanges, LibraryReadingState, NewState,
    ReadStatus, ReconciliationResult, Staged, SyncPolicy,
};

/// Decide what the library should record for one book
///
/// `content_id` is the device content row the state was read from. A device
/// mark that cannot be translated into a library bookmark is an error for
/// this book only.
pub fn reconcile_store(
    book_id: BookId,
    content_id: &str,
    device: &DeviceReadingState,
    library: &LibraryReadingState,
    columns: &LibraryColumns,
    policy: &SyncPolicy,
) -> Result<ReconciliationResult, CodecError> {
    let candidate = match device.mark.as_deref() {
        None if !policy.clear_if_device_unread => {
            tracing::debug!("Book {} has no bookmark on the device", book_id);
            return Ok(ReconciliationResult::unchanged(
                book_id,
                Disposition::NoBookmark,
                None,
            ));
        }
        None => LibraryReadingState::cleared(),
        Some(mark) => {
            let bookmark = to_library_bookmark(mark, content_id, device.native_format)?;
            let percent_read = match device.read_status {
                ReadStatus::Finished => Some(100),
                ReadStatus::Reading => device.raw_percent.or(library.percent_read),
                ReadStatus::Unread => library.percent_read,
            };
            let candidate = mask(
                LibraryReadingState {
                    bookmark: Some(bookmark),
                    percent_read,
                    last_read: device.last_read,
                },
                columns,
            );

            if policy.store_only_if_more_recent
                && !super::is_more_recent(device.last_read, library.last_read)
            {
                tracing::debug!(
                    "Book {} last read on device {:?}, library has {:?}; skipping",
                    book_id,
                    device.last_read,
                    library.last_read
                );
                return Ok(suppressed(book_id, Disposition::NotMoreRecent, candidate));
            }
            if policy.skip_if_library_finished && library.is_finished() {
                tracing::debug!("Book {} already finished in the library; skipping", book_id);
                return Ok(suppressed(book_id, Disposition::LibraryFinished, candidate));
            }
            candidate
        }
    };

    let changes = stage(library, &candidate, columns);
    let changed = !changes.is_empty();
    tracing::debug!(
        "Book {}: {}",
        book_id,
        if changed { "library update staged" } else { "library already current" }
    );

    Ok(ReconciliationResult {
        book_id,
        changed,
        disposition: if changed {
            Disposition::Changed
        } else {
            Disposition::Unchanged
        },
        new_state: Some(NewState::Library { candidate, changes }),
    })
}

fn suppressed(
    book_id: BookId,
    disposition: Disposition,
    candidate: LibraryReadingState,
) -> ReconciliationResult {
    ReconciliationResult::unchanged(
        book_id,
        disposition,
        Some(NewState::Library {
            candidate,
            changes: LibraryChanges::default(),
        }),
    )
}

/// Drop fields whose column is not configured
fn mask(state: LibraryReadingState, columns: &LibraryColumns) -> LibraryReadingState {
    LibraryReadingState {
        bookmark: state.bookmark.filter(|_| columns.has_bookmark()),
        percent_read: state.percent_read.filter(|_| columns.has_percent_read()),
        last_read: state.last_read.filter(|_| columns.has_last_read()),
    }
}

fn stage(
    current: &LibraryReadingState,
    candidate: &LibraryReadingState,
    columns: &LibraryColumns,
) -> LibraryChanges {
    LibraryChanges {
        bookmark: if columns.has_bookmark() {
            Staged::if_differs(&current.bookmark, &candidate.bookmark)
        } else {
            Staged::Keep
        },
        percent_read: if columns.has_percent_read() {
            Staged::if_differs(&current.percent_read, &candidate.percent_read)
        } else {
            Staged::Keep
        },
        last_read: if columns.has_last_read() {
            Staged::if_differs(&current.last_read, &candidate.last_read)
        } else {
            Staged::Keep
        },
    }
}
