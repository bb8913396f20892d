//! Applying a batch's change set, one book at a time

use super::report::BatchReport;
use crate::error::{PagemarkError, StorageError};
use crate::storage::{quarantine, DeviceDatabase, LibraryStore};
use crate::types::BookId;
use std::collections::BTreeMap;

/// Books written and books whose write was rolled back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub applied: usize,
    pub failed: BTreeMap<BookId, String>,
}

/// Write store-direction results into the library
pub fn commit_to_library(
    library: &mut dyn LibraryStore,
    report: &BatchReport,
) -> crate::Result<CommitOutcome> {
    let mut outcome = CommitOutcome::default();

    for result in report.changed() {
        let Some(changes) = result.library_changes() else {
            continue;
        };
        match library.apply(result.book_id, changes) {
            Ok(()) => outcome.applied += 1,
            Err(e) => {
                tracing::error!("Library update for book {} failed: {}", result.book_id, e);
                outcome.failed.insert(result.book_id, e.to_string());
            }
        }
    }

    library.flush()?;
    tracing::info!(
        "Stored reading state for {} books ({} failed)",
        outcome.applied,
        outcome.failed.len()
    );
    Ok(outcome)
}

/// Write restore-direction results to the device
///
/// The database is integrity-checked first; a corrupt database is moved
/// aside and nothing is written.
pub fn commit_to_device(
    device: &mut DeviceDatabase,
    report: &BatchReport,
) -> crate::Result<CommitOutcome> {
    if let Err(e) = device.integrity_check() {
        if let StorageError::StoreCorrupt { .. } = &e {
            if let Err(moved) = quarantine(device.path()) {
                tracing::error!("Could not quarantine {}: {}", device.path().display(), moved);
            }
        }
        return Err(PagemarkError::Storage(e));
    }

    let mut outcome = CommitOutcome::default();
    for result in report.changed() {
        let Some((content_id, changes)) = result.device_changes() else {
            continue;
        };
        match device.apply_restore(result.book_id, content_id, changes) {
            Ok(()) => outcome.applied += 1,
            Err(e) => {
                tracing::error!("Device update for book {} failed: {}", result.book_id, e);
                outcome.failed.insert(result.book_id, e.to_string());
            }
        }
    }

    tracing::info!(
        "Restored reading state for {} books ({} failed)",
        outcome.applied,
        outcome.failed.len()
    );
    Ok(outcome)
}
