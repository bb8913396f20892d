//! Per-book work executed on the worker pool

use crate::codec::{self, to_library_bookmark};
use crate::config::LibraryColumns;
use crate::document::EpubBook;
use crate::error::{EstimateError, PagemarkError};
use crate::estimate::{estimate, whole_percent};
use crate::reconcile::{reconcile_restore, reconcile_store};
use crate::types::{
    BookId, DeviceReadingState, LibraryReadingState, ReadStatus, ReconciliationResult,
    SyncDirection, SyncPolicy,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Device state the coordinator picked for a book
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub content_id: String,

    /// Book file backing this content id, when known
    pub path: Option<PathBuf>,

    pub state: DeviceReadingState,
}

/// Everything a worker needs to reconcile one book
#[derive(Debug, Clone, PartialEq)]
pub struct BookJob {
    pub book_id: BookId,
    pub title: String,
    pub authors: Vec<String>,
    pub content_ids: Vec<String>,
    pub paths: Vec<PathBuf>,
    pub library_state: LibraryReadingState,

    /// `None` when no content id of the book is on the device
    pub device: Option<DeviceSnapshot>,
}

impl BookJob {
    pub fn new(book_id: BookId, title: impl Into<String>) -> Self {
        Self {
            book_id,
            title: title.into(),
            authors: Vec::new(),
            content_ids: Vec::new(),
            paths: Vec::new(),
            library_state: LibraryReadingState::default(),
            device: None,
        }
    }

    pub fn with_library_state(mut self, state: LibraryReadingState) -> Self {
        self.library_state = state;
        self
    }

    pub fn with_device(mut self, snapshot: DeviceSnapshot) -> Self {
        if !self.content_ids.contains(&snapshot.content_id) {
            self.content_ids.push(snapshot.content_id.clone());
            if let Some(path) = &snapshot.path {
                self.paths.push(path.clone());
            }
        }
        self.device = Some(snapshot);
        self
    }
}

/// Immutable inputs shared by every job of a batch
#[derive(Debug, Clone)]
pub struct JobContext {
    pub direction: SyncDirection,
    pub policy: SyncPolicy,
    pub columns: LibraryColumns,
    pub now: DateTime<Utc>,
}

/// Outcome of one book inside a job
pub type BookOutcome = (BookId, Result<ReconciliationResult, String>);

/// Run a group of books; a failing book does not affect the others
pub fn run_books(context: &JobContext, books: Vec<BookJob>) -> Vec<BookOutcome> {
    books
        .into_iter()
        .map(|book| {
            let book_id = book.book_id;
            let outcome = run_book(context, book).map_err(|e| {
                tracing::error!("Book {} could not be reconciled: {}", book_id, e);
                e.to_string()
            });
            (book_id, outcome)
        })
        .collect()
}

/// Reconcile a single book
pub fn run_book(context: &JobContext, mut book: BookJob) -> crate::Result<ReconciliationResult> {
    match context.direction {
        SyncDirection::Store => {
            let Some(snapshot) = book.device.as_mut() else {
                tracing::debug!("Book {} ({}) is not on the device", book.book_id, book.title);
                return Ok(ReconciliationResult::unchanged(
                    book.book_id,
                    crate::types::Disposition::NotOnDevice,
                    None,
                ));
            };

            if needs_estimate(&snapshot.state) {
                if let Some(path) = snapshot.path.as_deref() {
                    snapshot.state.raw_percent = Some(estimate_device_percent(
                        book.book_id,
                        &snapshot.content_id,
                        &snapshot.state,
                        path,
                    )?);
                }
            }

            let result = reconcile_store(
                book.book_id,
                &snapshot.content_id,
                &snapshot.state,
                &book.library_state,
                &context.columns,
                &context.policy,
            )?;
            Ok(result)
        }
        SyncDirection::Restore => Ok(reconcile_restore(
            book.book_id,
            book.device
                .as_ref()
                .map(|snapshot| (snapshot.content_id.as_str(), &snapshot.state)),
            &book.library_state,
            &context.columns,
            &context.policy,
            context.now,
        )),
    }
}

fn needs_estimate(state: &DeviceReadingState) -> bool {
    state.raw_percent.is_none() && state.mark.is_some() && state.read_status != ReadStatus::Finished
}

/// Percent read at the device mark, computed from the book file
fn estimate_device_percent(
    book_id: BookId,
    content_id: &str,
    state: &DeviceReadingState,
    path: &Path,
) -> crate::Result<u8> {
    let Some(mark) = state.mark.as_deref() else {
        return Ok(0);
    };
    let location = to_library_bookmark(mark, content_id, state.native_format)?;
    let book = EpubBook::open(path)?;
    let position = codec::decode(book.spine(), &location)?;

    match estimate(book.spine(), &book, &position) {
        Ok(percent) => {
            tracing::debug!("Book {} estimated at {:.1}%", book_id, percent);
            Ok(whole_percent(percent))
        }
        Err(PagemarkError::Estimate(EstimateError::EmptyBook)) => {
            tracing::warn!("Book {} has no text to measure, reporting 0%", book_id);
            Ok(0)
        }
        Err(e) => Err(e),
    }
}
