//! Batch dispatch and aggregation

use super::job::{run_books, BookJob, BookOutcome, DeviceSnapshot, JobContext};
use super::report::{BatchReport, SyncSummary};
use crate::config::{DeviceConfig, LibraryColumns, SyncConfig};
use crate::error::ConfigError;
use crate::storage::{DeviceDatabase, LibraryStore, StorageResult};
use crate::types::{BookId, DeviceReadingState, ReconciliationResult, SyncDirection, SyncPolicy};
use chrono::Utc;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// Where a batch is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Dispatched,
    Aggregating,
    Complete,
}

/// Work a job performs on its group of books
type JobRunner = fn(&JobContext, Vec<BookJob>) -> Vec<BookOutcome>;

/// Completion message from one job
struct JobMessage {
    job: usize,
    outcome: Result<Vec<BookOutcome>, String>,
}

/// Runs reconciliation batches on a worker pool
///
/// The coordinator reads device state, dispatches jobs and blocks only while
/// waiting for their completion messages. Workers compute results and never
/// touch a store.
pub struct SyncCoordinator {
    pool: rayon::ThreadPool,
    columns: LibraryColumns,
    device: DeviceConfig,
    job_timeout: Option<Duration>,
    state: CoordinatorState,
}

impl SyncCoordinator {
    pub fn new(config: &SyncConfig) -> crate::Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("pagemark-worker-{}", i))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "workers",
                reason: e.to_string(),
            })?;

        Ok(Self {
            pool,
            columns: config.columns.clone(),
            device: config.device.clone(),
            job_timeout: config.job_timeout(),
            state: CoordinatorState::Idle,
        })
    }

    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Reconcile `book_ids` against the device in `direction`
    ///
    /// Returns the change set without applying it. Per-book failures are
    /// collected in the report; only a policy/column mismatch fails the batch.
    pub fn run_batch(
        &mut self,
        device: &DeviceDatabase,
        library: &dyn LibraryStore,
        book_ids: &[BookId],
        direction: SyncDirection,
        policy: SyncPolicy,
    ) -> crate::Result<BatchReport> {
        self.columns.check_policy(&policy)?;

        let (jobs, unresolved) = self.prepare_jobs(device, library, book_ids, direction);
        let mut report = self.run_jobs(jobs, direction, policy);
        for (book_id, reason) in unresolved {
            report.unresolved.insert(book_id, reason);
        }
        report.summary = SyncSummary::tally(&report.results, &report.unresolved);
        Ok(report)
    }

    /// Read library and device state for each book, on the coordinator's thread
    pub fn prepare_jobs(
        &self,
        device: &DeviceDatabase,
        library: &dyn LibraryStore,
        book_ids: &[BookId],
        direction: SyncDirection,
    ) -> (Vec<BookJob>, BTreeMap<BookId, String>) {
        let mut jobs = Vec::with_capacity(book_ids.len());
        let mut unresolved = BTreeMap::new();

        let books = match library.books(book_ids) {
            Ok(books) => books,
            Err(e) => {
                for id in book_ids {
                    unresolved.insert(*id, e.to_string());
                }
                return (jobs, unresolved);
            }
        };
        if books.len() < book_ids.len() {
            for id in book_ids {
                if !books.iter().any(|b| b.id == *id) {
                    unresolved.insert(*id, "not in the library".to_string());
                }
            }
        }

        for book in books {
            let library_state = match library.reading_state(book.id) {
                Ok(state) => state,
                Err(e) => {
                    unresolved.insert(book.id, e.to_string());
                    continue;
                }
            };
            let snapshot = match self.device_snapshot(device, &book.content_ids, &book.paths, direction) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!("Could not read device state for book {}: {}", book.id, e);
                    unresolved.insert(book.id, e.to_string());
                    continue;
                }
            };

            jobs.push(BookJob {
                book_id: book.id,
                title: book.title,
                authors: book.authors,
                content_ids: book.content_ids,
                paths: book.paths,
                library_state,
                device: snapshot,
            });
        }

        (jobs, unresolved)
    }

    /// Pick the device state for a book with one or more content ids
    fn device_snapshot(
        &self,
        device: &DeviceDatabase,
        content_ids: &[String],
        paths: &[std::path::PathBuf],
        direction: SyncDirection,
    ) -> StorageResult<Option<DeviceSnapshot>> {
        let mut best: Option<DeviceSnapshot> = None;

        for (i, content_id) in content_ids.iter().enumerate() {
            let state: Option<DeviceReadingState> = match direction {
                SyncDirection::Store => device.store_state(content_id)?,
                SyncDirection::Restore => device.content_state(content_id)?,
            };
            let Some(state) = state else {
                continue;
            };
            let candidate = DeviceSnapshot {
                content_id: content_id.clone(),
                path: paths.get(i).map(|p| self.device.resolve_book_path(p)),
                state,
            };

            match direction {
                // restore writes the first copy found
                SyncDirection::Restore => return Ok(Some(candidate)),
                SyncDirection::Store => {
                    let further = best
                        .as_ref()
                        .map_or(true, |b| candidate.state.is_further_than(&b.state));
                    if further {
                        best = Some(candidate);
                    }
                }
            }
        }

        Ok(best)
    }

    /// Dispatch prepared jobs and aggregate their results
    pub fn run_jobs(
        &mut self,
        jobs: Vec<BookJob>,
        direction: SyncDirection,
        policy: SyncPolicy,
    ) -> BatchReport {
        self.dispatch(jobs, direction, policy, run_books)
    }

    fn dispatch(
        &mut self,
        jobs: Vec<BookJob>,
        direction: SyncDirection,
        policy: SyncPolicy,
        runner: JobRunner,
    ) -> BatchReport {
        let total = jobs.len();
        let context = Arc::new(JobContext {
            direction,
            policy,
            columns: self.columns.clone(),
            now: Utc::now(),
        });

        let groups: Vec<Vec<BookJob>> = if policy.run_in_background {
            jobs.into_iter().map(|job| vec![job]).collect()
        } else if jobs.is_empty() {
            Vec::new()
        } else {
            vec![jobs]
        };

        let (tx, rx) = mpsc::channel::<JobMessage>();
        let mut outstanding: BTreeMap<usize, Vec<BookId>> = BTreeMap::new();

        for (job, books) in groups.into_iter().enumerate() {
            outstanding.insert(job, books.iter().map(|b| b.book_id).collect());
            let tx = tx.clone();
            let context = Arc::clone(&context);
            self.pool.spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| runner(&context, books)))
                    .map_err(panic_message);
                // the receiver is gone once the coordinator has timed out
                let _ = tx.send(JobMessage { job, outcome });
            });
        }
        drop(tx);

        let dispatched = outstanding.len();
        self.state = CoordinatorState::Dispatched;
        tracing::info!("Dispatched {} jobs for {} books ({:?})", dispatched, total, direction);

        let mut results: BTreeMap<BookId, ReconciliationResult> = BTreeMap::new();
        let mut unresolved: BTreeMap<BookId, String> = BTreeMap::new();

        self.state = CoordinatorState::Aggregating;
        while !outstanding.is_empty() {
            let received = match self.job_timeout {
                Some(timeout) => rx.recv_timeout(timeout),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    let reason = match e {
                        RecvTimeoutError::Timeout => "job timed out",
                        RecvTimeoutError::Disconnected => "worker exited without reporting",
                    };
                    tracing::error!("{} with {} jobs outstanding", reason, outstanding.len());
                    for book_id in outstanding.values().flatten() {
                        unresolved.insert(*book_id, reason.to_string());
                    }
                    outstanding.clear();
                    break;
                }
            };

            let Some(books) = outstanding.remove(&message.job) else {
                continue;
            };
            match message.outcome {
                Ok(outcomes) => {
                    for (book_id, outcome) in outcomes {
                        match outcome {
                            Ok(result) => {
                                results.insert(book_id, result);
                            }
                            Err(reason) => {
                                unresolved.insert(book_id, reason);
                            }
                        }
                    }
                }
                Err(reason) => {
                    tracing::error!("Job {} panicked: {}", message.job, reason);
                    for book_id in books {
                        unresolved.insert(book_id, format!("job panicked: {}", reason));
                    }
                }
            }
        }

        self.state = CoordinatorState::Complete;
        let summary = SyncSummary::tally(&results, &unresolved);
        tracing::info!(
            "Batch complete: {} updated, {} unchanged, {} not on device, {} unresolved, {} total",
            summary.updated,
            summary.unchanged,
            summary.not_on_device,
            summary.unresolved,
            summary.total
        );

        BatchReport {
            direction,
            policy,
            results,
            unresolved,
            summary,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
