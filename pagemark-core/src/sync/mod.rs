//! Batch synchronisation between device and library
//!
//! A batch moves through `Idle → Dispatched → Aggregating → Complete`. The
//! coordinator is the only component that touches the stores; workers return
//! [`ReconciliationResult`](crate::types::ReconciliationResult)s as plain data
//! and the caller commits them afterwards.

mod commit;
mod coordinator;
mod job;
mod report;

pub use commit::{commit_to_device, commit_to_library, CommitOutcome};
pub use coordinator::{CoordinatorState, SyncCoordinator};
pub use job::{run_book, BookJob, DeviceSnapshot, JobContext};
pub use report::{BatchReport, SyncSummary};
