//! Policy-driven merge decisions between device and library reading state
//!
//! Both directions are pure functions of their inputs: no I/O, no clock reads
//! (restore takes `now` as an argument), no shared state. Only fields whose
//! library column is configured take part, and only fields that differ from
//! the stored value are staged for writing.

mod restore;
mod store;

pub use restore::reconcile_restore;
pub use store::reconcile_store;

use chrono::{DateTime, Utc};

/// Whether the device was read after the library's last recorded read
///
/// A missing library time counts as older; a missing device time never wins.
pub fn is_more_recent(device: Option<DateTime<Utc>>, library: Option<DateTime<Utc>>) -> bool {
    match (device, library) {
        (Some(device), Some(library)) => device > library,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
