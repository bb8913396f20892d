//! Sync policy and direction

use serde::{Deserialize, Serialize};

/// Which way reading state flows in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Device to library
    Store,
    /// Library to device
    Restore,
}

/// Conflict-handling options for one sync invocation
///
/// Immutable once built; passed by value or reference through every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncPolicy {
    /// Store: clear the library columns when the device has no bookmark
    pub clear_if_device_unread: bool,

    /// Store: only store when the device was read more recently than the library records
    pub store_only_if_more_recent: bool,

    /// Store: leave books the library already records as finished
    pub skip_if_library_finished: bool,

    /// Restore: derive the device read status from the percent read
    pub set_reading_status_on_restore: bool,

    /// Restore: reset the device position to unread
    pub reset_position_on_restore: bool,

    /// Restore: stamp the device last-read time with the current time
    pub stamp_now_on_restore: bool,

    /// Dispatch one job per book instead of a single batched job
    pub run_in_background: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            clear_if_device_unread: false,
            store_only_if_more_recent: false,
            skip_if_library_finished: false,
            set_reading_status_on_restore: true,
            reset_position_on_restore: false,
            stamp_now_on_restore: true,
            run_in_background: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_from_partial_json() {
        let policy: SyncPolicy =
            serde_json::from_str(r#"{ "storeOnlyIfMoreRecent": true }"#).unwrap();
        assert!(policy.store_only_if_more_recent);
        assert!(policy.set_reading_status_on_restore);
        assert!(policy.stamp_now_on_restore);
        assert!(!policy.clear_if_device_unread);
    }
}
