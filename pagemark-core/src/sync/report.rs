//! What a batch produced

use crate::types::{BookId, Disposition, ReconciliationResult, SyncDirection, SyncPolicy};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts shown to the user after a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub not_on_device: usize,
    pub unresolved: usize,
    pub total: usize,
}

impl SyncSummary {
    pub fn tally(
        results: &BTreeMap<BookId, ReconciliationResult>,
        unresolved: &BTreeMap<BookId, String>,
    ) -> Self {
        let mut summary = SyncSummary {
            unresolved: unresolved.len(),
            total: results.len() + unresolved.len(),
            ..Default::default()
        };
        for result in results.values() {
            if result.changed {
                summary.updated += 1;
            } else if result.disposition == Disposition::NotOnDevice {
                summary.not_on_device += 1;
            } else {
                summary.unchanged += 1;
            }
        }
        summary
    }
}

/// Results of one batch, not yet applied
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub direction: SyncDirection,
    pub policy: SyncPolicy,

    /// Every book that was reconciled, changed or not
    pub results: BTreeMap<BookId, ReconciliationResult>,

    /// Books that failed, with the reason
    pub unresolved: BTreeMap<BookId, String>,

    pub summary: SyncSummary,
}

impl BatchReport {
    /// Results that stage at least one write
    pub fn changed(&self) -> impl Iterator<Item = &ReconciliationResult> {
        self.results.values().filter(|r| r.changed)
    }

    /// The result map and the policy it was produced under
    pub fn into_parts(self) -> (BTreeMap<BookId, ReconciliationResult>, SyncPolicy) {
        (self.results, self.policy)
    }
}
