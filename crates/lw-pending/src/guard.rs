//! Per-batch duplicate request detection.

use std::collections::HashSet;

use lw_types::NoCase;
use tracing::debug;

/// Remembers the local paths already handled in one batch of requests.
///
/// Paths are compared without regard to case. Two spellings that reach the
/// same file through different mappings are not detected; the guard is a
/// safety net, not a proof of uniqueness.
#[derive(Debug, Default)]
pub struct DuplicateRequestGuard {
    seen: HashSet<NoCase>,
}

impl DuplicateRequestGuard {
    /// A guard for a batch of `request_count` requests, or `None` when the
    /// batch is too small to contain a repeat.
    pub fn for_batch(request_count: usize) -> Option<Self> {
        (request_count > 1).then(Self::default)
    }

    /// Record `local_item`. Returns `true` if it was already recorded.
    pub fn check(&mut self, local_item: &str) -> bool {
        let repeat = !self.seen.insert(NoCase::new(local_item));
        if repeat {
            debug!(local_item, "duplicate request in batch");
        }
        repeat
    }

    /// Number of distinct paths recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
