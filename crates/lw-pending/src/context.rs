//! Per-batch state shared by the operations of one request batch.

use lw_tables::TableCache;
use tracing::debug;

use crate::guard::DuplicateRequestGuard;

/// Everything one batch of change requests shares.
///
/// A non-interactive batch pins the table cache for its lifetime, since no
/// caller keeps the tables alive between its operations. The pin is
/// released by [`finish`](Self::finish) or when the context is dropped.
#[derive(Debug)]
pub struct BatchContext<'a> {
    tables: &'a TableCache,
    guard: Option<DuplicateRequestGuard>,
    pinned: bool,
}

impl<'a> BatchContext<'a> {
    pub fn begin(tables: &'a TableCache, request_count: usize, non_interactive: bool) -> Self {
        let pinned = non_interactive && !tables.is_pinning();
        if pinned {
            tables.set_pinning(true);
        }
        debug!(request_count, non_interactive, "batch started");
        Self {
            tables,
            guard: DuplicateRequestGuard::for_batch(request_count),
            pinned,
        }
    }

    pub fn tables(&self) -> &'a TableCache {
        self.tables
    }

    /// Returns `true` if `local_item` was already handled in this batch.
    /// Always `false` for single-request batches.
    pub fn is_duplicate(&mut self, local_item: &str) -> bool {
        self.guard.as_mut().is_some_and(|guard| guard.check(local_item))
    }

    /// End the batch, releasing the cache pin if this batch set it.
    pub fn finish(self) {}
}

impl Drop for BatchContext<'_> {
    fn drop(&mut self) {
        if self.pinned {
            self.tables.set_pinning(false);
            debug!("batch finished, table cache unpinned");
        }
    }
}
