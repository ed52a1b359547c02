//! Per-group batch accumulator.
//!
//! Holds one group's pending items in push order together with their
//! running byte total and the flush handler captured when the group was
//! created. The windowed coordinator owns every accumulator; nothing here
//! is shared across threads.

use std::sync::Arc;

use crate::grouped::{FlushHandler, Grouped};

/// Buffer of pending items for a single group.
///
/// Invariant: `total_bytes` always equals the sum of `size_bytes()` over
/// the items currently held; both reset together when a batch is taken.
pub(crate) struct GroupAccumulator<T> {
    items: Vec<T>,
    total_bytes: u64,
    handler: Arc<dyn FlushHandler<T>>,
}

impl<T: Grouped> GroupAccumulator<T> {
    /// Create an empty accumulator bound to the given handler.
    ///
    /// The handler is fixed for the life of the group.
    pub(crate) fn new(handler: Arc<dyn FlushHandler<T>>) -> Self {
        Self {
            items: Vec::new(),
            total_bytes: 0,
            handler,
        }
    }

    /// Append an item and grow the running byte total. Always succeeds.
    pub(crate) fn append(&mut self, item: T) {
        self.total_bytes += item.size_bytes();
        self.items.push(item);
    }

    /// Take the pending batch, resetting the accumulator in place.
    ///
    /// Returns `None` when there is nothing to flush, which makes flushes
    /// over idle groups (sweeps, redundant trigger signals) no-ops.
    pub(crate) fn take_batch(&mut self) -> Option<(Arc<dyn FlushHandler<T>>, Vec<T>)> {
        if self.items.is_empty() {
            return None;
        }
        self.total_bytes = 0;
        let batch = std::mem::take(&mut self.items);
        Some((Arc::clone(&self.handler), batch))
    }

    /// Deliver the pending batch to the handler, then clear.
    ///
    /// The handler call is awaited inline; errors are the handler's to
    /// surface, never retried here.
    pub(crate) async fn flush(&mut self) {
        if let Some((handler, batch)) = self.take_batch() {
            handler.flush(batch).await;
        }
    }

    /// Number of pending items.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Running byte total of pending items.
    pub(crate) fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}
