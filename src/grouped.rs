//! Item and flush-handler capability traits.
//!
//! An item entering the windowed stack must say which group it belongs to,
//! how many bytes it weighs, and which handler its group's batches are
//! delivered to. The engine never inspects items beyond these three
//! capabilities.

use async_trait::async_trait;
use std::sync::Arc;

/// Receives the full ordered batch of a group when a flush trigger fires.
///
/// The call is made exactly once per batch. Handlers are responsible for
/// surfacing their own failures; the engine does not retry and does not
/// re-buffer items on failure.
#[async_trait]
pub trait FlushHandler<T>: Send + Sync {
    /// Deliver one flushed batch. Items appear in push order.
    async fn flush(&self, batch: Vec<T>);
}

/// Capability set an item must provide to be batched by group.
pub trait Grouped: Send + 'static {
    /// The group key this item is accumulated under.
    fn group(&self) -> &str;

    /// Byte weight of this item, counted toward the group's size trigger.
    fn size_bytes(&self) -> u64;

    /// The handler this item's group delivers batches to.
    ///
    /// Only the first item of a group determines the handler; handlers
    /// carried by later items for the same key are ignored.
    fn flush_handler(&self) -> Arc<dyn FlushHandler<Self>>
    where
        Self: Sized;
}
