//! Test harness for batching tests.
//!
//! Provides:
//! - A `TestItem` implementing the `Grouped` capability set
//! - A recording flush handler that forwards batches to a channel

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use windrow::{FlushHandler, Grouped};

/// Item used across integration tests: a group tag, a byte weight, and a
/// sequence number for order/multiset assertions.
#[derive(Clone)]
pub struct TestItem {
    pub group: String,
    pub size: u64,
    pub seq: usize,
    pub handler: Arc<RecordingHandler>,
}

impl Grouped for TestItem {
    fn group(&self) -> &str {
        &self.group
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn flush_handler(&self) -> Arc<dyn FlushHandler<Self>> {
        self.handler.clone()
    }
}

/// Flush handler that forwards every delivered batch to an unbounded
/// channel, so tests can await deliveries without polling.
pub struct RecordingHandler {
    tx: mpsc::UnboundedSender<Vec<TestItem>>,
}

#[async_trait]
impl FlushHandler<TestItem> for RecordingHandler {
    async fn flush(&self, batch: Vec<TestItem>) {
        let _ = self.tx.send(batch);
    }
}

/// Create a recording handler and the receiver observing its batches.
pub fn recording_handler() -> (
    Arc<RecordingHandler>,
    mpsc::UnboundedReceiver<Vec<TestItem>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingHandler { tx }), rx)
}

/// Shorthand for building a test item bound to a recording handler.
pub fn item(handler: &Arc<RecordingHandler>, group: &str, size: u64, seq: usize) -> TestItem {
    TestItem {
        group: group.into(),
        size,
        seq,
        handler: Arc::clone(handler),
    }
}
