//! Un-grouped single-threshold stack.
//!
//! A strict subset of the windowed stack's shape: accumulate into one
//! fixed-capacity buffer, invoke a single global callback when full, reset.
//! No grouping, no byte-size trigger, no timer. Kept separate because its
//! only job is trivial fixed-size batching; the windowed coordinator does
//! not depend on it.

use tokio::sync::{mpsc, oneshot};

use crate::config::StackConfig;
use crate::error::StackError;

/// Fixed-capacity batcher with a single callback.
///
/// Items sent through [`sender`](Stack::sender) are buffered until
/// `max_stack` of them have arrived, at which point the callback receives
/// the full batch and the buffer resets. Once every sender is dropped the
/// non-empty remainder is delivered exactly once, then the completion ack
/// fires.
pub struct Stack<T> {
    ingestion: mpsc::Sender<T>,
    done: oneshot::Receiver<()>,
}

impl<T: Send + 'static> Stack<T> {
    /// Start the stacking task.
    ///
    /// Zero-valued configuration fields fall back to their defaults. Must
    /// be called from within a tokio runtime.
    pub fn new<F>(config: StackConfig, mut callback: F) -> Self
    where
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let config = config.normalized();
        let (ingestion, mut rx) = mpsc::channel::<T>(config.ingestion_buffer);
        let (done_tx, done) = oneshot::channel();

        let max_stack = config.max_stack;
        tokio::spawn(async move {
            let mut buf: Vec<T> = Vec::with_capacity(max_stack);

            while let Some(item) = rx.recv().await {
                buf.push(item);
                if buf.len() == max_stack {
                    callback(std::mem::replace(&mut buf, Vec::with_capacity(max_stack)));
                }
            }

            // Ingestion closed: deliver the partial remainder, if any.
            if !buf.is_empty() {
                callback(buf);
            }

            tracing::debug!("stack drained");
            let _ = done_tx.send(());
        });

        Self { ingestion, done }
    }

    /// A sender for the bounded ingestion channel.
    ///
    /// The stack drains to completion only after this handle and every
    /// clone of it have been dropped.
    pub fn sender(&self) -> mpsc::Sender<T> {
        self.ingestion.clone()
    }

    /// Push one item onto the stack.
    pub async fn push(&self, item: T) -> Result<(), StackError> {
        self.ingestion.send(item).await.map_err(|_| StackError::Closed)
    }

    /// Close ingestion and wait until the remainder has been flushed.
    ///
    /// Consumes the stack; clones obtained from [`sender`](Stack::sender)
    /// must be dropped as well before completion can be signaled.
    pub async fn close(self) -> Result<(), StackError> {
        drop(self.ingestion);
        self.done.await.map_err(|_| StackError::Closed)
    }
}
