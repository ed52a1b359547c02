//! Windowed multi-group batching coordinator.
//!
//! A single control-loop task owns every group accumulator. Producers,
//! trigger signals, and the sweep timer reach it only through channels, so
//! the group registry itself needs no locking. The one piece of state read
//! outside the loop is the closing flag, which lets concurrent `push`
//! callers fail fast once shutdown has begun.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::accumulator::GroupAccumulator;
use crate::config::WindowedConfig;
use crate::error::StackError;
use crate::grouped::Grouped;

/// Capacity of the internal per-group flush-signal channel.
const FLUSH_CHANNEL_CAPACITY: usize = 64;

/// Handle to a running windowed stack.
///
/// Cheap to clone; every clone pushes into the same control loop. Items
/// are accumulated per group key and flushed to the group's handler when
/// the count trigger, the optional byte-size trigger, or the periodic
/// sweep fires. Within a group, batches preserve push order.
///
/// # Example
///
/// ```ignore
/// let stack = WindowedStack::new(WindowedConfig {
///     max_items: 3,
///     max_bytes: Some(10),
///     ..WindowedConfig::default()
/// });
/// stack.push(item).await?;
/// stack.shutdown().await?;
/// ```
pub struct WindowedStack<T> {
    in_tx: mpsc::Sender<T>,
    quit_tx: mpsc::Sender<oneshot::Sender<()>>,
    closing: Arc<RwLock<bool>>,
}

impl<T> Clone for WindowedStack<T> {
    fn clone(&self) -> Self {
        Self {
            in_tx: self.in_tx.clone(),
            quit_tx: self.quit_tx.clone(),
            closing: Arc::clone(&self.closing),
        }
    }
}

impl<T: Grouped> WindowedStack<T> {
    /// Start a windowed stack and its control loop.
    ///
    /// Zero-valued configuration fields fall back to their defaults. Must
    /// be called from within a tokio runtime.
    pub fn new(config: WindowedConfig) -> Self {
        let config = config.normalized();
        let (in_tx, in_rx) = mpsc::channel(config.ingestion_buffer);
        let (flush_tx, flush_rx) = mpsc::channel(FLUSH_CHANNEL_CAPACITY);
        let (quit_tx, quit_rx) = mpsc::channel(1);
        let closing = Arc::new(RwLock::new(false));

        let control = ControlLoop {
            config,
            groups: HashMap::new(),
            in_rx,
            flush_rx,
            flush_tx,
            quit_rx,
            closing: Arc::clone(&closing),
        };
        tokio::spawn(control.run());

        Self {
            in_tx,
            quit_tx,
            closing,
        }
    }

    /// Submit one item for batching.
    ///
    /// Blocks only when the bounded ingestion channel is full
    /// (backpressure). Fails fast with [`StackError::Closed`] once
    /// shutdown has begun; the item is returned to the caller's
    /// discretion, never silently dropped by the engine.
    pub async fn push(&self, item: T) -> Result<(), StackError> {
        if self.is_closing() {
            return Err(StackError::Closed);
        }

        tracing::debug!(group = item.group(), "pushing");
        self.in_tx.send(item).await.map_err(|_| StackError::Closed)
    }

    /// Request a graceful shutdown and wait for it to complete.
    ///
    /// The loop stops accepting items, absorbs anything already buffered
    /// in the ingestion channel, flushes every group, and only then
    /// acknowledges. Intended to be called once per stack; later calls
    /// observe the stopped loop and return [`StackError::Closed`].
    ///
    /// Completion is unbounded if a flush handler blocks indefinitely;
    /// that risk is the handler author's to manage.
    pub async fn shutdown(&self) -> Result<(), StackError> {
        tracing::info!("shutdown requested");

        let (ack_tx, ack_rx) = oneshot::channel();
        self.quit_tx
            .send(ack_tx)
            .await
            .map_err(|_| StackError::Closed)?;
        ack_rx.await.map_err(|_| StackError::Closed)
    }

    fn is_closing(&self) -> bool {
        // A poisoned flag means the loop panicked mid-transition; either
        // way the stack is no longer accepting items.
        *self
            .closing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Control-loop state: sole owner of the group registry.
struct ControlLoop<T> {
    config: WindowedConfig,
    groups: HashMap<String, GroupAccumulator<T>>,
    in_rx: mpsc::Receiver<T>,
    flush_rx: mpsc::Receiver<String>,
    flush_tx: mpsc::Sender<String>,
    quit_rx: mpsc::Receiver<oneshot::Sender<()>>,
    closing: Arc<RwLock<bool>>,
}

impl<T: Grouped> ControlLoop<T> {
    async fn run(mut self) {
        let period = self.config.sweep_interval;
        // First sweep fires one full period after start; the timer is
        // fixed-period and never reset by group activity.
        let mut sweep = interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(item) = self.in_rx.recv() => {
                    self.add(item);
                }
                Some(group) = self.flush_rx.recv() => {
                    tracing::debug!(group = %group, "flushing group");
                    self.flush_group(&group).await;
                }
                _ = sweep.tick() => {
                    self.sweep_all().await;
                }
                cmd = self.quit_rx.recv() => {
                    // None means every handle was dropped without an
                    // explicit shutdown; drain all the same.
                    self.drain(cmd).await;
                    return;
                }
            }
        }
    }

    /// Register the item under its group and evaluate this group's
    /// count and size triggers.
    fn add(&mut self, item: T) {
        let key = item.group().to_string();
        let (len, bytes) = {
            let acc = self
                .groups
                .entry(key.clone())
                .or_insert_with(|| GroupAccumulator::new(item.flush_handler()));
            acc.append(item);
            (acc.len(), acc.total_bytes())
        };
        tracing::debug!(group = %key, len, bytes, "added");

        // Size check fires on the append that pushed the total over the
        // limit; count check fires the moment the limit is reached.
        if let Some(max_bytes) = self.config.max_bytes {
            if bytes > max_bytes {
                self.signal_flush(key);
                return;
            }
        }
        if len >= self.config.max_items {
            self.signal_flush(key);
        }
    }

    /// Asynchronously enqueue a "flush this group" signal.
    ///
    /// The loop alone drains the flush channel, so it must never block
    /// sending into it; the send runs on its own task instead.
    fn signal_flush(&self, group: String) {
        let tx = self.flush_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(group).await;
        });
    }

    async fn flush_group(&mut self, group: &str) {
        if let Some(acc) = self.groups.get_mut(group) {
            // No-op on an already-emptied group, which makes trigger
            // signals overtaken by a sweep or shutdown harmless.
            acc.flush().await;
        }
    }

    /// Flush every non-empty group concurrently and wait for all of them.
    ///
    /// This wait is the design's one synchronization barrier: the loop
    /// handles no further event until every flush launched by this sweep
    /// has completed.
    async fn sweep_all(&mut self) {
        tracing::debug!(groups = self.groups.len(), "flushing all groups");

        let mut flushes = JoinSet::new();
        for acc in self.groups.values_mut() {
            if let Some((handler, batch)) = acc.take_batch() {
                flushes.spawn(async move {
                    handler.flush(batch).await;
                });
            }
        }

        while let Some(res) = flushes.join_next().await {
            if let Err(err) = res {
                tracing::error!(error = %err, "flush task failed");
            }
        }
    }

    /// Running → Draining → Stopped.
    async fn drain(&mut self, ack: Option<oneshot::Sender<()>>) {
        tracing::info!("draining");

        {
            let mut closing = self
                .closing
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *closing = true;
        }

        // Stop accepting sends, then absorb items already buffered in the
        // channel so nothing in flight is dropped. Trigger signals spawned
        // here go unanswered; the flush-all below covers those groups.
        self.in_rx.close();
        while let Some(item) = self.in_rx.recv().await {
            self.add(item);
        }

        self.sweep_all().await;

        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        tracing::info!("stopped");
    }
}
