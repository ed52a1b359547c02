//! Configuration for the batching engine.
//!
//! Both records carry sensible defaults and are normalized exactly once,
//! at construction of the stack that consumes them.

use std::time::Duration;

/// Default interval between flush-all sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3);

/// Default number of items a group holds before a count-triggered flush.
pub const DEFAULT_MAX_ITEMS: usize = 10;

/// Default capacity of the bounded ingestion channel.
pub const DEFAULT_INGESTION_BUFFER: usize = 64;

/// Configuration for [`WindowedStack`](crate::windowed::WindowedStack).
///
/// The count trigger and the sweep timer are always active; the byte-size
/// trigger is active only when `max_bytes` is set.
#[derive(Debug, Clone)]
pub struct WindowedConfig {
    /// Fixed period of the flush-all sweep. Not reset by group activity.
    pub sweep_interval: Duration,

    /// Number of items a group may hold before a flush is triggered.
    /// The trigger fires the moment the count reaches this limit.
    pub max_items: usize,

    /// Cumulative byte-size limit per group. The trigger fires on the
    /// append that pushes the total strictly over this limit. `None`
    /// disables size-based flushing entirely.
    pub max_bytes: Option<u64>,

    /// Capacity of the bounded ingestion channel (backpressure control).
    pub ingestion_buffer: usize,
}

impl Default for WindowedConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_items: DEFAULT_MAX_ITEMS,
            max_bytes: None,
            ingestion_buffer: DEFAULT_INGESTION_BUFFER,
        }
    }
}

impl WindowedConfig {
    /// Replace zero-valued fields with their defaults.
    ///
    /// A zero sweep interval or item limit is never meaningful; treating
    /// zero as "use the default" lets callers fill in only the fields they
    /// care about.
    pub(crate) fn normalized(mut self) -> Self {
        if self.sweep_interval.is_zero() {
            self.sweep_interval = DEFAULT_SWEEP_INTERVAL;
        }
        if self.max_items == 0 {
            self.max_items = DEFAULT_MAX_ITEMS;
        }
        if self.ingestion_buffer == 0 {
            self.ingestion_buffer = DEFAULT_INGESTION_BUFFER;
        }
        if self.max_bytes == Some(0) {
            self.max_bytes = None;
        }
        self
    }
}

/// Configuration for the un-grouped [`Stack`](crate::stack::Stack) variant.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Number of items that must accumulate before the callback runs.
    pub max_stack: usize,

    /// Capacity of the bounded ingestion channel.
    pub ingestion_buffer: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_stack: DEFAULT_MAX_ITEMS,
            ingestion_buffer: DEFAULT_INGESTION_BUFFER,
        }
    }
}

impl StackConfig {
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_stack == 0 {
            self.max_stack = DEFAULT_MAX_ITEMS;
        }
        if self.ingestion_buffer == 0 {
            self.ingestion_buffer = DEFAULT_INGESTION_BUFFER;
        }
        self
    }
}
