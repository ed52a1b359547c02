//! Windrow: a grouped batching engine with three independent flush triggers.
//!
//! Items tagged with a group key are accumulated per group until one of
//! three conditions fires — item count, cumulative byte size, or a periodic
//! sweep timer — at which point the batch is handed to the group's flush
//! handler and the accumulator is reset. Shutdown drains every group to
//! completion before returning.
//!
//! # Architecture
//!
//! - **Single-owner control loop**: one task owns all group state; producers
//!   and timers reach it only through channels, never through shared maps
//! - **Per-group ordering**: within a group, batches preserve push order
//! - **At-most-one delivery**: a batch is handed to its handler exactly once,
//!   with no retries and no re-buffering on handler failure
//! - **Graceful drain**: shutdown flushes every group before completing
//!
//! # Modules
//!
//! - [`config`]: batching thresholds and timer configuration
//! - [`error`]: error taxonomy
//! - [`grouped`]: the item and flush-handler capability traits
//! - [`accumulator`]: per-group batch buffer
//! - [`windowed`]: the multi-group batching coordinator
//! - [`stack`]: un-grouped fixed-capacity variant
//! - [`observability`]: tracing setup

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // windowed::WindowedStack is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod accumulator;
pub mod config;
pub mod error;
pub mod grouped;
pub mod observability;
pub mod stack;
pub mod windowed;

pub use config::{StackConfig, WindowedConfig};
pub use error::StackError;
pub use grouped::{FlushHandler, Grouped};
pub use stack::Stack;
pub use windowed::WindowedStack;
