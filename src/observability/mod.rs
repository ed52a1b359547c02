//! Observability infrastructure.
//!
//! Provides structured tracing setup for the demo binary and for tests.

pub mod tracing;
