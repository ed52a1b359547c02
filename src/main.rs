//! Windrow demo launcher.
//!
//! Reads JSON-line events from stdin, batches them by topic, and prints
//! each flushed batch back out as JSON lines. The batching core never sees
//! any of this; it only observes the `Grouped` capabilities.
//!
//! # Usage
//!
//! ```bash
//! printf '{"topic":"a","payload":1}\n{"topic":"b","payload":2}\n' \
//!     | windrow --max-items 3 --sweep-ms 2000
//! ```
//!
//! Environment variables can also be used:
//! - `WINDROW_SWEEP_MS`: Sweep interval in milliseconds
//! - `WINDROW_MAX_ITEMS`: Items per group before a count-triggered flush
//! - `WINDROW_MAX_BYTES`: Byte limit per group (0 disables the size trigger)
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use windrow::observability::tracing::init_tracing;
use windrow::{FlushHandler, Grouped, WindowedConfig, WindowedStack};

/// Windrow: grouped batching demo over stdin JSON lines.
#[derive(Parser, Debug, Clone)]
#[command(name = "windrow")]
#[command(author, version, about, long_about = None)]
struct Opts {
    /// Sweep interval in milliseconds
    #[arg(long, env = "WINDROW_SWEEP_MS", default_value_t = 3000)]
    sweep_ms: u64,

    /// Items per group before a count-triggered flush
    #[arg(long, env = "WINDROW_MAX_ITEMS", default_value_t = 10)]
    max_items: usize,

    /// Cumulative payload bytes per group before a size-triggered flush
    /// (0 disables the size trigger)
    #[arg(long, env = "WINDROW_MAX_BYTES", default_value_t = 0)]
    max_bytes: u64,

    /// Ingestion channel capacity (backpressure control)
    #[arg(long, env = "WINDROW_BUFFER", default_value_t = 64)]
    buffer: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

/// One stdin event: a topic tag plus an arbitrary JSON payload.
#[derive(Debug, Serialize, Deserialize)]
struct Event {
    topic: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Event wrapped with its precomputed byte weight and flush handler.
struct TopicItem {
    event: Event,
    size: u64,
    printer: Arc<ConsolePrinter>,
}

impl Grouped for TopicItem {
    fn group(&self) -> &str {
        &self.event.topic
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn flush_handler(&self) -> Arc<dyn FlushHandler<Self>> {
        self.printer.clone()
    }
}

/// Prints flushed batches to stdout as JSON lines.
struct ConsolePrinter;

#[async_trait]
impl FlushHandler<TopicItem> for ConsolePrinter {
    async fn flush(&self, batch: Vec<TopicItem>) {
        let Some(first) = batch.first() else { return };
        let total: u64 = batch.iter().map(|i| i.size).sum();
        tracing::info!(
            topic = %first.event.topic,
            items = batch.len(),
            bytes = total,
            "flushing batch"
        );

        for item in &batch {
            match serde_json::to_string(&item.event) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::error!(error = %err, "failed to render event"),
            }
        }
    }
}

/// Print startup banner with version and configuration.
fn print_banner(opts: &Opts) {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        r#"
  Windrow v{} - Grouped Batching Demo

  Configuration:
    Sweep:      {}ms
    Max Items:  {}
    Max Bytes:  {}
    Log Level:  {}

  Feed JSON lines on stdin; Ctrl+C or EOF drains and exits.
"#,
        version,
        opts.sweep_ms,
        opts.max_items,
        if opts.max_bytes == 0 {
            "disabled".to_string()
        } else {
            opts.max_bytes.to_string()
        },
        opts.log_level
    );
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl+c");
        tracing::info!("Received Ctrl+C, initiating shutdown...");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    init_tracing(&opts.log_level);
    print_banner(&opts);

    let config = WindowedConfig {
        sweep_interval: Duration::from_millis(opts.sweep_ms),
        max_items: opts.max_items,
        max_bytes: (opts.max_bytes > 0).then_some(opts.max_bytes),
        ingestion_buffer: opts.buffer,
    };
    let stack = WindowedStack::new(config);

    let reader_stack = stack.clone();
    let reader = tokio::spawn(async move {
        let printer = Arc::new(ConsolePrinter);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let event: Event = match serde_json::from_str(line) {
                        Ok(event) => event,
                        Err(err) => {
                            tracing::warn!(error = %err, "skipping malformed event");
                            continue;
                        }
                    };
                    let size = serde_json::to_vec(&event.payload)
                        .map(|bytes| bytes.len() as u64)
                        .unwrap_or(0);
                    let item = TopicItem {
                        event,
                        size,
                        printer: Arc::clone(&printer),
                    };
                    if let Err(err) = reader_stack.push(item).await {
                        tracing::warn!(error = %err, "push rejected");
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = reader => {
            tracing::info!("input exhausted, draining");
        }
        _ = shutdown_signal() => {}
    }

    stack.shutdown().await?;
    tracing::info!("Windrow shutdown complete");
    Ok(())
}
