//! Integration tests for the windowed multi-group coordinator.
//!
//! Covers the three flush triggers, the shutdown drain, per-group
//! ordering, and delivery exactness under concurrent producers.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::timeout;

use common::{item, recording_handler};
use windrow::observability::tracing::init_test_tracing;
use windrow::{StackError, WindowedConfig, WindowedStack};

/// A sweep interval long enough that it never fires in trigger tests.
const NO_SWEEP: Duration = Duration::from_secs(600);

fn config(max_items: usize, max_bytes: Option<u64>, sweep: Duration) -> WindowedConfig {
    WindowedConfig {
        sweep_interval: sweep,
        max_items,
        max_bytes,
        ingestion_buffer: 16,
    }
}

#[tokio::test]
async fn test_count_trigger_flushes_exactly_once() {
    init_test_tracing();
    let stack = WindowedStack::new(config(3, Some(10), NO_SWEEP));
    let (handler, mut rx) = recording_handler();

    for seq in 0..3 {
        stack.push(item(&handler, "hello", 1, seq)).await.unwrap();
    }

    let batch = rx.recv().await.expect("count-triggered flush");
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|i| i.group == "hello"));
    // Within a group, delivery order matches push order.
    assert_eq!(batch.iter().map(|i| i.seq).collect::<Vec<_>>(), [0, 1, 2]);

    // Exactly one flush: nothing else arrives.
    assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());

    stack.shutdown().await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_size_trigger_fires_on_oversized_append() {
    init_test_tracing();
    let stack = WindowedStack::new(config(3, Some(10), NO_SWEEP));
    let (handler, mut rx) = recording_handler();

    // Far below the count threshold, far above the byte threshold.
    stack.push(item(&handler, "hello", 100, 0)).await.unwrap();

    let batch = rx.recv().await.expect("size-triggered flush");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].size, 100);

    stack.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disabled_size_trigger_never_fires() {
    init_test_tracing();
    let stack = WindowedStack::new(config(5, None, NO_SWEEP));
    let (handler, mut rx) = recording_handler();

    stack.push(item(&handler, "hello", 10_000, 0)).await.unwrap();
    assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());

    stack.shutdown().await.unwrap();
    let batch = rx.recv().await.expect("shutdown flush");
    assert_eq!(batch.len(), 1);
}

#[tokio::test]
async fn test_count_trigger_flushes_only_its_group() {
    init_test_tracing();
    let stack = WindowedStack::new(config(3, None, NO_SWEEP));
    let (handler, mut rx) = recording_handler();

    stack.push(item(&handler, "other", 1, 99)).await.unwrap();
    for seq in 0..3 {
        stack.push(item(&handler, "full", 1, seq)).await.unwrap();
    }

    let batch = rx.recv().await.expect("flush for the full group");
    assert!(batch.iter().all(|i| i.group == "full"));
    assert_eq!(batch.len(), 3);

    // The other group keeps its item until shutdown.
    stack.shutdown().await.unwrap();
    let batch = rx.recv().await.expect("shutdown flush");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].group, "other");
}

#[tokio::test(start_paused = true)]
async fn test_sweep_flushes_every_group_after_interval() {
    init_test_tracing();
    let sweep = Duration::from_secs(2);
    let stack = WindowedStack::new(config(10, Some(10), sweep));
    let (handler, mut rx) = recording_handler();

    let start = tokio::time::Instant::now();
    let mut seq = 0;
    for (group, count) in [("hello", 2), ("world", 2), ("triple", 3)] {
        for _ in 0..count {
            stack.push(item(&handler, group, 1, seq)).await.unwrap();
            seq += 1;
        }
    }

    // One flush notification per distinct group, none before the interval.
    let mut per_group: HashMap<String, Vec<usize>> = HashMap::new();
    for _ in 0..3 {
        let batch = rx.recv().await.expect("sweep flush");
        assert!(start.elapsed() >= sweep, "flush arrived before the sweep");
        let group = batch[0].group.clone();
        assert!(batch.iter().all(|i| i.group == group));
        per_group.insert(group, batch.iter().map(|i| i.seq).collect());
    }

    assert_eq!(per_group["hello"], [0, 1]);
    assert_eq!(per_group["world"], [2, 3]);
    assert_eq!(per_group["triple"], [4, 5, 6]);

    stack.shutdown().await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_over_idle_groups_is_silent() {
    init_test_tracing();
    let stack = WindowedStack::new(config(2, None, Duration::from_secs(1)));
    let (handler, mut rx) = recording_handler();

    stack.push(item(&handler, "hello", 1, 0)).await.unwrap();
    stack.push(item(&handler, "hello", 1, 1)).await.unwrap();
    let batch = rx.recv().await.expect("count-triggered flush");
    assert_eq!(batch.len(), 2);

    // Several sweeps pass over the now-empty group: zero deliveries.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(rx.try_recv().is_err());

    stack.shutdown().await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_shutdown_drains_every_group_then_rejects_pushes() {
    init_test_tracing();
    let stack = WindowedStack::new(config(10, None, NO_SWEEP));
    let (handler, mut rx) = recording_handler();

    stack.push(item(&handler, "hello", 1, 0)).await.unwrap();
    stack.push(item(&handler, "hello", 1, 1)).await.unwrap();
    stack.push(item(&handler, "world", 2, 2)).await.unwrap();

    stack.shutdown().await.unwrap();

    let mut per_group: HashMap<String, usize> = HashMap::new();
    for _ in 0..2 {
        let batch = rx.recv().await.expect("shutdown flush");
        per_group.insert(batch[0].group.clone(), batch.len());
    }
    assert_eq!(per_group["hello"], 2);
    assert_eq!(per_group["world"], 1);
    // Each group was flushed exactly once.
    assert!(rx.try_recv().is_err());

    let err = stack.push(item(&handler, "hello", 1, 3)).await.unwrap_err();
    assert_eq!(err, StackError::Closed);

    // A second shutdown observes the stopped loop instead of hanging.
    assert_eq!(stack.shutdown().await.unwrap_err(), StackError::Closed);
}

#[tokio::test]
async fn test_concurrent_pushes_lose_nothing_and_keep_totals_exact() {
    init_test_tracing();
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 25;
    const SIZE: u64 = 3;

    let stack = WindowedStack::new(config(1_000, None, NO_SWEEP));
    let (handler, mut rx) = recording_handler();

    let mut producers = Vec::new();
    for p in 0..PRODUCERS {
        let stack = stack.clone();
        let handler = handler.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                let seq = p * PER_PRODUCER + i;
                stack.push(item(&handler, "hot", SIZE, seq)).await.unwrap();
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    stack.shutdown().await.unwrap();

    let batch = rx.recv().await.expect("shutdown flush");
    assert_eq!(batch.len(), PRODUCERS * PER_PRODUCER);
    let total: u64 = batch.iter().map(|i| i.size).sum();
    assert_eq!(total, (PRODUCERS * PER_PRODUCER) as u64 * SIZE);

    // Multiset equality: every pushed sequence number exactly once.
    let mut seqs: Vec<usize> = batch.iter().map(|i| i.seq).collect();
    seqs.sort_unstable();
    assert_eq!(seqs, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_group_handler_is_fixed_by_first_item() {
    init_test_tracing();
    let stack = WindowedStack::new(config(3, None, NO_SWEEP));
    let (first, mut first_rx) = recording_handler();
    let (second, mut second_rx) = recording_handler();

    stack.push(item(&first, "g", 1, 0)).await.unwrap();
    stack.push(item(&second, "g", 1, 1)).await.unwrap();
    stack.push(item(&second, "g", 1, 2)).await.unwrap();

    // The whole batch lands on the handler captured at group creation.
    let batch = first_rx.recv().await.expect("flush to first handler");
    assert_eq!(batch.len(), 3);

    stack.shutdown().await.unwrap();
    assert!(second_rx.try_recv().is_err());
}
