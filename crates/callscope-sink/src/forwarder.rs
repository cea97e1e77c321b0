//! Serial forwarder: a single-worker queue between callers and the sink.
//!
//! Emission to a remote collector must never run on the caller's path.
//! The forwarder accepts records from any task, queues them in arrival
//! order, and ships them from one dedicated worker so the sink sees at
//! most one in-flight `emit` at a time. Sink failures are logged and
//! counted, never propagated.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, Semaphore, TryAcquireError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sink::{FieldMap, RecordSink};

/// Default queue capacity when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What [`SerialForwarder::submit`] does when the queue is at capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until the worker frees a slot. No records are lost; a slow
    /// collector slows callers down instead.
    #[default]
    Block,
    /// Evict the oldest queued record to admit the new one. Callers never
    /// wait; sustained overload loses the oldest data first.
    DropOldest,
}

impl OverflowPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            OverflowPolicy::Block => "block",
            OverflowPolicy::DropOldest => "drop_oldest",
        }
    }
}

/// Tuning for the forwarder queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// Maximum number of queued records, not counting the one currently
    /// being emitted. Values below 1 are treated as 1.
    pub capacity: usize,
    /// Behavior when the queue is full.
    pub overflow: OverflowPolicy,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Counters tracking what the forwarder did with submitted records.
///
/// `submitted` counts records accepted into the queue. `dropped` counts
/// records discarded without reaching the sink, whether displaced by
/// overflow or rejected after shutdown. `failed` counts records the sink
/// refused. Every accepted record ends up in exactly one of `emitted`,
/// `dropped`, or `failed` once the forwarder has drained.
#[derive(Debug, Default)]
pub struct ForwarderStats {
    submitted: AtomicU64,
    emitted: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl ForwarderStats {
    fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted(),
            emitted: self.emitted(),
            dropped: self.dropped(),
            failed: self.failed(),
        }
    }

    /// Reset all counters to zero (useful in tests and for interval
    /// sampling).
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.emitted.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of the forwarder counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub emitted: u64,
    pub dropped: u64,
    pub failed: u64,
}

// ---------------------------------------------------------------------------
// Forwarder
// ---------------------------------------------------------------------------

struct Submission {
    tag: String,
    record: FieldMap,
    timestamp: Option<i64>,
}

struct QueueState {
    pending: VecDeque<Submission>,
    closed: bool,
}

struct Shared {
    queue: Mutex<QueueState>,
    /// One permit per free queue slot. Closed on shutdown so blocked
    /// submitters wake instead of waiting forever.
    space: Semaphore,
    /// Signals the worker that the queue may have work.
    items: Notify,
    overflow: OverflowPolicy,
    stats: ForwarderStats,
}

/// Single-worker emission queue in front of a [`RecordSink`].
///
/// Records are shipped strictly in arrival order. The queue is bounded;
/// what happens at capacity is decided by the configured
/// [`OverflowPolicy`]. `submit` never returns an error: overflow and sink
/// trouble surface only through [`ForwarderStats`] and warn-level logs.
///
/// Dropping the forwarder lets the worker drain what was already queued
/// and exit in the background; call [`shutdown`](SerialForwarder::shutdown)
/// to wait for the drain to finish.
pub struct SerialForwarder {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerialForwarder {
    /// Start a forwarder whose worker ships records to `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(sink: Arc<dyn RecordSink>, config: ForwarderConfig) -> Self {
        let capacity = config.capacity.clamp(1, Semaphore::MAX_PERMITS);
        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueState {
                pending: VecDeque::new(),
                closed: false,
            }),
            space: Semaphore::new(capacity),
            items: Notify::new(),
            overflow: config.overflow,
            stats: ForwarderStats::default(),
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), sink));
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue one record for emission under `tag`.
    ///
    /// Returns once the record is queued (or discarded, per policy).
    /// Under [`OverflowPolicy::Block`] this waits while the queue is
    /// full; under [`OverflowPolicy::DropOldest`] it always returns
    /// promptly. After shutdown the record is dropped and counted.
    pub async fn submit(&self, tag: &str, record: FieldMap, timestamp: Option<i64>) {
        let sub = Submission {
            tag: tag.to_string(),
            record,
            timestamp,
        };
        match self.shared.overflow {
            OverflowPolicy::Block => match self.shared.space.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    {
                        let mut q = self.shared.queue.lock().unwrap();
                        if q.closed {
                            drop(q);
                            self.drop_rejected(sub);
                            return;
                        }
                        q.pending.push_back(sub);
                    }
                    self.shared.stats.record_submitted();
                    self.shared.items.notify_one();
                }
                Err(_) => self.drop_rejected(sub),
            },
            OverflowPolicy::DropOldest => {
                let mut displaced = None;
                {
                    let mut q = self.shared.queue.lock().unwrap();
                    if q.closed {
                        drop(q);
                        self.drop_rejected(sub);
                        return;
                    }
                    // Permit bookkeeping happens under the queue lock, so
                    // "no permits" means the queue really is full.
                    match self.shared.space.try_acquire() {
                        Ok(permit) => {
                            permit.forget();
                            q.pending.push_back(sub);
                        }
                        Err(TryAcquireError::NoPermits) => {
                            displaced = q.pending.pop_front();
                            q.pending.push_back(sub);
                        }
                        Err(TryAcquireError::Closed) => {
                            drop(q);
                            self.drop_rejected(sub);
                            return;
                        }
                    }
                }
                if let Some(old) = displaced {
                    self.shared.stats.record_dropped();
                    warn!(tag = %old.tag, "forwarder queue full, oldest record dropped");
                }
                self.shared.stats.record_submitted();
                self.shared.items.notify_one();
            }
        }
    }

    /// Stop accepting records, wait for the queue to drain, and join the
    /// worker. Safe to call more than once.
    pub async fn shutdown(&self) {
        {
            let mut q = self.shared.queue.lock().unwrap();
            q.closed = true;
        }
        self.shared.space.close();
        self.shared.items.notify_one();

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "forwarder worker did not shut down cleanly");
            }
        }
    }

    /// Counters for what happened to submitted records.
    pub fn stats(&self) -> &ForwarderStats {
        &self.shared.stats
    }

    fn drop_rejected(&self, sub: Submission) {
        self.shared.stats.record_dropped();
        warn!(tag = %sub.tag, "forwarder is shut down, record dropped");
    }
}

impl Drop for SerialForwarder {
    fn drop(&mut self) {
        if let Ok(mut q) = self.shared.queue.lock() {
            q.closed = true;
        }
        self.shared.space.close();
        self.shared.items.notify_one();
    }
}

enum Next {
    Item(Submission),
    Idle,
    Done,
}

async fn run_worker(shared: Arc<Shared>, sink: Arc<dyn RecordSink>) {
    loop {
        let next = {
            let mut q = shared.queue.lock().unwrap();
            match q.pending.pop_front() {
                Some(sub) => {
                    shared.space.add_permits(1);
                    Next::Item(sub)
                }
                None if q.closed => Next::Done,
                None => Next::Idle,
            }
        };
        match next {
            Next::Item(sub) => {
                let Submission {
                    tag,
                    record,
                    timestamp,
                } = sub;
                match sink.emit(&tag, record, timestamp).await {
                    Ok(()) => shared.stats.record_emitted(),
                    Err(err) => {
                        shared.stats.record_failed();
                        warn!(tag = %tag, error = %err, "record emission failed");
                    }
                }
            }
            Next::Idle => shared.items.notified().await,
            Next::Done => break,
        }
    }
    debug!("forwarder worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_blocks_at_default_capacity() {
        let config = ForwarderConfig::default();
        assert_eq!(config.capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.overflow, OverflowPolicy::Block);
    }

    #[test]
    fn overflow_policy_names_match_wire_form() {
        assert_eq!(OverflowPolicy::Block.name(), "block");
        assert_eq!(OverflowPolicy::DropOldest.name(), "drop_oldest");
        assert_eq!(
            serde_json::to_value(OverflowPolicy::DropOldest).unwrap(),
            serde_json::json!("drop_oldest")
        );
    }

    #[test]
    fn stats_counters_accumulate_independently() {
        let stats = ForwarderStats::default();
        stats.record_submitted();
        stats.record_submitted();
        stats.record_emitted();
        stats.record_dropped();
        stats.record_failed();

        assert_eq!(stats.submitted(), 2);
        assert_eq!(stats.emitted(), 1);
        assert_eq!(stats.dropped(), 1);
        assert_eq!(stats.failed(), 1);

        let snap = stats.snapshot();
        assert_eq!(snap.submitted, 2);
        assert_eq!(snap.emitted, 1);
    }

    #[test]
    fn reset_zeroes_all_counters() {
        let stats = ForwarderStats::default();
        stats.record_submitted();
        stats.record_emitted();
        stats.record_failed();
        stats.reset();

        assert_eq!(stats.submitted(), 0);
        assert_eq!(stats.emitted(), 0);
        assert_eq!(stats.dropped(), 0);
        assert_eq!(stats.failed(), 0);
    }
}
