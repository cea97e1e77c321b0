//! In-memory fake sinks for testing.
//!
//! These let forwarder and logger tests observe exactly what reached the
//! sink without standing up a real collector. Not intended for
//! production use.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use crate::error::{SinkError, SinkResult};
use crate::sink::{FieldMap, RecordSink};

/// One record as it arrived at a fake sink.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedRecord {
    pub tag: String,
    pub record: FieldMap,
    pub timestamp: Option<i64>,
}

/// Sink that stores every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    emitted: Mutex<Vec<EmittedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far, in emission order.
    pub fn emitted(&self) -> Vec<EmittedRecord> {
        self.emitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&self, tag: &str, record: FieldMap, timestamp: Option<i64>) -> SinkResult<()> {
        self.emitted.lock().unwrap().push(EmittedRecord {
            tag: tag.to_string(),
            record,
            timestamp,
        });
        Ok(())
    }
}

/// Sink that fails every emission.
#[derive(Debug, Default)]
pub struct FailingSink;

impl FailingSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RecordSink for FailingSink {
    async fn emit(&self, tag: &str, _record: FieldMap, _timestamp: Option<i64>) -> SinkResult<()> {
        Err(SinkError::Delivery(format!(
            "fake delivery failure for tag {tag}"
        )))
    }
}

/// Sink whose emissions pause until released.
///
/// For tests that need the worker held mid-emission while the queue
/// fills behind it. [`new`](GatedSink::new) returns the sink plus a
/// receiver yielding the tag of each emission as it starts; call
/// [`release`](GatedSink::release) to let paused emissions finish.
#[derive(Debug)]
pub struct GatedSink {
    emitted: Mutex<Vec<EmittedRecord>>,
    started: mpsc::UnboundedSender<String>,
    gate: Semaphore,
}

impl GatedSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            emitted: Mutex::new(Vec::new()),
            started: tx,
            gate: Semaphore::new(0),
        });
        (sink, rx)
    }

    /// Allow `n` paused or future emissions to complete.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Everything fully emitted so far, in emission order.
    pub fn emitted(&self) -> Vec<EmittedRecord> {
        self.emitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for GatedSink {
    async fn emit(&self, tag: &str, record: FieldMap, timestamp: Option<i64>) -> SinkResult<()> {
        let _ = self.started.send(tag.to_string());
        let permit = self.gate.acquire().await.map_err(|_| SinkError::Closed)?;
        permit.forget();
        self.emitted.lock().unwrap().push(EmittedRecord {
            tag: tag.to_string(),
            record,
            timestamp,
        });
        Ok(())
    }
}
