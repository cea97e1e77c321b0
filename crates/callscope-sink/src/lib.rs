//! callscope-sink: record delivery layer for callscope.
//!
//! Separates *what* a consolidated call record contains from *how* it
//! reaches a collector:
//!
//! - [`RecordSink`] is the integration point: implement it over your
//!   collector client (a fluentd forward port, an HTTP ingest endpoint,
//!   a file appender).
//! - [`SerialForwarder`] puts a bounded FIFO queue and a single worker
//!   task in front of the sink, so emission never runs on the caller's
//!   path and the sink never sees concurrent emits.
//! - [`fakes`] holds in-memory sinks for tests.

pub mod error;
pub mod fakes;
pub mod forwarder;
pub mod sink;

pub use error::{SinkError, SinkResult};
pub use forwarder::{
    ForwarderConfig, ForwarderStats, OverflowPolicy, SerialForwarder, StatsSnapshot,
    DEFAULT_QUEUE_CAPACITY,
};
pub use sink::{FieldMap, RecordSink};
