//! The sink abstraction between call records and a concrete log collector.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SinkResult;

/// Flat field map shipped to the collector as one record.
///
/// Keys are the phase names of a call (`request`, `response`, `retry`,
/// `exception`, ...) plus derived entries such as `meta`; values are the
/// structured payloads captured for each phase.
pub type FieldMap = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Record sink
// ---------------------------------------------------------------------------

/// Destination for consolidated call records.
///
/// Implementations wrap a concrete collector client: a fluentd forward
/// port, an HTTP ingest endpoint, a file appender. The serial forwarder
/// invokes [`emit`](RecordSink::emit) from a single worker task, one
/// record at a time, so implementations never see concurrent calls from
/// the same forwarder.
///
/// Guarantees expected from implementations:
/// - `emit` ships exactly the fields it is given; it must not merge,
///   reorder, or dedupe records across calls.
/// - A failed `emit` leaves the sink usable for the next record.
/// - When `timestamp` is `Some`, the collector-side event time is the
///   given epoch milliseconds rather than the arrival time.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Ship one record under `tag`.
    async fn emit(&self, tag: &str, record: FieldMap, timestamp: Option<i64>) -> SinkResult<()>;
}
