//! Callscope: call-scoped structured logging for outbound RPC calls.
//!
//! An outbound call produces several loosely-coupled events over its
//! lifetime — request sent, zero or more retries, then a response or an
//! error. Shipped individually those make for noisy, hard-to-correlate
//! collector records. Callscope accumulates the phases of each logical
//! call and emits one consolidated record when the call completes.
//!
//! ## Key components
//!
//! - [`Phase`]: closed classification of lifecycle events; `response` and
//!   `exception` are terminal and trigger emission.
//! - [`ContextStore`] / [`ContextId`]: explicit per-call scoping. The
//!   caller passes a handle with every event; no thread-local state.
//! - [`CallAccumulator`]: merges phases per call, coalesces retries into
//!   a numbered log, and quarantines leftovers of abandoned calls under
//!   `dirty_context` instead of corrupting the next call's record.
//! - [`CallMeta`]: `{client, method}` derived from the call identifier.
//! - [`CallLogger`] / [`PhaseLogger`]: consolidated and immediate
//!   emission modes, both feeding the serial forwarder from
//!   `callscope-sink` so the caller never blocks on collector I/O.
//!
//! ## Wiring
//!
//! ```ignore
//! let sink: Arc<dyn RecordSink> = Arc::new(MyCollectorSink::connect(...)?);
//! let config = ScopeConfig::default();
//! let forwarder = Arc::new(SerialForwarder::spawn(sink, config.forwarder.clone()));
//! let logger = CallLogger::new(Arc::new(ContextStore::new()), forwarder, config);
//!
//! let cx = ContextId::unique();
//! logger.log_request(&cx, "svc#fetch(id)", &request_info).await?;
//! logger.log_response(&cx, "svc#fetch(id)", &response_info, elapsed_ms).await?;
//! ```

pub mod accumulator;
pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod logger;
pub mod meta;
pub mod phase;
pub mod telemetry;

pub use accumulator::CallAccumulator;
pub use config::{ScopeConfig, DEFAULT_TAG};
pub use context::{ContextId, ContextStore};
pub use error::{ScopeError, ScopeResult};
pub use format::{ExceptionInfo, HeaderMap, PhaseFormatter, RequestInfo, ResponseInfo, Verbosity};
pub use logger::{CallLogger, PhaseLogger};
pub use meta::{identifier_prefix, CallMeta};
pub use phase::{Phase, PhasePayload};
pub use telemetry::init_tracing;

pub use callscope_sink::{
    FieldMap, ForwarderConfig, ForwarderStats, OverflowPolicy, RecordSink, SerialForwarder,
    SinkError, SinkResult,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
