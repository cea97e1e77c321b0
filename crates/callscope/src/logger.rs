//! Logger front-ends over the forwarder.
//!
//! Two emission shapes are provided, both non-blocking for the caller:
//!
//! - [`CallLogger`] consolidates every phase of a call into one record,
//!   emitted when the call reaches a terminal phase. Records carry a
//!   configured tag, derived `meta`, an explicit emission timestamp, and
//!   any quarantined `dirty_context` from an abandoned predecessor.
//! - [`PhaseLogger`] ships each phase as its own record immediately,
//!   tagged with the identifier prefix instead of a configured tag. No
//!   aggregation, no context handles, no timestamps.
//!
//! Both funnel into the same [`SerialForwarder`], so a process can mix
//! modes without interleaving writes to the sink.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use callscope_sink::{FieldMap, SerialForwarder};

use crate::config::ScopeConfig;
use crate::context::{ContextId, ContextStore};
use crate::error::ScopeResult;
use crate::format::{ExceptionInfo, PhaseFormatter, RequestInfo, ResponseInfo, Verbosity};
use crate::meta::{identifier_prefix, CallMeta};
use crate::phase::{Phase, PhasePayload};

// ---------------------------------------------------------------------------
// CallLogger — consolidated per-call records
// ---------------------------------------------------------------------------

/// Aggregates phase-events per call context and emits one consolidated
/// record per completed call.
///
/// The caller supplies a [`ContextId`] with every event; phases for the
/// same handle accumulate until a terminal phase (`response` or
/// `exception`) arrives, at which point the record — every stored phase
/// plus derived `meta` — is queued on the forwarder and the context is
/// released. Identifier parsing happens before anything is mutated, so a
/// malformed identifier on a terminal event leaves the accumulation
/// intact and retryable.
pub struct CallLogger {
    contexts: Arc<ContextStore>,
    forwarder: Arc<SerialForwarder>,
    formatter: PhaseFormatter,
    tag: String,
}

impl CallLogger {
    pub fn new(
        contexts: Arc<ContextStore>,
        forwarder: Arc<SerialForwarder>,
        config: ScopeConfig,
    ) -> Self {
        Self {
            contexts,
            forwarder,
            formatter: PhaseFormatter::new(config.verbosity),
            tag: config.tag,
        }
    }

    /// Feed one phase-event into the call's accumulation.
    ///
    /// Non-terminal phases return once merged. Terminal phases derive
    /// `meta` from `identifier`, queue the consolidated record stamped
    /// with the current time, and release the context.
    #[instrument(skip(self, cx, payload), fields(context = %cx, phase = phase.name()))]
    pub async fn log_phase(
        &self,
        cx: &ContextId,
        identifier: &str,
        phase: Phase,
        payload: PhasePayload,
    ) -> ScopeResult<()> {
        if !phase.is_terminal() {
            let quarantined = self.contexts.with_slot(cx, |acc| acc.absorb(phase, payload));
            if quarantined {
                warn!("prior call never completed; stale phases quarantined as dirty_context");
            }
            return Ok(());
        }

        let meta = CallMeta::parse(identifier)?;
        let record = self.contexts.with_slot(cx, |acc| {
            acc.absorb(phase, payload);
            acc.consolidate(&meta)
        });
        self.contexts.clear(cx);

        debug!(phases = record.len(), "call consolidated, record queued");
        self.forwarder
            .submit(&self.tag, record, Some(Utc::now().timestamp_millis()))
            .await;
        Ok(())
    }

    /// Record the request phase, formatted at the configured verbosity.
    pub async fn log_request(
        &self,
        cx: &ContextId,
        identifier: &str,
        request: &RequestInfo,
    ) -> ScopeResult<()> {
        let payload = self.formatter.request(request);
        self.log_phase(cx, identifier, Phase::Request, payload).await
    }

    /// Record one retry. The retry log entry (index and timestamp) is
    /// synthesized by the accumulator.
    pub async fn log_retry(&self, cx: &ContextId, identifier: &str) -> ScopeResult<()> {
        self.log_phase(cx, identifier, Phase::Retry, Value::Null)
            .await
    }

    /// Record the response phase and emit the consolidated call record.
    pub async fn log_response(
        &self,
        cx: &ContextId,
        identifier: &str,
        response: &ResponseInfo,
        elapsed_ms: u64,
    ) -> ScopeResult<()> {
        let payload = self.formatter.response(response, elapsed_ms);
        self.log_phase(cx, identifier, Phase::Response, payload)
            .await
    }

    /// Record the exception phase and emit the consolidated call record.
    pub async fn log_exception(
        &self,
        cx: &ContextId,
        identifier: &str,
        exception: &ExceptionInfo,
        elapsed_ms: u64,
    ) -> ScopeResult<()> {
        let payload = self.formatter.exception(exception, elapsed_ms);
        self.log_phase(cx, identifier, Phase::Exception, payload)
            .await
    }

    /// Drop a context's accumulation without emitting anything.
    ///
    /// For callers that know a call was abandoned and do not want its
    /// phases to surface as `dirty_context` on the handle's next use.
    pub fn discard(&self, cx: &ContextId) -> bool {
        let discarded = self.contexts.clear(cx);
        if discarded {
            debug!(context = %cx, "call context discarded");
        }
        discarded
    }

    /// Number of contexts currently accumulating.
    pub fn active_contexts(&self) -> usize {
        self.contexts.active()
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn verbosity(&self) -> Verbosity {
        self.formatter.verbosity()
    }
}

// ---------------------------------------------------------------------------
// PhaseLogger — immediate per-phase records
// ---------------------------------------------------------------------------

/// Ships each phase as its own record the moment it happens.
///
/// The record tag is the identifier prefix before `(` — `"svc#call(...)"`
/// emits under `"svc#call"` — and the record body is a single-key map of
/// phase name to payload. Retries carry `{"key": identifier}` rather than
/// a synthesized timestamp log, and no explicit timestamp is attached;
/// the collector stamps arrival time.
pub struct PhaseLogger {
    forwarder: Arc<SerialForwarder>,
    formatter: PhaseFormatter,
}

impl PhaseLogger {
    pub fn new(forwarder: Arc<SerialForwarder>, verbosity: Verbosity) -> Self {
        Self {
            forwarder,
            formatter: PhaseFormatter::new(verbosity),
        }
    }

    /// Queue one phase as a standalone record tagged with the identifier
    /// prefix.
    pub async fn log_phase(
        &self,
        identifier: &str,
        phase: Phase,
        payload: PhasePayload,
    ) -> ScopeResult<()> {
        let tag = identifier_prefix(identifier)?;
        let mut record = FieldMap::new();
        record.insert(phase.name().to_string(), payload);
        self.forwarder.submit(tag, record, None).await;
        Ok(())
    }

    pub async fn log_request(&self, identifier: &str, request: &RequestInfo) -> ScopeResult<()> {
        let payload = self.formatter.request(request);
        self.log_phase(identifier, Phase::Request, payload).await
    }

    /// Retries in immediate mode identify the call being retried instead
    /// of counting attempts.
    pub async fn log_retry(&self, identifier: &str) -> ScopeResult<()> {
        let mut payload = FieldMap::new();
        payload.insert("key".to_string(), Value::String(identifier.to_string()));
        self.log_phase(identifier, Phase::Retry, Value::Object(payload))
            .await
    }

    pub async fn log_response(
        &self,
        identifier: &str,
        response: &ResponseInfo,
        elapsed_ms: u64,
    ) -> ScopeResult<()> {
        let payload = self.formatter.response(response, elapsed_ms);
        self.log_phase(identifier, Phase::Response, payload).await
    }

    pub async fn log_exception(
        &self,
        identifier: &str,
        exception: &ExceptionInfo,
        elapsed_ms: u64,
    ) -> ScopeResult<()> {
        let payload = self.formatter.exception(exception, elapsed_ms);
        self.log_phase(identifier, Phase::Exception, payload).await
    }

    pub fn verbosity(&self) -> Verbosity {
        self.formatter.verbosity()
    }
}
