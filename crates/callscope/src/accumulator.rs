//! Per-call phase accumulation and the stale-context guard.
//!
//! A [`CallAccumulator`] holds the phases of exactly one in-flight call,
//! keyed by phase name. It exists only between the first phase-event of a
//! call and its emission: the owning store creates it lazily and drops it
//! once [`consolidate`](CallAccumulator::consolidate) has drained it.
//!
//! Incoming events are merged under three rules, checked in order:
//!
//! 1. `retry` never replaces the stored payload — each occurrence appends
//!    a timestamp to a numbered retry log.
//! 2. `request` arriving while phases are already present means the
//!    previous call on this context never completed. The leftovers are
//!    quarantined under `dirty_context` instead of silently merging two
//!    unrelated calls into one record.
//! 3. Anything else is stored under its phase name, overwriting a prior
//!    payload of the same kind.

use chrono::Utc;
use serde_json::Value;

use callscope_sink::FieldMap;

use crate::meta::CallMeta;
use crate::phase::{Phase, PhasePayload};

/// Accumulates the phase payloads of one logical call.
#[derive(Debug, Default)]
pub struct CallAccumulator {
    phases: FieldMap,
}

impl CallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no phase has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Number of distinct phases recorded so far.
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Whether a payload is stored for `phase`.
    pub fn contains(&self, phase: Phase) -> bool {
        self.phases.contains_key(phase.name())
    }

    /// The stored payload for `phase`, if any.
    pub fn payload(&self, phase: Phase) -> Option<&Value> {
        self.phases.get(phase.name())
    }

    /// Merge one phase-event into the call.
    ///
    /// For [`Phase::Retry`] the caller-supplied payload is ignored; the
    /// retry log entry is synthesized here. Returns `true` when the event
    /// displaced stale phases into a `dirty_context` snapshot.
    pub fn absorb(&mut self, phase: Phase, payload: PhasePayload) -> bool {
        if phase == Phase::Retry {
            self.append_retry();
            return false;
        }

        let mut quarantined = false;
        if phase == Phase::Request && !self.phases.is_empty() {
            self.quarantine();
            quarantined = true;
        }

        self.phases.insert(phase.name().to_string(), payload);
        quarantined
    }

    /// Attach derived metadata and drain the record for emission.
    ///
    /// Leaves the accumulator empty; the owning store removes it right
    /// after.
    pub fn consolidate(&mut self, meta: &CallMeta) -> FieldMap {
        self.phases
            .insert(Phase::Meta.name().to_string(), meta.payload());
        std::mem::take(&mut self.phases)
    }

    /// Append one entry to the retry log: next integer index, current
    /// timestamp. The log only ever grows while the call accumulates.
    fn append_retry(&mut self) {
        let slot = self
            .phases
            .entry(Phase::Retry.name())
            .or_insert_with(|| Value::Object(FieldMap::new()));
        if let Some(log) = slot.as_object_mut() {
            let index = log.len().to_string();
            log.insert(index, Value::String(Utc::now().to_rfc3339()));
        }
    }

    /// Move everything recorded so far under `dirty_context`.
    ///
    /// The snapshot rides along on the next emission, so data from the
    /// abandoned call is surfaced rather than dropped.
    fn quarantine(&mut self) {
        let snapshot = std::mem::take(&mut self.phases);
        self.phases.insert(
            Phase::DirtyContext.name().to_string(),
            Value::Object(snapshot),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn retries_accumulate_under_integer_keys() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Retry, Value::Null);
        acc.absorb(Phase::Retry, Value::Null);
        acc.absorb(Phase::Retry, Value::Null);

        let log = acc.payload(Phase::Retry).unwrap().as_object().unwrap();
        assert_eq!(log.len(), 3);
        for key in ["0", "1", "2"] {
            let stamp = log[key].as_str().unwrap();
            assert!(
                chrono::DateTime::parse_from_rfc3339(stamp).is_ok(),
                "retry[{key}] should hold an RFC 3339 timestamp, got {stamp}"
            );
        }
    }

    #[test]
    fn retry_ignores_caller_payload() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Retry, json!({"caller": "data"}));

        let log = acc.payload(Phase::Retry).unwrap().as_object().unwrap();
        assert!(log.contains_key("0"));
        assert!(!log.contains_key("caller"));
    }

    #[test]
    fn request_on_fresh_accumulator_stores_normally() {
        let mut acc = CallAccumulator::new();
        let quarantined = acc.absorb(Phase::Request, json!({"url": "http://a"}));

        assert!(!quarantined);
        assert_eq!(acc.phase_count(), 1);
        assert_eq!(acc.payload(Phase::Request).unwrap(), &json!({"url": "http://a"}));
    }

    #[test]
    fn request_over_stale_phases_quarantines_them() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Retry, Value::Null);
        acc.absorb(Phase::Retry, Value::Null);

        let quarantined = acc.absorb(Phase::Request, json!({"url": "http://b"}));
        assert!(quarantined);

        // The new call sees only its own request plus the snapshot.
        assert_eq!(acc.phase_count(), 2);
        let dirty = acc.payload(Phase::DirtyContext).unwrap().as_object().unwrap();
        let old_retries = dirty["retry"].as_object().unwrap();
        assert_eq!(old_retries.len(), 2);
        assert!(!acc.contains(Phase::Retry));
    }

    #[test]
    fn retry_log_restarts_after_quarantine() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Retry, Value::Null);
        acc.absorb(Phase::Retry, Value::Null);
        acc.absorb(Phase::Request, json!({}));
        acc.absorb(Phase::Retry, Value::Null);

        let log = acc.payload(Phase::Retry).unwrap().as_object().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log.contains_key("0"));
    }

    #[test]
    fn duplicate_phase_overwrites_instead_of_duplicating() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Response, json!({"status": 500}));
        acc.absorb(Phase::Response, json!({"status": 200}));

        assert_eq!(acc.phase_count(), 1);
        assert_eq!(acc.payload(Phase::Response).unwrap(), &json!({"status": 200}));
    }

    #[test]
    fn consolidate_attaches_meta_and_drains() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Request, json!({"method": "GET"}));
        acc.absorb(Phase::Response, json!({"status": 200}));

        let meta = CallMeta::parse("svc#call()").unwrap();
        let record = acc.consolidate(&meta);

        assert!(acc.is_empty());
        assert_eq!(record.len(), 3);
        assert_eq!(record["meta"], json!({"client": "svc", "method": "call"}));
        assert_eq!(record["request"], json!({"method": "GET"}));
        assert_eq!(record["response"], json!({"status": 200}));
    }

    #[test]
    fn quarantine_snapshot_keeps_every_stale_phase() {
        let mut acc = CallAccumulator::new();
        acc.absorb(Phase::Request, json!({"url": "http://first"}));
        acc.absorb(Phase::Retry, Value::Null);

        acc.absorb(Phase::Request, json!({"url": "http://second"}));

        let dirty = acc.payload(Phase::DirtyContext).unwrap().as_object().unwrap();
        assert_eq!(dirty.len(), 2);
        assert_eq!(dirty["request"], json!({"url": "http://first"}));
        assert!(dirty["retry"].as_object().unwrap().contains_key("0"));
        assert_eq!(
            acc.payload(Phase::Request).unwrap(),
            &json!({"url": "http://second"})
        );
    }
}
