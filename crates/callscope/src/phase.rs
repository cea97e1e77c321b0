//! Phase classification for call lifecycle events.
//!
//! Every event fed into the aggregator is one of the six [`Phase`] kinds.
//! The classification is closed: collaborators pick a variant, they do not
//! extend the set. Terminality is the only attribute — a terminal phase
//! completes the call and triggers emission of the consolidated record.

use serde::{Deserialize, Serialize};

/// Payload captured for one phase of a call.
///
/// An order-irrelevant mapping from field name to value, produced by the
/// phase formatter (or by the caller directly via the generic log entry
/// point). Opaque to the aggregator except for [`Phase::Retry`], whose
/// payload the aggregator synthesizes itself.
pub type PhasePayload = serde_json::Value;

/// One stage in the lifecycle of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The request was sent.
    Request,

    /// A response arrived. Terminal.
    Response,

    /// The call was retried. Coalesced into a numbered retry log rather
    /// than stored as a single payload.
    Retry,

    /// The call failed with an error. Terminal.
    Exception,

    /// Derived `{client, method}` metadata, written by the aggregator at
    /// emission time.
    Meta,

    /// Quarantined leftovers of a prior call that never completed.
    DirtyContext,
}

impl Phase {
    /// All phase kinds, in declaration order.
    pub const ALL: [Phase; 6] = [
        Phase::Request,
        Phase::Response,
        Phase::Retry,
        Phase::Exception,
        Phase::Meta,
        Phase::DirtyContext,
    ];

    /// Whether this phase completes a call and triggers emission.
    ///
    /// Every call path ends in either a response or an exception; all
    /// other phases are intermediate and never flush on their own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Response | Phase::Exception)
    }

    /// The record key this phase is stored under.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Request => "request",
            Phase::Response => "response",
            Phase::Retry => "retry",
            Phase::Exception => "exception",
            Phase::Meta => "meta",
            Phase::DirtyContext => "dirty_context",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
