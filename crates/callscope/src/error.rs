//! Error taxonomy for the callscope core.
//!
//! Only one condition surfaces synchronously to callers: a call identifier
//! that violates the `"[client#]method(...)"` contract. Everything else is
//! handled structurally (stale contexts become `dirty_context` records) or
//! swallowed at the forwarder boundary (sink failures are logged and
//! counted, never propagated).

use thiserror::Error;

/// Errors produced by callscope loggers.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The call identifier has no `(` and cannot be split into a method
    /// prefix. This is a precondition violation by the caller, not a
    /// runtime condition the aggregator recovers from.
    #[error("malformed call identifier (expected \"[client#]method(...)\"): {identifier}")]
    MalformedIdentifier { identifier: String },
}

/// Result type for callscope operations.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_identifier_names_the_offender() {
        let err = ScopeError::MalformedIdentifier {
            identifier: "noparens".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("malformed call identifier"));
        assert!(msg.contains("noparens"));
    }
}
