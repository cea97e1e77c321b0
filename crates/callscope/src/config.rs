//! Runtime configuration for callscope loggers.

use serde::{Deserialize, Serialize};

use callscope_sink::ForwarderConfig;

use crate::format::Verbosity;

/// Tag consolidated records ship under when none is configured.
pub const DEFAULT_TAG: &str = "rpc";

/// Configuration shared by the consolidating logger and its forwarder.
///
/// The surface is deliberately small: the record tag, the formatter
/// verbosity, and the forwarder queue tuning. Everything else (collector
/// endpoints, credentials, retry policy) belongs to the sink
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Tag under which consolidated records reach the collector.
    pub tag: String,

    /// Field detail captured by the bundled phase formatter.
    pub verbosity: Verbosity,

    /// Queue capacity and overflow policy for the serial forwarder.
    pub forwarder: ForwarderConfig,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_TAG.to_string(),
            verbosity: Verbosity::default(),
            forwarder: ForwarderConfig::default(),
        }
    }
}
