//! Call identifier parsing.
//!
//! Call identifiers follow the `"[client#]method(...)"` convention: an
//! optional client name, a `#` separator, the method name, and the argument
//! list in parentheses. Only the prefix before the first `(` carries
//! meaning here; arguments are discarded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use callscope_sink::FieldMap;

use crate::error::{ScopeError, ScopeResult};
use crate::phase::PhasePayload;

/// The identifier prefix before the first `(`.
///
/// `"svc#call(a, b)"` → `"svc#call"`. Fails when the identifier contains
/// no `(`, which is a contract violation by the caller.
pub fn identifier_prefix(identifier: &str) -> ScopeResult<&str> {
    identifier
        .split_once('(')
        .map(|(prefix, _)| prefix)
        .ok_or_else(|| ScopeError::MalformedIdentifier {
            identifier: identifier.to_string(),
        })
}

/// `{client, method}` metadata derived from a call identifier.
///
/// Attached to every consolidated record under the `meta` key so the
/// collector can slice records by client and method without parsing
/// identifiers itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMeta {
    /// Client name, when the identifier carries a `client#` prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,

    /// Method name.
    pub method: String,
}

impl CallMeta {
    /// Parse an identifier of the form `"[client#]method(...)"`.
    pub fn parse(identifier: &str) -> ScopeResult<Self> {
        let prefix = identifier_prefix(identifier)?;
        Ok(match prefix.split_once('#') {
            Some((client, method)) => Self {
                client: Some(client.to_string()),
                method: method.to_string(),
            },
            None => Self {
                client: None,
                method: prefix.to_string(),
            },
        })
    }

    /// Render as a phase payload: `{"client": ..., "method": ...}`, with
    /// `client` omitted entirely when absent.
    pub fn payload(&self) -> PhasePayload {
        let mut map = FieldMap::new();
        if let Some(client) = &self.client {
            map.insert("client".to_string(), Value::String(client.clone()));
        }
        map.insert("method".to_string(), Value::String(self.method.clone()));
        Value::Object(map)
    }
}
