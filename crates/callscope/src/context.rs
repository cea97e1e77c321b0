//! Explicit call-context handles and the accumulator store.
//!
//! A [`ContextId`] names one logical in-flight call. The caller owns the
//! handle and passes it with every phase-event — there is no ambient
//! thread-local state, so the same code works under OS threads, a task
//! pool, or cooperative scheduling.
//!
//! The [`ContextStore`] keeps zero-or-one [`CallAccumulator`] per handle.
//! The global map lock is held only for the slot lookup; mutation happens
//! under the slot's own lock, so contexts never contend with each other on
//! the hot path. A handle maps 1:1 to a sequential caller, which is what
//! rules out concurrent mutation of a single accumulator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::accumulator::CallAccumulator;

/// Opaque handle identifying one logical call scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(String);

impl ContextId {
    /// Wrap a caller-chosen identifier (a task id, a request id, a
    /// connection number — anything stable for the call's duration).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random handle.
    pub fn unique() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContextId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContextId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-or-one in-progress accumulation per context handle.
///
/// Slots are created lazily on first use and removed on emission or
/// explicit discard, so contexts that complete never leak. A context that
/// is abandoned mid-call keeps its slot until the handle is reused (the
/// dirty-context guard then quarantines the leftovers) or until the owner
/// calls [`clear`](ContextStore::clear).
#[derive(Debug, Default)]
pub struct ContextStore {
    slots: Mutex<HashMap<ContextId, Arc<Mutex<CallAccumulator>>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the context's accumulator, creating the slot if
    /// this is the first event for the handle.
    pub fn with_slot<T>(&self, cx: &ContextId, f: impl FnOnce(&mut CallAccumulator) -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(cx.clone()).or_default())
        };
        let mut acc = slot.lock().unwrap();
        f(&mut acc)
    }

    /// Drop the context's slot, discarding any accumulated phases.
    ///
    /// Returns `true` when a slot existed. Safe to call for unknown
    /// handles.
    pub fn clear(&self, cx: &ContextId) -> bool {
        self.slots.lock().unwrap().remove(cx).is_some()
    }

    /// Number of contexts currently holding an accumulator.
    pub fn active(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}
