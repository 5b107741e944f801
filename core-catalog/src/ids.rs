//! Process-local identifiers.
//!
//! Sessions and resource nodes draw from one id space so a lookup by id is
//! unambiguous across a whole [`ConnectionRegistry`](crate::ConnectionRegistry).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a session or node, unique within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(u64);

impl LocalId {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Rebuild an id from its persisted value
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id source shared by a registry and all of its trees.
///
/// Safe to share across tasks that build trees concurrently.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next unused id
    pub fn next_id(&self) -> LocalId {
        LocalId(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Record an id restored from storage so it is never handed out again
    pub fn observe(&self, id: LocalId) {
        self.next.fetch_max(id.0.saturating_add(1), Ordering::SeqCst);
    }

    /// The id the next call to `next_id` will return
    pub fn peek(&self) -> LocalId {
        LocalId(self.next.load(Ordering::SeqCst))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
