//! Contract between the engine and the host's layer registry.

use async_trait::async_trait;
use core_catalog::ServerVersion;
use std::sync::Arc;

use crate::outcome::SyncOutcome;

/// How the engine treats a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRole {
    /// Container whose children are walked depth-first
    Group,
    /// Bound to the connection named `account`
    Remote { account: String },
    /// Has local state to maintain but no server
    Local,
    /// Nothing to sync
    Inert,
}

/// A layer of the host's layer hierarchy.
///
/// Implementations record what happened in the shared [`SyncOutcome`];
/// failures are counters, never errors returned to the engine.
#[async_trait]
pub trait SyncLayer: Send + Sync {
    fn name(&self) -> &str;

    fn role(&self) -> LayerRole;

    /// Children in enumeration order. Only consulted for groups.
    fn children(&self) -> &[Arc<dyn SyncLayer>] {
        &[]
    }

    /// Reconcile a remote-bound layer with its server
    async fn sync(
        &self,
        _authority: &str,
        _version: Option<ServerVersion>,
        _outcome: &mut SyncOutcome,
    ) {
    }

    /// Maintain a local-only layer
    async fn sync_local(&self) {}
}
