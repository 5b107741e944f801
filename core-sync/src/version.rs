//! Server version lookup for remote-bound layers.

use async_trait::async_trait;
use core_catalog::{ConnectionRegistry, ServerVersion};
use tokio::sync::{Mutex, RwLock};

/// Resolves the server version of a named connection
#[async_trait]
pub trait VersionLookup: Send + Sync {
    /// `None` when the account is unknown or its version cannot be determined
    async fn server_version(&self, account: &str) -> Option<ServerVersion>;
}

/// Versions already negotiated by connected sessions; never touches the network
#[async_trait]
impl VersionLookup for ConnectionRegistry {
    async fn server_version(&self, account: &str) -> Option<ServerVersion> {
        self.session_by_name(account)?.server_version()
    }
}

/// Probes the server when the session has no version yet
#[async_trait]
impl VersionLookup for RwLock<ConnectionRegistry> {
    async fn server_version(&self, account: &str) -> Option<ServerVersion> {
        self.write().await.server_version_for(account).await
    }
}

#[async_trait]
impl VersionLookup for Mutex<ConnectionRegistry> {
    async fn server_version(&self, account: &str) -> Option<ServerVersion> {
        self.lock().await.server_version_for(account).await
    }
}
