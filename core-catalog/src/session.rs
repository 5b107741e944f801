//! # Connection Sessions
//!
//! One catalog server endpoint: its URL and credentials, the capabilities and
//! version negotiated on connect, and the root of its resource tree.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::connector::{CatalogContext, Connector, Credentials};
use crate::ids::{IdAllocator, LocalId};
use crate::kind::ResourceKind;
use crate::node::ResourceNode;
use crate::tree::ResourceTree;
use crate::types::ServerVersion;

/// Resource kinds a server can host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    kinds: BTreeSet<ResourceKind>,
    supports_any_unlisted: bool,
}

impl Capabilities {
    /// Every kind is considered supported
    pub fn open() -> Self {
        Self {
            kinds: BTreeSet::new(),
            supports_any_unlisted: true,
        }
    }

    /// Capabilities from probed kinds. An empty probe yields open capabilities.
    pub fn from_kinds(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        let kinds: BTreeSet<ResourceKind> = kinds
            .into_iter()
            .filter(|kind| *kind != ResourceKind::None)
            .collect();
        let supports_any_unlisted = kinds.is_empty();
        Self {
            kinds,
            supports_any_unlisted,
        }
    }

    pub fn supports(&self, kind: ResourceKind) -> bool {
        self.supports_any_unlisted || self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> &BTreeSet<ResourceKind> {
        &self.kinds
    }

    pub fn supports_any_unlisted(&self) -> bool {
        self.supports_any_unlisted
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::open()
    }
}

/// Give a user-entered server address a scheme and strip trailing slashes
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// One authenticated server endpoint and its catalog
#[derive(Debug)]
pub struct ConnectionSession {
    id: LocalId,
    name: String,
    connector: Connector,
    connected: bool,
    server_version: Option<ServerVersion>,
    capabilities: Capabilities,
    tree: ResourceTree,
    ids: Arc<IdAllocator>,
}

impl ConnectionSession {
    /// Disconnected session with an empty root
    pub fn new(
        context: &CatalogContext,
        name: impl Into<String>,
        url: &str,
        credentials: Credentials,
    ) -> Self {
        let name = name.into();
        let ids = Arc::clone(&context.ids);
        Self {
            id: ids.next_id(),
            connector: Connector::new(context, normalize_url(url), credentials),
            connected: false,
            server_version: None,
            capabilities: Capabilities::default(),
            tree: ResourceTree::new(Arc::clone(&ids), name.clone()),
            name,
            ids,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        context: &CatalogContext,
        id: LocalId,
        name: String,
        url: &str,
        credentials: Credentials,
        cookie: Option<String>,
        connected: bool,
        capabilities: Capabilities,
        tree: ResourceTree,
    ) -> Self {
        let mut connector = Connector::new(context, normalize_url(url), credentials);
        connector.set_cookie(cookie);
        Self {
            id,
            name,
            connector,
            connected,
            server_version: None,
            capabilities,
            tree,
            ids: Arc::clone(&context.ids),
        }
    }

    /// Probe the server and, unless `as_guest`, log in.
    ///
    /// Version and capability probe failures are not fatal. A failed login
    /// returns `false` and leaves the session disconnected; the probed
    /// version, capabilities and fresh root are kept.
    #[instrument(skip(self), fields(session = %self.name))]
    pub async fn connect(&mut self, as_guest: bool) -> bool {
        self.server_version = match self.connector.fetch_version().await {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(error = %e, "Server version unavailable");
                None
            }
        };

        self.capabilities = match self.connector.fetch_schema_kinds().await {
            Ok(kinds) => Capabilities::from_kinds(kinds),
            Err(e) => {
                warn!(error = %e, "Resource schema unavailable, assuming all kinds");
                Capabilities::open()
            }
        };

        self.tree = ResourceTree::new(Arc::clone(&self.ids), self.name.clone());
        self.connector.set_cookie(None);

        if !as_guest {
            match self.connector.login().await {
                Ok(cookie) => self.connector.set_cookie(Some(cookie)),
                Err(e) => {
                    warn!(error = %e, "Login failed");
                    self.connected = false;
                    return false;
                }
            }
        }

        self.connected = true;
        info!(
            guest = as_guest,
            version = ?self.server_version,
            "Connected to {}",
            self.connector.base_url()
        );
        true
    }

    /// Drop the cookie and the loaded catalog
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.connector.set_cookie(None);
        let root = self.tree.root_id();
        self.tree.invalidate(root);
        debug!(session = %self.name, "Disconnected");
    }

    pub fn is_type_supported(&self, kind: ResourceKind) -> bool {
        self.capabilities.supports(kind)
    }

    /// Cached server version, probing the server when it is still unknown
    pub async fn probe_server_version(&mut self) -> Option<ServerVersion> {
        if self.server_version.is_none() {
            match self.connector.fetch_version().await {
                Ok(version) => self.server_version = Some(version),
                Err(e) => debug!(session = %self.name, error = %e, "Version probe failed"),
            }
        }
        self.server_version
    }

    pub async fn load_children(&mut self, id: LocalId) -> bool {
        self.tree.load_children(&self.connector, id).await
    }

    pub async fn fetch_permissions(&mut self, id: LocalId) -> Option<&serde_json::Value> {
        self.tree.fetch_permissions(&self.connector, id).await
    }

    pub fn id(&self) -> LocalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        self.connector.base_url()
    }

    pub fn credentials(&self) -> &Credentials {
        self.connector.credentials()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn auth_cookie(&self) -> Option<&str> {
        self.connector.cookie()
    }

    pub fn server_version(&self) -> Option<ServerVersion> {
        self.server_version
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    #[cfg(test)]
    pub(crate) fn tree_mut(&mut self) -> &mut ResourceTree {
        &mut self.tree
    }

    pub fn root(&self) -> &ResourceNode {
        self.tree.root()
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }
}
