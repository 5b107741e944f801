//! Connection registry
//!
//! Owns every configured [`ConnectionSession`]. Sessions and the nodes of
//! their trees share one id space, so [`ConnectionRegistry::find`] resolves
//! any id handed out by the registry.

use tracing::{debug, info};

use crate::connector::{CatalogContext, Credentials};
use crate::error::{CatalogError, Result};
use crate::ids::LocalId;
use crate::node::ResourceNode;
use crate::persistence;
use crate::session::ConnectionSession;
use crate::types::ServerVersion;

/// Result of an id lookup across the registry
#[derive(Debug, Clone, Copy)]
pub enum CatalogEntry<'a> {
    Session(&'a ConnectionSession),
    Resource {
        session: &'a ConnectionSession,
        node: &'a ResourceNode,
    },
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    context: CatalogContext,
    sessions: Vec<ConnectionSession>,
}

impl ConnectionRegistry {
    pub fn new(context: CatalogContext) -> Self {
        Self {
            context,
            sessions: Vec::new(),
        }
    }

    pub(crate) fn from_sessions(context: CatalogContext, sessions: Vec<ConnectionSession>) -> Self {
        Self { context, sessions }
    }

    pub fn context(&self) -> &CatalogContext {
        &self.context
    }

    /// Register a new disconnected session. Names are unique.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        url: &str,
        credentials: Credentials,
    ) -> Result<LocalId> {
        let name = name.into();
        if self.session_by_name(&name).is_some() {
            return Err(CatalogError::DuplicateSession(name));
        }

        let session = ConnectionSession::new(&self.context, name, url, credentials);
        let id = session.id();
        info!(session = %session.name(), url = %session.url(), "Connection added");
        self.sessions.push(session);
        Ok(id)
    }

    pub fn remove(&mut self, id: LocalId) -> Option<ConnectionSession> {
        let index = self.sessions.iter().position(|s| s.id() == id)?;
        let session = self.sessions.remove(index);
        debug!(session = %session.name(), "Connection removed");
        Some(session)
    }

    pub fn sessions(&self) -> &[ConnectionSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session(&self, id: LocalId) -> Option<&ConnectionSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn session_mut(&mut self, id: LocalId) -> Option<&mut ConnectionSession> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    pub fn session_by_name(&self, name: &str) -> Option<&ConnectionSession> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    pub fn session_by_name_mut(&mut self, name: &str) -> Option<&mut ConnectionSession> {
        self.sessions.iter_mut().find(|s| s.name() == name)
    }

    /// Resolve a session or node id. Each session is checked before its tree.
    pub fn find(&self, id: LocalId) -> Option<CatalogEntry<'_>> {
        for session in &self.sessions {
            if session.id() == id {
                return Some(CatalogEntry::Session(session));
            }
            if let Some(node) = session.tree().find(id) {
                return Some(CatalogEntry::Resource { session, node });
            }
        }
        None
    }

    /// Server version of the named connection, probing it if still unknown
    pub async fn server_version_for(&mut self, account: &str) -> Option<ServerVersion> {
        self.session_by_name_mut(account)?
            .probe_server_version()
            .await
    }

    pub fn to_json(&self) -> Result<String> {
        persistence::save_registry(self)
    }

    /// Restore sessions saved by [`to_json`](Self::to_json)
    pub fn from_json(context: CatalogContext, json: &str) -> Result<Self> {
        persistence::load_registry(context, json)
    }
}
