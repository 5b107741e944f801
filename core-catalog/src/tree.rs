//! # Resource Tree
//!
//! Arena of [`ResourceNode`]s rooted at a server's top-level group. Children
//! are loaded lazily, one level per call, as the catalog is browsed.
//!
//! ## Loading
//!
//! `load_children` performs a single GET of the children listing. Entries that
//! fail to parse or whose kind the catalog does not browse are dropped. Layers
//! and web maps are enriched with their extent and style ids before insertion;
//! enrichment failures leave those fields empty. The new children are sorted
//! groups first, then by case-insensitive name.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::connector::Connector;
use crate::ids::{IdAllocator, LocalId};
use crate::kind::ResourceKind;
use crate::node::{flatten_style_ids, parse_resource, sort_key, NodePayload, ResourceNode};

/// Remote id of every server's top-level group
pub const ROOT_REMOTE_ID: i64 = 0;

#[derive(Debug)]
pub struct ResourceTree {
    root: LocalId,
    nodes: HashMap<LocalId, ResourceNode>,
    ids: Arc<IdAllocator>,
}

impl ResourceTree {
    /// Tree holding only an empty root group
    pub fn new(ids: Arc<IdAllocator>, root_name: impl Into<String>) -> Self {
        let root = ResourceNode::placeholder(
            ids.next_id(),
            Some(ROOT_REMOTE_ID),
            root_name,
            ResourceKind::ResourceGroup,
        );
        let root_id = root.local_id;

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);

        Self {
            root: root_id,
            nodes,
            ids,
        }
    }

    /// Rebuild a tree from restored nodes. `nodes` must contain `root`.
    pub(crate) fn from_parts(
        ids: Arc<IdAllocator>,
        root: LocalId,
        nodes: HashMap<LocalId, ResourceNode>,
    ) -> Self {
        Self { root, nodes, ids }
    }

    pub fn root_id(&self) -> LocalId {
        self.root
    }

    pub fn root(&self) -> &ResourceNode {
        &self.nodes[&self.root]
    }

    pub fn get(&self, id: LocalId) -> Option<&ResourceNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: LocalId) -> Option<&mut ResourceNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: LocalId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Loaded children of `id`, in display order
    pub fn children_of(&self, id: LocalId) -> Vec<&ResourceNode> {
        self.nodes
            .get(&id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of the subtree at `start`, depth-first, parents before children
    pub fn depth_first(&self, start: LocalId) -> Vec<LocalId> {
        let mut order = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }

        order
    }

    /// Depth-first, self-first search from the root
    pub fn find(&self, id: LocalId) -> Option<&ResourceNode> {
        self.depth_first(self.root)
            .into_iter()
            .find(|candidate| *candidate == id)
            .and_then(|found| self.nodes.get(&found))
    }

    /// Populate the children of `id` from the server.
    ///
    /// Returns `true` once the children are loaded, including when they
    /// already were. A failed listing leaves the node unloaded so the caller
    /// can retry.
    #[instrument(skip(self, connector), fields(node = %id))]
    pub async fn load_children(&mut self, connector: &Connector, id: LocalId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            warn!("Unknown node");
            return false;
        };
        if node.children_loaded {
            return true;
        }
        let Some(remote_id) = node.remote_id else {
            debug!("Node has no remote counterpart");
            return false;
        };

        let listing = match connector.fetch_children(remote_id).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(remote_id, error = %e, "Failed to list children");
                return false;
            }
        };

        let mut children = Vec::with_capacity(listing.len());
        for envelope in &listing {
            if let Some(child) = self.build_child(connector, envelope, id).await {
                children.push(child);
            }
        }
        children.sort_by_key(sort_key);

        let child_ids: Vec<LocalId> = children.iter().map(|child| child.local_id).collect();
        for child in children {
            self.nodes.insert(child.local_id, child);
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            debug!("Loaded {} of {} children", child_ids.len(), listing.len());
            node.children = child_ids;
            node.children_loaded = true;
        }
        true
    }

    async fn build_child(
        &self,
        connector: &Connector,
        envelope: &Value,
        parent: LocalId,
    ) -> Option<ResourceNode> {
        let parsed = match parse_resource(envelope) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Skipping malformed resource");
                return None;
            }
        };

        if NodePayload::for_kind(parsed.kind) == NodePayload::Unknown {
            debug!(remote_id = parsed.remote_id, kind = %parsed.kind, "Skipping unsupported resource");
            return None;
        }

        let mut node = ResourceNode::from_parsed(self.ids.next_id(), parsed, Some(parent));
        if node.kind.has_styles() {
            Self::enrich_layer(connector, &mut node).await;
        }
        Some(node)
    }

    async fn enrich_layer(connector: &Connector, node: &mut ResourceNode) {
        let Some(remote_id) = node.remote_id else {
            return;
        };

        let extent = match connector.fetch_extent(remote_id).await {
            Ok(extent) => Some(extent),
            Err(e) => {
                debug!(remote_id, error = %e, "Extent unavailable");
                None
            }
        };

        let mut style_ids = match connector.fetch_style_ids(remote_id).await {
            Ok(ids) => ids,
            Err(e) => {
                debug!(remote_id, error = %e, "Style list unavailable");
                Vec::new()
            }
        };

        let item_styles = flatten_style_ids(node.webmap_items());
        if !item_styles.is_empty() {
            style_ids.splice(0..0, item_styles);
        }

        if let Some(styles) = node.styles_mut() {
            styles.extent = extent;
            styles.style_ids = style_ids;
        }
    }

    /// Forget the loaded children of `id` and everything below them
    pub fn invalidate(&mut self, id: LocalId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let children = std::mem::take(&mut node.children);
        node.children_loaded = false;

        for child in children {
            for descendant in self.depth_first(child) {
                self.nodes.remove(&descendant);
            }
        }
    }

    /// Fetch and cache the permissions of `id`. `None` means unknown.
    pub async fn fetch_permissions(&mut self, connector: &Connector, id: LocalId) -> Option<&Value> {
        let node = self.nodes.get(&id)?;
        if node.permissions.is_none() {
            let remote_id = node.remote_id?;
            match connector.fetch_permissions(remote_id).await {
                Ok(permissions) => {
                    if let Some(node) = self.nodes.get_mut(&id) {
                        node.permissions = Some(permissions);
                    }
                }
                Err(e) => {
                    debug!(remote_id, error = %e, "Permissions unavailable");
                    return None;
                }
            }
        }
        self.nodes.get(&id).and_then(|node| node.permissions.as_ref())
    }

    pub(crate) fn nodes(&self) -> &HashMap<LocalId, ResourceNode> {
        &self.nodes
    }

    /// Append `node` under `parent` without touching the loaded flag
    #[cfg(test)]
    pub(crate) fn attach_child(&mut self, parent: LocalId, mut node: ResourceNode) -> LocalId {
        let id = node.local_id;
        node.parent = Some(parent);
        self.nodes.insert(id, node);
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.push(id);
        }
        id
    }
}
