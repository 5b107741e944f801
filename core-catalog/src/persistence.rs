//! # Catalog Persistence
//!
//! JSON form of a [`ConnectionRegistry`] so configured connections and the
//! browsed part of their catalogs survive a restart.
//!
//! Children are stored as `{kindTag, node}` pairs. A child with an
//! unrecognized tag, or whose node record does not parse, is skipped without
//! affecting its siblings. Every restored id is reported to the registry's
//! [`IdAllocator`] before any new id is handed out; an id seen twice is
//! replaced by a fresh one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::connector::{CatalogContext, Credentials};
use crate::error::{CatalogError, Result};
use crate::geo::Envelope;
use crate::ids::{IdAllocator, LocalId};
use crate::kind::ResourceKind;
use crate::node::{NodePayload, ResourceNode, WebMapItem};
use crate::registry::ConnectionRegistry;
use crate::session::{Capabilities, ConnectionSession};
use crate::tree::ResourceTree;

#[derive(Debug, Serialize, Deserialize)]
struct RegistryRecord {
    #[serde(default)]
    sessions: Vec<SessionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    name: String,
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
    url: String,
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    cookie: Option<String>,
    id: u64,
    #[serde(default)]
    supported_kinds: Vec<i32>,
    root: NodeRecord,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    name: String,
    #[serde(default)]
    has_children: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    key_name: Option<String>,
    #[serde(default)]
    owner_id: Option<i64>,
    #[serde(default)]
    permissions_present: bool,
    #[serde(rename = "permissionsJSON", default, skip_serializing_if = "Option::is_none")]
    permissions_json: Option<String>,
    kind: i32,
    local_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children_loaded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    child_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<ChildRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style_ids: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extent: Option<Envelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    webmap_items: Option<Vec<WebMapItem>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildRecord {
    kind_tag: i32,
    node: Value,
}

pub(crate) fn save_registry(registry: &ConnectionRegistry) -> Result<String> {
    let record = RegistryRecord {
        sessions: registry.sessions().iter().map(session_record).collect(),
    };
    serde_json::to_string(&record).map_err(|e| CatalogError::Persistence(e.to_string()))
}

fn session_record(session: &ConnectionSession) -> SessionRecord {
    let credentials = session.credentials();
    SessionRecord {
        name: session.name().to_string(),
        login: credentials.login.clone(),
        password: credentials.password.clone(),
        url: session.url().to_string(),
        connected: session.is_connected(),
        cookie: session.auth_cookie().map(str::to_string),
        id: session.id().as_u64(),
        supported_kinds: session
            .capabilities()
            .kinds()
            .iter()
            .map(|kind| kind.code())
            .collect(),
        root: node_record(session.tree(), session.tree().root_id()),
    }
}

fn node_record(tree: &ResourceTree, id: LocalId) -> NodeRecord {
    let node = &tree.nodes()[&id];

    let mut record = NodeRecord {
        name: node.name.clone(),
        has_children: node.has_children_hint,
        description: node.description.clone(),
        key_name: node.key_name.clone(),
        owner_id: node.owner_id,
        permissions_present: node.permissions.is_some(),
        permissions_json: node.permissions.as_ref().map(Value::to_string),
        kind: node.kind.code(),
        local_id: node.local_id.as_u64(),
        remote_id: node.remote_id,
        children_loaded: None,
        child_count: None,
        children: None,
        style_ids: None,
        extent: None,
        webmap_items: None,
    };

    if node.kind.is_container() {
        let children: Vec<ChildRecord> = node
            .children
            .iter()
            .filter(|child| tree.contains(**child))
            .map(|child| ChildRecord {
                kind_tag: tree.nodes()[child].kind.code(),
                node: serde_json::to_value(node_record(tree, *child)).unwrap_or(Value::Null),
            })
            .collect();
        record.children_loaded = Some(node.children_loaded);
        record.child_count = Some(children.len());
        record.children = Some(children);
    }

    if let Some(styles) = node.styles() {
        record.style_ids = Some(styles.style_ids.clone());
        record.extent = styles.extent;
    }
    if node.kind == ResourceKind::WebMap {
        record.webmap_items = Some(node.webmap_items().to_vec());
    }

    record
}

/// Node record with its surviving children, ids already observed
struct Resolved {
    record: NodeRecord,
    kind: ResourceKind,
    children: Vec<Resolved>,
}

pub(crate) fn load_registry(context: CatalogContext, json: &str) -> Result<ConnectionRegistry> {
    let record: RegistryRecord =
        serde_json::from_str(json).map_err(|e| CatalogError::Persistence(e.to_string()))?;
    let ids = Arc::clone(&context.ids);

    // Observe every persisted id before allocating any replacement
    let mut resolved_sessions = Vec::with_capacity(record.sessions.len());
    for mut session in record.sessions {
        ids.observe(LocalId::from_raw(session.id));
        let root_record = std::mem::replace(&mut session.root, empty_record());
        let Some(root) = resolve(root_record, &ids) else {
            warn!(session = %session.name, "Skipping session with unreadable root");
            continue;
        };
        resolved_sessions.push((session, root));
    }

    let mut seen = HashSet::new();
    let mut sessions = Vec::with_capacity(resolved_sessions.len());
    for (session, root) in resolved_sessions {
        let id = claim(LocalId::from_raw(session.id), &mut seen, &ids);

        let mut nodes = HashMap::new();
        let root_id = insert(root, None, &mut seen, &ids, &mut nodes);
        let tree = ResourceTree::from_parts(Arc::clone(&ids), root_id, nodes);

        let kinds: Vec<ResourceKind> = session
            .supported_kinds
            .iter()
            .filter_map(|code| ResourceKind::from_code(*code))
            .collect();

        debug!(session = %session.name, nodes = tree.len(), "Restored connection");
        sessions.push(ConnectionSession::from_parts(
            &context,
            id,
            session.name,
            &session.url,
            Credentials::new(session.login, session.password),
            session.cookie,
            session.connected,
            Capabilities::from_kinds(kinds),
            tree,
        ));
    }

    Ok(ConnectionRegistry::from_sessions(context, sessions))
}

fn empty_record() -> NodeRecord {
    NodeRecord {
        name: String::new(),
        has_children: false,
        description: None,
        key_name: None,
        owner_id: None,
        permissions_present: false,
        permissions_json: None,
        kind: ResourceKind::None.code(),
        local_id: 0,
        remote_id: None,
        children_loaded: None,
        child_count: None,
        children: None,
        style_ids: None,
        extent: None,
        webmap_items: None,
    }
}

fn resolve(mut record: NodeRecord, ids: &IdAllocator) -> Option<Resolved> {
    let kind = ResourceKind::from_code(record.kind)?;
    if NodePayload::for_kind(kind) == NodePayload::Unknown {
        return None;
    }
    ids.observe(LocalId::from_raw(record.local_id));

    let mut children = Vec::new();
    for child in record.children.take().unwrap_or_default() {
        if ResourceKind::from_code(child.kind_tag).is_none() {
            debug!(kind_tag = child.kind_tag, "Skipping child with unknown kind tag");
            continue;
        }
        let parsed = match serde_json::from_value::<NodeRecord>(child.node) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable child record");
                continue;
            }
        };
        if let Some(resolved) = resolve(parsed, ids) {
            children.push(resolved);
        }
    }

    Some(Resolved {
        record,
        kind,
        children,
    })
}

fn claim(id: LocalId, seen: &mut HashSet<LocalId>, ids: &IdAllocator) -> LocalId {
    if seen.insert(id) {
        return id;
    }
    let fresh = ids.next_id();
    debug!(%id, %fresh, "Reassigning duplicate id");
    seen.insert(fresh);
    fresh
}

fn insert(
    resolved: Resolved,
    parent: Option<LocalId>,
    seen: &mut HashSet<LocalId>,
    ids: &IdAllocator,
    nodes: &mut HashMap<LocalId, ResourceNode>,
) -> LocalId {
    let Resolved {
        record,
        kind,
        children,
    } = resolved;
    let local_id = claim(LocalId::from_raw(record.local_id), seen, ids);

    let mut payload = NodePayload::for_kind(kind);
    match &mut payload {
        NodePayload::LayerWithStyles(styles) => {
            styles.style_ids = record.style_ids.unwrap_or_default();
            styles.extent = record.extent;
        }
        NodePayload::WebMap { styles, items } => {
            styles.style_ids = record.style_ids.unwrap_or_default();
            styles.extent = record.extent;
            *items = record.webmap_items.unwrap_or_default();
        }
        _ => {}
    }

    let permissions = if record.permissions_present {
        record
            .permissions_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    } else {
        None
    };

    let child_ids: Vec<LocalId> = children
        .into_iter()
        .map(|child| insert(child, Some(local_id), seen, ids, nodes))
        .collect();

    nodes.insert(
        local_id,
        ResourceNode {
            local_id,
            remote_id: record.remote_id,
            name: record.name,
            description: record.description,
            key_name: record.key_name,
            owner_id: record.owner_id,
            kind,
            has_children_hint: record.has_children,
            permissions,
            children: child_ids,
            children_loaded: record.children_loaded.unwrap_or(false),
            parent,
            payload,
        },
    );

    local_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LayerStyles;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use serde_json::json;

    struct OfflineClient;

    #[async_trait]
    impl HttpClient for OfflineClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    fn context() -> CatalogContext {
        CatalogContext::new(Arc::new(OfflineClient))
    }

    fn node(ids: &IdAllocator, remote_id: i64, name: &str, kind: ResourceKind) -> ResourceNode {
        ResourceNode::placeholder(ids.next_id(), Some(remote_id), name, kind)
    }

    fn populated_registry() -> ConnectionRegistry {
        let mut registry = ConnectionRegistry::new(context());
        let id = registry
            .add("city", "https://gis.example.com", Credentials::new("admin", "secret"))
            .unwrap();
        let ids = Arc::clone(&registry.context().ids);

        let session = registry.session_mut(id).unwrap();
        let tree = session.tree_mut();
        let root = tree.root_id();
        tree.get_mut(root).unwrap().children_loaded = true;

        let group = tree.attach_child(root, node(&ids, 1, "Transport", ResourceKind::ResourceGroup));
        tree.get_mut(group).unwrap().children_loaded = true;

        let mut layer = node(&ids, 2, "Roads", ResourceKind::VectorLayer);
        layer.payload = NodePayload::LayerWithStyles(LayerStyles {
            style_ids: vec![22, 21],
            extent: Some(Envelope::new(0.0, 0.0, 10.0, 20.0)),
        });
        layer.permissions = Some(json!({"data": {"read": true}}));
        tree.attach_child(group, layer);
        tree.attach_child(group, node(&ids, 3, "Road classes", ResourceKind::LookupTable));

        registry
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let registry = populated_registry();
        let json = registry.to_json().unwrap();

        let restored = ConnectionRegistry::from_json(context(), &json).unwrap();
        let original = &registry.sessions()[0];
        let session = &restored.sessions()[0];

        assert_eq!(session.id(), original.id());
        assert_eq!(session.name(), "city");
        assert_eq!(session.credentials(), original.credentials());
        assert_eq!(session.url(), "https://gis.example.com");

        let tree = session.tree();
        let group = tree.children_of(tree.root_id())[0];
        assert_eq!(group.name, "Transport");
        assert!(group.children_loaded);

        let children = tree.children_of(group.local_id);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "Roads");
        assert_eq!(children[0].styles().unwrap().style_ids, vec![22, 21]);
        assert_eq!(
            children[0].styles().unwrap().extent,
            Some(Envelope::new(0.0, 0.0, 10.0, 20.0))
        );
        assert_eq!(children[0].permissions, Some(json!({"data": {"read": true}})));
        assert_eq!(children[0].parent, Some(group.local_id));
        assert_eq!(children[1].kind, ResourceKind::LookupTable);
        assert_eq!(children[1].remote_id, Some(3));

        for id in original.tree().depth_first(original.tree().root_id()) {
            assert_eq!(tree.get(id), original.tree().get(id));
        }
    }

    #[test]
    fn test_reprojected_extent_survives_round_trip() {
        let mut registry = populated_registry();
        let extent = crate::geo::geographic_to_mercator(10.0, 50.0, 11.0, 51.0);
        let layer_id = {
            let tree = registry.sessions()[0].tree();
            let group = tree.children_of(tree.root_id())[0].local_id;
            tree.children_of(group)[0].local_id
        };
        let session_id = registry.sessions()[0].id();
        registry
            .session_mut(session_id)
            .unwrap()
            .tree_mut()
            .get_mut(layer_id)
            .unwrap()
            .styles_mut()
            .unwrap()
            .extent = Some(extent);

        let json = registry.to_json().unwrap();
        let restored = ConnectionRegistry::from_json(context(), &json).unwrap();

        let layer = restored.sessions()[0].tree().get(layer_id).unwrap();
        assert_eq!(layer.styles().unwrap().extent, Some(extent));
        assert_eq!(layer.styles().unwrap().extent.unwrap().min_x.to_bits(), extent.min_x.to_bits());
    }

    #[test]
    fn test_restore_observes_ids() {
        let json = json!({"sessions": [{
            "name": "old", "url": "http://old.example.com", "id": 500,
            "root": {"name": "old", "kind": 1, "localId": 900, "childrenLoaded": false}
        }]})
        .to_string();

        let registry = ConnectionRegistry::from_json(context(), &json).unwrap();
        assert!(registry.context().ids.peek().as_u64() > 900);

        let mut registry = registry;
        let added = registry.add("new", "http://new.example.com", Credentials::default()).unwrap();
        assert!(added.as_u64() > 900);
    }

    #[test]
    fn test_unknown_kind_tag_skips_only_that_child() {
        let json = json!({"sessions": [{
            "name": "s", "url": "http://s.example.com", "id": 1,
            "supportedKinds": [1, 10, 99],
            "root": {
                "name": "s", "kind": 1, "localId": 2, "childrenLoaded": true, "childCount": 3,
                "children": [
                    {"kindTag": 77, "node": {"name": "future", "kind": 77, "localId": 3}},
                    {"kindTag": 11, "node": {"name": "Codes", "kind": 11, "localId": 4}},
                    {"kindTag": 11, "node": {"garbage": true}}
                ]
            }
        }]})
        .to_string();

        let registry = ConnectionRegistry::from_json(context(), &json).unwrap();
        let session = &registry.sessions()[0];
        let names: Vec<_> = session
            .tree()
            .children_of(session.tree().root_id())
            .iter()
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(names, vec!["Codes"]);
        assert!(session.is_type_supported(ResourceKind::WebMap));
        assert!(!session.is_type_supported(ResourceKind::VectorLayer));
    }

    #[test]
    fn test_duplicate_ids_are_reassigned() {
        let json = json!({"sessions": [{
            "name": "s", "url": "http://s.example.com", "id": 7,
            "root": {
                "name": "s", "kind": 1, "localId": 7, "childrenLoaded": true,
                "children": [{"kindTag": 11, "node": {"name": "Codes", "kind": 11, "localId": 7}}]
            }
        }]})
        .to_string();

        let registry = ConnectionRegistry::from_json(context(), &json).unwrap();
        let session = &registry.sessions()[0];
        let tree = session.tree();
        let child = tree.children_of(tree.root_id())[0].local_id;

        let all = [session.id(), tree.root_id(), child];
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_invalid_document_is_error() {
        let result = ConnectionRegistry::from_json(context(), "{not json");
        assert!(matches!(result, Err(CatalogError::Persistence(_))));
    }
}
