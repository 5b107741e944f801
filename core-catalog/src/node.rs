//! # Resource Nodes
//!
//! One catalog entry with its kind-specific payload. Nodes live in the arena
//! of a [`ResourceTree`](crate::ResourceTree); `children` and `parent` are ids
//! into that arena.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::geo::Envelope;
use crate::ids::LocalId;
use crate::kind::{classify, ResourceKind};

/// Kind-specific data carried by a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Group,
    LayerWithStyles(LayerStyles),
    WebMap {
        styles: LayerStyles,
        items: Vec<WebMapItem>,
    },
    LookupTable,
    /// Kinds the catalog does not browse; never kept in a tree
    Unknown,
}

impl NodePayload {
    /// Empty payload matching a kind
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::ResourceGroup
            | ResourceKind::Connection
            | ResourceKind::ConnectionCollection => NodePayload::Group,
            ResourceKind::VectorLayer | ResourceKind::RasterLayer | ResourceKind::PostgisLayer => {
                NodePayload::LayerWithStyles(LayerStyles::default())
            }
            ResourceKind::WebMap => NodePayload::WebMap {
                styles: LayerStyles::default(),
                items: Vec::new(),
            },
            ResourceKind::LookupTable => NodePayload::LookupTable,
            _ => NodePayload::Unknown,
        }
    }
}

/// Rendering data of a layer: its style ids and native extent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStyles {
    /// Most recently discovered first
    pub style_ids: Vec<i64>,
    pub extent: Option<Envelope>,
}

impl LayerStyles {
    pub fn prepend_style(&mut self, style_id: i64) {
        self.style_ids.insert(0, style_id);
    }
}

/// Entry of a web map's layer tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "itemType", rename_all = "camelCase")]
pub enum WebMapItem {
    #[serde(rename_all = "camelCase")]
    Layer {
        display_name: String,
        style_id: i64,
        enabled: bool,
        adapter: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Group {
        display_name: String,
        children: Vec<WebMapItem>,
    },
}

impl WebMapItem {
    pub fn display_name(&self) -> &str {
        match self {
            WebMapItem::Layer { display_name, .. } | WebMapItem::Group { display_name, .. } => {
                display_name
            }
        }
    }
}

/// Style ids of every layer item, depth-first in document order
pub fn flatten_style_ids(items: &[WebMapItem]) -> Vec<i64> {
    let mut ids = Vec::new();
    let mut stack: Vec<std::slice::Iter<'_, WebMapItem>> = vec![items.iter()];

    while let Some(top) = stack.last_mut() {
        match top.next() {
            Some(WebMapItem::Layer { style_id, .. }) => ids.push(*style_id),
            Some(WebMapItem::Group { children, .. }) => stack.push(children.iter()),
            None => {
                stack.pop();
            }
        }
    }

    ids
}

/// Fields read from one server resource envelope
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResource {
    pub remote_id: i64,
    pub name: String,
    pub kind: ResourceKind,
    pub has_children: bool,
    pub description: Option<String>,
    pub key_name: Option<String>,
    pub owner_id: Option<i64>,
    pub interfaces: Vec<String>,
    pub webmap_items: Vec<WebMapItem>,
}

/// Parse `{"resource": {...}}` as returned by the children listing.
///
/// `children`, `display_name`, `id` and `cls` are required. Optional fields
/// that are missing or of the wrong type are left empty.
pub fn parse_resource(envelope: &Value) -> Result<ParsedResource> {
    let resource = envelope
        .get("resource")
        .filter(|r| r.is_object())
        .ok_or(CatalogError::MissingField("resource"))?;

    let has_children = resource
        .get("children")
        .and_then(Value::as_bool)
        .ok_or(CatalogError::MissingField("children"))?;
    let name = resource
        .get("display_name")
        .and_then(Value::as_str)
        .ok_or(CatalogError::MissingField("display_name"))?
        .to_string();
    let remote_id = resource
        .get("id")
        .and_then(Value::as_i64)
        .ok_or(CatalogError::MissingField("id"))?;
    let class_name = resource
        .get("cls")
        .and_then(Value::as_str)
        .ok_or(CatalogError::MissingField("cls"))?;

    let description = resource
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    let key_name = resource
        .get("keyname")
        .and_then(Value::as_str)
        .map(str::to_string);
    let owner_id = resource
        .get("owner_user")
        .and_then(|owner| owner.get("id"))
        .and_then(Value::as_i64);
    let interfaces = resource
        .get("interfaces")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let webmap_items = envelope
        .get("webmap")
        .and_then(|webmap| webmap.get("root_item"))
        .and_then(|root| root.get("children"))
        .and_then(Value::as_array)
        .map(|children| parse_webmap_items(children))
        .unwrap_or_default();

    Ok(ParsedResource {
        remote_id,
        name,
        kind: classify(class_name),
        has_children,
        description,
        key_name,
        owner_id,
        interfaces,
        webmap_items,
    })
}

/// Parse `root_item.children[]`; unknown or malformed items are skipped
pub fn parse_webmap_items(children: &[Value]) -> Vec<WebMapItem> {
    children.iter().filter_map(parse_webmap_item).collect()
}

fn parse_webmap_item(item: &Value) -> Option<WebMapItem> {
    let display_name = item
        .get("display_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match item.get("item_type").and_then(Value::as_str)? {
        "layer" => Some(WebMapItem::Layer {
            display_name,
            style_id: item.get("layer_style_id").and_then(Value::as_i64)?,
            enabled: item
                .get("layer_enabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            adapter: item
                .get("layer_adapter")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        "group" => Some(WebMapItem::Group {
            display_name,
            children: item
                .get("children")
                .and_then(Value::as_array)
                .map(|children| parse_webmap_items(children))
                .unwrap_or_default(),
        }),
        _ => None,
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub local_id: LocalId,
    /// Absent for roots that are not server resources
    pub remote_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub key_name: Option<String>,
    pub owner_id: Option<i64>,
    pub kind: ResourceKind,
    /// Server's advisory flag; the loaded child list is authoritative
    pub has_children_hint: bool,
    /// `None` until fetched, or when the fetch failed
    pub permissions: Option<Value>,
    pub children: Vec<LocalId>,
    pub children_loaded: bool,
    pub parent: Option<LocalId>,
    pub payload: NodePayload,
}

impl ResourceNode {
    /// Node for a remote id with no metadata yet (roots and placeholders)
    pub fn placeholder(
        local_id: LocalId,
        remote_id: Option<i64>,
        name: impl Into<String>,
        kind: ResourceKind,
    ) -> Self {
        Self {
            local_id,
            remote_id,
            name: name.into(),
            description: None,
            key_name: None,
            owner_id: None,
            kind,
            has_children_hint: kind.is_container(),
            permissions: None,
            children: Vec::new(),
            children_loaded: false,
            parent: None,
            payload: NodePayload::for_kind(kind),
        }
    }

    pub fn from_parsed(local_id: LocalId, parsed: ParsedResource, parent: Option<LocalId>) -> Self {
        let mut payload = NodePayload::for_kind(parsed.kind);
        if let NodePayload::WebMap { items, .. } = &mut payload {
            *items = parsed.webmap_items;
        }

        Self {
            local_id,
            remote_id: Some(parsed.remote_id),
            name: parsed.name,
            description: parsed.description,
            key_name: parsed.key_name,
            owner_id: parsed.owner_id,
            kind: parsed.kind,
            has_children_hint: parsed.has_children,
            permissions: None,
            children: Vec::new(),
            children_loaded: false,
            parent,
            payload,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.payload, NodePayload::Group)
    }

    pub fn styles(&self) -> Option<&LayerStyles> {
        match &self.payload {
            NodePayload::LayerWithStyles(styles) | NodePayload::WebMap { styles, .. } => {
                Some(styles)
            }
            _ => None,
        }
    }

    pub fn styles_mut(&mut self) -> Option<&mut LayerStyles> {
        match &mut self.payload {
            NodePayload::LayerWithStyles(styles) | NodePayload::WebMap { styles, .. } => {
                Some(styles)
            }
            _ => None,
        }
    }

    pub fn webmap_items(&self) -> &[WebMapItem] {
        match &self.payload {
            NodePayload::WebMap { items, .. } => items,
            _ => &[],
        }
    }

    /// Browser URL of the resource on `base_url`
    pub fn resource_url(&self, base_url: &str) -> Option<String> {
        self.remote_id
            .map(|id| format!("{}/resource/{}", base_url, id))
    }

    /// XYZ tile template rendering this layer's styles, in stored order
    pub fn tile_url(&self, base_url: &str) -> Option<String> {
        let styles = self.styles()?;
        if styles.style_ids.is_empty() {
            return None;
        }

        let ids = styles
            .style_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Some(format!(
            "{}/api/component/render/tile?z={{z}}&x={{x}}&y={{y}}&resource={}",
            base_url, ids
        ))
    }
}

/// Sort key: groups first, then case-insensitive name
pub(crate) fn sort_key(node: &ResourceNode) -> (bool, String) {
    (!node.is_group(), node.name.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;
    use serde_json::json;

    fn envelope(cls: &str) -> Value {
        json!({
            "resource": {
                "id": 12,
                "cls": cls,
                "display_name": "Roads",
                "children": true,
                "description": "Road network",
                "keyname": "roads",
                "owner_user": {"id": 4},
                "interfaces": ["IFeatureLayer", "IBboxLayer"]
            }
        })
    }

    #[test]
    fn test_parse_full_resource() {
        let parsed = parse_resource(&envelope("vector_layer")).unwrap();

        assert_eq!(parsed.remote_id, 12);
        assert_eq!(parsed.kind, ResourceKind::VectorLayer);
        assert_eq!(parsed.name, "Roads");
        assert!(parsed.has_children);
        assert_eq!(parsed.description.as_deref(), Some("Road network"));
        assert_eq!(parsed.key_name.as_deref(), Some("roads"));
        assert_eq!(parsed.owner_id, Some(4));
        assert_eq!(parsed.interfaces, vec!["IFeatureLayer", "IBboxLayer"]);
    }

    #[test]
    fn test_malformed_optional_fields_are_absent() {
        let value = json!({
            "resource": {
                "id": 3,
                "cls": "lookup_table",
                "display_name": "Codes",
                "children": false,
                "description": null,
                "keyname": 17,
                "owner_user": "admin",
                "interfaces": "none"
            }
        });

        let parsed = parse_resource(&value).unwrap();
        assert_eq!(parsed.description, None);
        assert_eq!(parsed.key_name, None);
        assert_eq!(parsed.owner_id, None);
        assert!(parsed.interfaces.is_empty());
    }

    #[test]
    fn test_missing_required_fields_fail() {
        assert!(matches!(
            parse_resource(&json!({"id": 1})),
            Err(CatalogError::MissingField("resource"))
        ));

        for field in ["children", "display_name", "id", "cls"] {
            let mut value = envelope("vector_layer");
            value["resource"].as_object_mut().unwrap().remove(field);
            match parse_resource(&value) {
                Err(CatalogError::MissingField(name)) => assert_eq!(name, field),
                other => panic!("expected missing {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_unknown_class_parses_as_none() {
        let parsed = parse_resource(&envelope("tileset")).unwrap();
        assert_eq!(parsed.kind, ResourceKind::None);
        assert_eq!(NodePayload::for_kind(parsed.kind), NodePayload::Unknown);
    }

    #[test]
    fn test_parse_webmap_items() {
        let mut value = envelope("webmap");
        value["webmap"] = json!({
            "root_item": {
                "item_type": "root",
                "children": [
                    {"item_type": "layer", "display_name": "Roads", "layer_style_id": 21,
                     "layer_enabled": true, "layer_adapter": "tile"},
                    {"item_type": "group", "display_name": "Water", "children": [
                        {"item_type": "layer", "display_name": "Rivers", "layer_style_id": 30},
                        {"item_type": "layer", "display_name": "Broken"}
                    ]},
                    {"item_type": "bookmark", "display_name": "Skipped"}
                ]
            }
        });

        let parsed = parse_resource(&value).unwrap();
        assert_eq!(parsed.webmap_items.len(), 2);
        assert_eq!(
            parsed.webmap_items[0],
            WebMapItem::Layer {
                display_name: "Roads".to_string(),
                style_id: 21,
                enabled: true,
                adapter: Some("tile".to_string()),
            }
        );
        assert_eq!(parsed.webmap_items[1].display_name(), "Water");
        assert_eq!(flatten_style_ids(&parsed.webmap_items), vec![21, 30]);
    }

    #[test]
    fn test_urls() {
        let ids = IdAllocator::new();
        let parsed = parse_resource(&envelope("raster_layer")).unwrap();
        let mut node = ResourceNode::from_parsed(ids.next_id(), parsed, None);

        assert_eq!(
            node.resource_url("https://gis.example.com").as_deref(),
            Some("https://gis.example.com/resource/12")
        );
        assert_eq!(node.tile_url("https://gis.example.com"), None);

        let styles = node.styles_mut().unwrap();
        styles.prepend_style(5);
        styles.prepend_style(9);
        assert_eq!(
            node.tile_url("https://gis.example.com").as_deref(),
            Some("https://gis.example.com/api/component/render/tile?z={z}&x={x}&y={y}&resource=9,5")
        );
    }

    #[test]
    fn test_placeholder_root() {
        let ids = IdAllocator::new();
        let root = ResourceNode::placeholder(ids.next_id(), Some(0), "gis", ResourceKind::ResourceGroup);
        assert!(root.is_group());
        assert!(!root.children_loaded);
        assert!(root.styles().is_none());
        assert_eq!(root.resource_url("http://h").as_deref(), Some("http://h/resource/0"));
    }
}
