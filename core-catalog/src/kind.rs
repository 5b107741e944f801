//! # Resource Kinds
//!
//! Closed classification of the class strings the server reports for its
//! catalog entries. Classification is a pure lookup in a fixed table; any
//! string not in the table is [`ResourceKind::None`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a catalog resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    None,
    ResourceGroup,
    VectorLayer,
    RasterLayer,
    PostgisLayer,
    PostgisConnection,
    WmsService,
    WfsService,
    WmsClient,
    BaseLayers,
    WebMap,
    LookupTable,
    FileSet,
    VectorLayerStyle,
    RasterLayerStyle,
    /// Local-only: one server connection
    Connection,
    /// Local-only: the set of all connections
    ConnectionCollection,
}

/// Server class string → kind
const CLASS_TABLE: &[(&str, ResourceKind)] = &[
    ("resource_group", ResourceKind::ResourceGroup),
    ("vector_layer", ResourceKind::VectorLayer),
    ("raster_layer", ResourceKind::RasterLayer),
    ("postgis_layer", ResourceKind::PostgisLayer),
    ("postgis_connection", ResourceKind::PostgisConnection),
    ("wmsserver_service", ResourceKind::WmsService),
    ("wfsserver_service", ResourceKind::WfsService),
    ("wmsclient_connection", ResourceKind::WmsClient),
    ("basemap_layer", ResourceKind::BaseLayers),
    ("webmap", ResourceKind::WebMap),
    ("lookup_table", ResourceKind::LookupTable),
    ("file_bucket", ResourceKind::FileSet),
    ("mapserver_style", ResourceKind::VectorLayerStyle),
    ("qgis_vector_style", ResourceKind::VectorLayerStyle),
    ("raster_style", ResourceKind::RasterLayerStyle),
    ("qgis_raster_style", ResourceKind::RasterLayerStyle),
];

const ALL_KINDS: [ResourceKind; 17] = [
    ResourceKind::None,
    ResourceKind::ResourceGroup,
    ResourceKind::VectorLayer,
    ResourceKind::RasterLayer,
    ResourceKind::PostgisLayer,
    ResourceKind::PostgisConnection,
    ResourceKind::WmsService,
    ResourceKind::WfsService,
    ResourceKind::WmsClient,
    ResourceKind::BaseLayers,
    ResourceKind::WebMap,
    ResourceKind::LookupTable,
    ResourceKind::FileSet,
    ResourceKind::VectorLayerStyle,
    ResourceKind::RasterLayerStyle,
    ResourceKind::Connection,
    ResourceKind::ConnectionCollection,
];

/// Classify a server class string. Unknown strings yield [`ResourceKind::None`].
pub fn classify(class_name: &str) -> ResourceKind {
    CLASS_TABLE
        .iter()
        .find(|(cls, _)| *cls == class_name)
        .map(|(_, kind)| *kind)
        .unwrap_or(ResourceKind::None)
}

impl ResourceKind {
    /// Every kind, in code order
    pub fn all() -> &'static [ResourceKind] {
        &ALL_KINDS
    }

    /// Stable integer tag used by the persisted catalog format
    pub fn code(self) -> i32 {
        match self {
            ResourceKind::None => 0,
            ResourceKind::ResourceGroup => 1,
            ResourceKind::VectorLayer => 2,
            ResourceKind::RasterLayer => 3,
            ResourceKind::PostgisLayer => 4,
            ResourceKind::PostgisConnection => 5,
            ResourceKind::WmsService => 6,
            ResourceKind::WfsService => 7,
            ResourceKind::WmsClient => 8,
            ResourceKind::BaseLayers => 9,
            ResourceKind::WebMap => 10,
            ResourceKind::LookupTable => 11,
            ResourceKind::FileSet => 12,
            ResourceKind::VectorLayerStyle => 13,
            ResourceKind::RasterLayerStyle => 14,
            ResourceKind::Connection => 15,
            ResourceKind::ConnectionCollection => 16,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|kind| kind.code() == code)
    }

    pub fn is_group(self) -> bool {
        self == ResourceKind::ResourceGroup
    }

    /// Kinds whose children can be browsed
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ResourceKind::ResourceGroup
                | ResourceKind::Connection
                | ResourceKind::ConnectionCollection
        )
    }

    /// Kinds rendered through a list of styles
    pub fn has_styles(self) -> bool {
        matches!(
            self,
            ResourceKind::VectorLayer
                | ResourceKind::RasterLayer
                | ResourceKind::PostgisLayer
                | ResourceKind::WebMap
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::None => "none",
            ResourceKind::ResourceGroup => "resource_group",
            ResourceKind::VectorLayer => "vector_layer",
            ResourceKind::RasterLayer => "raster_layer",
            ResourceKind::PostgisLayer => "postgis_layer",
            ResourceKind::PostgisConnection => "postgis_connection",
            ResourceKind::WmsService => "wms_service",
            ResourceKind::WfsService => "wfs_service",
            ResourceKind::WmsClient => "wms_client",
            ResourceKind::BaseLayers => "base_layers",
            ResourceKind::WebMap => "webmap",
            ResourceKind::LookupTable => "lookup_table",
            ResourceKind::FileSet => "file_set",
            ResourceKind::VectorLayerStyle => "vector_layer_style",
            ResourceKind::RasterLayerStyle => "raster_layer_style",
            ResourceKind::Connection => "connection",
            ResourceKind::ConnectionCollection => "connection_collection",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_classes() {
        assert_eq!(classify("resource_group"), ResourceKind::ResourceGroup);
        assert_eq!(classify("vector_layer"), ResourceKind::VectorLayer);
        assert_eq!(classify("webmap"), ResourceKind::WebMap);
        assert_eq!(classify("lookup_table"), ResourceKind::LookupTable);
        assert_eq!(classify("qgis_vector_style"), ResourceKind::VectorLayerStyle);
        assert_eq!(classify("qgis_raster_style"), ResourceKind::RasterLayerStyle);
    }

    #[test]
    fn test_classify_unknown_is_none() {
        for cls in ["", "Vector_Layer", "tileset", "resource_group ", "svg_marker_library"] {
            assert_eq!(classify(cls), ResourceKind::None, "{:?}", cls);
        }
    }

    #[test]
    fn test_local_kinds_have_no_server_class() {
        assert!(CLASS_TABLE
            .iter()
            .all(|(_, kind)| !matches!(
                kind,
                ResourceKind::Connection | ResourceKind::ConnectionCollection | ResourceKind::None
            )));
    }

    #[test]
    fn test_codes_are_unique_and_reversible() {
        for kind in ResourceKind::all() {
            assert_eq!(ResourceKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(ResourceKind::from_code(99), None);
        assert_eq!(ResourceKind::from_code(-1), None);
    }

    #[test]
    fn test_kind_predicates() {
        assert!(ResourceKind::ResourceGroup.is_group());
        assert!(!ResourceKind::Connection.is_group());
        assert!(ResourceKind::Connection.is_container());
        assert!(ResourceKind::PostgisLayer.has_styles());
        assert!(ResourceKind::WebMap.has_styles());
        assert!(!ResourceKind::LookupTable.has_styles());
    }
}
