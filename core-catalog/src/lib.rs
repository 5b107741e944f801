//! # Catalog Client
//!
//! Discovers the resource catalog of a remote web-GIS server and materializes
//! it as a typed, lazily populated tree.
//!
//! ## Overview
//!
//! - [`classify`] maps server class strings to [`ResourceKind`]s
//! - [`Connector`] performs the HTTP calls through the injected `HttpClient`
//! - [`ResourceTree`] holds the [`ResourceNode`]s of one server
//! - [`ConnectionSession`] negotiates version and capabilities and logs in
//! - [`ConnectionRegistry`] owns all sessions and their shared id space, and
//!   persists them as JSON
//!
//! ## Usage
//!
//! ```ignore
//! use core_catalog::{CatalogContext, ConnectionRegistry, Credentials};
//!
//! let mut registry = ConnectionRegistry::new(CatalogContext::from_core(&core_config));
//! let id = registry.add("city", "gis.example.com", Credentials::new("admin", "secret"))?;
//!
//! let session = registry.session_mut(id).unwrap();
//! if session.connect(false).await {
//!     let root = session.tree().root_id();
//!     session.load_children(root).await;
//! }
//! ```

pub mod connector;
pub mod error;
pub mod geo;
pub mod ids;
pub mod kind;
pub mod node;
mod persistence;
pub mod registry;
pub mod session;
pub mod tree;
pub mod types;

pub use connector::{CatalogConfig, CatalogContext, Connector, Credentials};
pub use error::{CatalogError, Result};
pub use geo::Envelope;
pub use ids::{IdAllocator, LocalId};
pub use kind::{classify, ResourceKind};
pub use node::{LayerStyles, NodePayload, ResourceNode, WebMapItem};
pub use registry::{CatalogEntry, ConnectionRegistry};
pub use session::{normalize_url, Capabilities, ConnectionSession};
pub use tree::ResourceTree;
pub use types::ServerVersion;
