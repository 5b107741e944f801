//! Server response types
//!
//! Data structures for deserializing the catalog server's JSON endpoints.
//! Resource envelopes are parsed by hand in [`crate::node`] because malformed
//! optional fields must degrade to absence instead of failing the node.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// Server version as `(major, minor)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for ServerVersion {
    type Err = CatalogError;

    /// Parses dotted versions such as `4.5.0` or `4.5.0.dev3`. Anything past
    /// the minor component is ignored; a missing minor reads as `0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');

        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CatalogError::parse("server version", format!("empty version `{}`", s)))?
            .parse::<u32>()
            .map_err(|e| CatalogError::parse("server version", e))?;

        let minor = match parts.next() {
            Some(part) => leading_digits(part)
                .parse::<u32>()
                .map_err(|e| CatalogError::parse("server version", e))?,
            None => 0,
        };

        Ok(Self { major, minor })
    }
}

fn leading_digits(part: &str) -> &str {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    &part[..end]
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// `GET /api/resource/{id}/extent`
#[derive(Debug, Clone, Deserialize)]
pub struct ExtentResponse {
    pub extent: GeographicExtent,
}

/// Bounding box in WGS 84 degrees
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicExtent {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// `GET /resource/schema`
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaResponse {
    #[serde(default)]
    pub resources: HashMap<String, serde_json::Value>,
}

/// `POST /api/component/auth/login` body
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub login: &'a str,
    pub password: &'a str,
}
