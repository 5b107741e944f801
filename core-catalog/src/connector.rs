//! Catalog server connector
//!
//! Issues the catalog's HTTP calls through the injected [`HttpClient`] and
//! turns responses into typed values. Every call is a single attempt; retry
//! policy belongs to the transport.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_runtime::logging::{redact_if_sensitive, strip_userinfo};
use core_runtime::CoreConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::geo::{geographic_to_mercator, Envelope};
use crate::ids::IdAllocator;
use crate::kind::{classify, ResourceKind};
use crate::types::{ExtentResponse, LoginRequest, SchemaResponse, ServerVersion};

/// Interface a child resource must expose to count as a renderable style
pub const RENDERABLE_STYLE_MARKER: &str = "IRenderableStyle";

/// Component key holding the server version in the package version map
pub const VERSION_COMPONENT_KEY: &str = "nextgisweb";

/// Endpoint layout and tunables of the catalog server API
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Prefix of per-resource endpoints (`{prefix}/?parent=`, `{prefix}/{id}/extent`)
    pub resource_api_path: String,
    pub schema_path: String,
    pub version_path: String,
    pub login_path: String,
    pub style_marker: String,
    pub version_key: String,
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            resource_api_path: "/api/resource".to_string(),
            schema_path: "/resource/schema".to_string(),
            version_path: "/api/component/pyramid/pkg_version".to_string(),
            login_path: "/api/component/auth/login".to_string(),
            style_marker: RENDERABLE_STYLE_MARKER.to_string(),
            version_key: VERSION_COMPONENT_KEY.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Login and password of one connection. The password is never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Empty login means anonymous access
    pub fn is_anonymous(&self) -> bool {
        self.login.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &redact_if_sensitive("password", &self.password))
            .finish()
    }
}

/// Shared collaborators of every session in a registry
#[derive(Clone)]
pub struct CatalogContext {
    pub http: Arc<dyn HttpClient>,
    pub ids: Arc<IdAllocator>,
    pub config: Arc<CatalogConfig>,
}

impl CatalogContext {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            ids: Arc::new(IdAllocator::new()),
            config: Arc::new(CatalogConfig::default()),
        }
    }

    /// Reuse the transport and timeout of a runtime configuration
    pub fn from_core(core: &CoreConfig) -> Self {
        let config = CatalogConfig {
            request_timeout: core.request_timeout,
            ..CatalogConfig::default()
        };
        Self {
            http: Arc::clone(&core.http_client),
            ids: Arc::new(IdAllocator::new()),
            config: Arc::new(config),
        }
    }

    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

impl fmt::Debug for CatalogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogContext")
            .field("http", &"HttpClient { ... }")
            .field("next_id", &self.ids.peek())
            .field("config", &self.config)
            .finish()
    }
}

/// HTTP calls against one catalog server
#[derive(Clone)]
pub struct Connector {
    http: Arc<dyn HttpClient>,
    config: Arc<CatalogConfig>,
    base_url: String,
    credentials: Credentials,
    cookie: Option<String>,
}

impl Connector {
    pub fn new(context: &CatalogContext, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http: Arc::clone(&context.http),
            config: Arc::clone(&context.config),
            base_url: base_url.into(),
            credentials,
            cookie: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn set_cookie(&mut self, cookie: Option<String>) {
        self.cookie = cookie;
    }

    pub fn children_url(&self, remote_id: i64) -> String {
        format!(
            "{}{}/?parent={}",
            self.base_url, self.config.resource_api_path, remote_id
        )
    }

    pub fn extent_url(&self, remote_id: i64) -> String {
        format!(
            "{}{}/{}/extent",
            self.base_url, self.config.resource_api_path, remote_id
        )
    }

    pub fn permission_url(&self, remote_id: i64) -> String {
        format!(
            "{}{}/{}/permission",
            self.base_url, self.config.resource_api_path, remote_id
        )
    }

    pub fn schema_url(&self) -> String {
        format!("{}{}", self.base_url, self.config.schema_path)
    }

    pub fn version_url(&self) -> String {
        format!("{}{}", self.base_url, self.config.version_path)
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.config.login_path)
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        let mut request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .basic_auth(&self.credentials.login, &self.credentials.password)
            .timeout(self.config.request_timeout);
        if let Some(cookie) = &self.cookie {
            request = request.cookie(cookie.clone());
        }
        request
    }

    /// Authenticated GET; any non-2xx status is an error
    pub async fn get(&self, url: String, use_cache: bool) -> Result<HttpResponse> {
        let request = self.request(HttpMethod::Get, url).cached(use_cache);
        let url = request.url.clone();

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            debug!(
                url = %strip_userinfo(&url),
                status = response.status,
                "Catalog request failed"
            );
            return Err(CatalogError::Status {
                status: response.status,
                url: strip_userinfo(&url),
            });
        }

        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        use_cache: bool,
        context: &str,
    ) -> Result<T> {
        let response = self.get(url, use_cache).await?;
        serde_json::from_slice(&response.body).map_err(|e| CatalogError::parse(context, e))
    }

    /// Raw child envelopes of a resource
    #[instrument(skip(self))]
    pub async fn fetch_children(&self, remote_id: i64) -> Result<Vec<Value>> {
        let value: Value = self
            .get_json(self.children_url(remote_id), false, "children listing")
            .await?;

        match value {
            Value::Array(children) => {
                debug!("Fetched {} children", children.len());
                Ok(children)
            }
            _ => Err(CatalogError::parse(
                "children listing",
                "expected a JSON array",
            )),
        }
    }

    /// Ids of the renderable style children of a layer, most recently
    /// discovered first
    #[instrument(skip(self))]
    pub async fn fetch_style_ids(&self, remote_id: i64) -> Result<Vec<i64>> {
        let children = self.fetch_children(remote_id).await?;
        let mut style_ids = Vec::new();

        for child in &children {
            let Some(resource) = child.get("resource") else {
                continue;
            };
            let is_style = resource
                .get("interfaces")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .any(|i| i.as_str() == Some(self.config.style_marker.as_str()))
                })
                .unwrap_or(false);

            if let (true, Some(id)) = (is_style, resource.get("id").and_then(Value::as_i64)) {
                style_ids.insert(0, id);
            }
        }

        Ok(style_ids)
    }

    /// Layer extent reprojected into Mercator
    #[instrument(skip(self))]
    pub async fn fetch_extent(&self, remote_id: i64) -> Result<Envelope> {
        let response: ExtentResponse = self
            .get_json(self.extent_url(remote_id), false, "layer extent")
            .await?;
        let extent = response.extent;

        let envelope =
            geographic_to_mercator(extent.min_lon, extent.min_lat, extent.max_lon, extent.max_lat);
        if !envelope.is_valid() {
            return Err(CatalogError::parse("layer extent", "degenerate bounding box"));
        }
        Ok(envelope)
    }

    #[instrument(skip(self))]
    pub async fn fetch_permissions(&self, remote_id: i64) -> Result<Value> {
        self.get_json(self.permission_url(remote_id), true, "permissions")
            .await
    }

    #[instrument(skip(self))]
    pub async fn fetch_version(&self) -> Result<ServerVersion> {
        let versions: Value = self.get_json(self.version_url(), false, "package versions").await?;
        let raw = versions
            .get(&self.config.version_key)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CatalogError::parse(
                    "package versions",
                    format!("no `{}` entry", self.config.version_key),
                )
            })?;

        let version = raw.parse::<ServerVersion>()?;
        info!(%version, "Server version detected");
        Ok(version)
    }

    /// Kinds the server declares in its resource schema
    #[instrument(skip(self))]
    pub async fn fetch_schema_kinds(&self) -> Result<BTreeSet<ResourceKind>> {
        let schema: SchemaResponse = self
            .get_json(self.schema_url(), true, "resource schema")
            .await?;

        let kinds: BTreeSet<ResourceKind> = schema
            .resources
            .keys()
            .map(|cls| classify(cls))
            .filter(|kind| *kind != ResourceKind::None)
            .collect();

        debug!(
            "Schema lists {} classes, {} recognized",
            schema.resources.len(),
            kinds.len()
        );
        Ok(kinds)
    }

    /// Credentialed handshake returning the session cookie (`name=value`)
    #[instrument(skip(self), fields(login = %self.credentials.login))]
    pub async fn login(&self) -> Result<String> {
        let body = LoginRequest {
            login: &self.credentials.login,
            password: &self.credentials.password,
        };
        let request = self
            .request(HttpMethod::Post, self.login_url())
            .json(&body)?;

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            warn!(status = response.status, "Login rejected");
            return Err(CatalogError::AuthenticationFailed(format!(
                "server returned status {}",
                response.status
            )));
        }

        let cookie = response
            .header("Set-Cookie")
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CatalogError::AuthenticationFailed("no session cookie in response".to_string())
            })?
            .to_string();

        debug!(cookie = %redact_if_sensitive("cookie", &cookie), "Login accepted");
        Ok(cookie)
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("has_cookie", &self.cookie.is_some())
            .finish()
    }
}
