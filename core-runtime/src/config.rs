//! # Core Configuration Module
//!
//! Provides configuration management for the catalog client and sync engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the injected transport and the tunables shared by the
//! catalog and sync crates. It fails fast when a required bridge is missing.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Transport used for every catalog request
//!
//! When the `desktop-shims` feature is enabled, a `reqwest`-backed client is
//! injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .request_timeout(Duration::from_secs(20))
//!     .sync_authority("com.example.gis.provider")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::HttpClient;
use std::sync::Arc;
use std::time::Duration;

/// Default authority handed to remote layer sync hooks
pub const DEFAULT_SYNC_AUTHORITY: &str = "catalog.sync";

const DEFAULT_USER_AGENT: &str = concat!("catalog-sync/", env!("CARGO_PKG_VERSION"));
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Core configuration shared by the catalog client and the sync engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Transport for all server requests
    pub http_client: Arc<dyn HttpClient>,

    /// Per-request timeout applied by the catalog connector
    pub request_timeout: Duration,

    /// User agent reported by the default desktop transport
    pub user_agent: String,

    /// Authority string passed through to remote layer sync hooks
    pub sync_authority: String,

    /// Logging setup applied by `init_logging`
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .field("sync_authority", &self.sync_authority)
            .field("logging_format", &self.logging.format)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Request timeout is non-zero and at most ten minutes
    /// - User agent and sync authority are not blank
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(format!(
                "Request timeout exceeds maximum of {} seconds",
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }

        if self.sync_authority.trim().is_empty() {
            return Err(Error::Config("Sync authority cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration, user_agent: &str) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout, user_agent)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _timeout: Duration,
    _user_agent: &str,
) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                  Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                  Mobile: inject the platform-native transport."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    sync_authority: Option<String>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the per-request timeout (default 30 seconds).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the authority passed to remote layer sync hooks.
    pub fn sync_authority(mut self, authority: impl Into<String>) -> Self {
        self.sync_authority = Some(authority.into());
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no `HttpClient` is injected and no desktop default exists
    /// - `Config` when a value fails validation
    pub fn build(self) -> Result<CoreConfig> {
        let request_timeout = self.request_timeout.unwrap_or(Duration::from_secs(30));
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout, &user_agent)?,
        };

        let config = CoreConfig {
            http_client,
            request_timeout,
            user_agent,
            sync_authority: self
                .sync_authority
                .unwrap_or_else(|| DEFAULT_SYNC_AUTHORITY.to_string()),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
