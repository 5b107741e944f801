//! # Sync Engine
//!
//! Walks the host's layer hierarchy and dispatches every layer to its sync
//! strategy.
//!
//! ## Walk
//!
//! Layers are visited depth-first in enumeration order; a group's children
//! are finished before its next sibling. For each layer:
//!
//! - **Group**: its children are walked
//! - **Remote**: the server version of its account is resolved (once per
//!   account per run) and the layer syncs itself into the shared outcome
//! - **Local**: the layer runs its local maintenance
//! - **Inert**: skipped
//!
//! The cancellation token is polled before every layer. Once it fires the walk
//! stops and the run ends `Cancelled` with whatever the outcome holds so far.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = SyncEngine::new(SyncConfig::from_core(&core_config), registry);
//! let report = engine.run(&layers, &CancellationToken::new()).await?;
//! if !report.summary.is_empty() {
//!     println!("{}", report.summary);
//! }
//! ```

use bridge_traits::time::{Clock, SystemClock};
use core_catalog::ServerVersion;
use core_runtime::CoreConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::layer::{LayerRole, SyncLayer};
use crate::run::{SyncReport, SyncRun};
use crate::version::VersionLookup;
use crate::{Result, SyncError};

/// Settings of the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Authority handed to every remote layer
    pub authority: String,
}

impl SyncConfig {
    /// # Errors
    ///
    /// Returns an error if `authority` is blank
    pub fn new(authority: impl Into<String>) -> Result<Self> {
        let authority = authority.into();
        if authority.trim().is_empty() {
            return Err(SyncError::Config("Sync authority cannot be empty".to_string()));
        }
        Ok(Self { authority })
    }

    pub fn from_core(core: &CoreConfig) -> Self {
        Self {
            authority: core.sync_authority.clone(),
        }
    }
}

pub struct SyncEngine {
    config: SyncConfig,
    versions: Arc<dyn VersionLookup>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, versions: Arc<dyn VersionLookup>) -> Self {
        Self {
            config,
            versions,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one sync pass over `layers`
    ///
    /// # Errors
    ///
    /// Only an inconsistent run lifecycle is an error; layer failures are
    /// reported through the outcome counters.
    #[instrument(skip_all, fields(layers = layers.len()))]
    pub async fn run(
        &self,
        layers: &[Arc<dyn SyncLayer>],
        cancellation_token: &CancellationToken,
    ) -> Result<SyncReport> {
        let mut run = SyncRun::new(self.clock.now()).start(self.clock.now())?;
        info!(run_id = %run.id, "Sync run started");

        let mut versions: HashMap<String, Option<ServerVersion>> = HashMap::new();
        let mut stack = vec![layers.iter()];
        let mut cancelled = false;

        while let Some(level) = stack.last_mut() {
            let Some(layer) = level.next() else {
                stack.pop();
                continue;
            };

            if cancellation_token.is_cancelled() {
                info!(run_id = %run.id, "Sync run cancelled before {}", layer.name());
                cancelled = true;
                break;
            }
            run.layers_visited += 1;

            match layer.role() {
                LayerRole::Group => {
                    debug!(layer = layer.name(), "Entering group");
                    stack.push(layer.children().iter());
                }
                LayerRole::Remote { account } => {
                    let version = match versions.get(&account) {
                        Some(version) => *version,
                        None => {
                            let version = self.versions.server_version(&account).await;
                            debug!(%account, ?version, "Resolved server version");
                            versions.insert(account.clone(), version);
                            version
                        }
                    };
                    debug!(layer = layer.name(), %account, "Syncing remote layer");
                    layer
                        .sync(&self.config.authority, version, &mut run.outcome)
                        .await;
                }
                LayerRole::Local => {
                    debug!(layer = layer.name(), "Syncing local layer");
                    layer.sync_local().await;
                }
                LayerRole::Inert => {
                    debug!(layer = layer.name(), "Nothing to sync");
                }
            }
        }

        let run = if cancelled {
            run.cancel(self.clock.now())?
        } else {
            run.complete(self.clock.now())?
        };

        let report = run.into_report();
        info!(
            run_id = %report.run_id,
            status = %report.status,
            layers = report.layers_visited,
            errors = report.outcome.has_errors(),
            "Sync run finished"
        );
        Ok(report)
    }
}
