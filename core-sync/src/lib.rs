//! # Layer Sync Module
//!
//! Drives a synchronization pass over the host's layer hierarchy.
//!
//! ## Overview
//!
//! This module walks local layers, hands each remote-bound layer the server
//! version of its connection, and aggregates what every layer reports into a
//! single outcome and summary:
//! - Depth-first walk in enumeration order
//! - One server version lookup per account per run
//! - Cooperative cancellation between layers
//!
//! ## Components
//!
//! - **Sync Engine** (`engine`): Walks layers and dispatches them
//! - **Sync Run State Machine** (`run`): Run lifecycle and the final report
//! - **Outcome** (`outcome`): Shared counters and the summary text
//! - **Layer Contract** (`layer`): What a host layer exposes to the engine
//! - **Version Lookup** (`version`): Server versions from the connection registry

pub mod engine;
pub mod error;
pub mod layer;
pub mod outcome;
pub mod run;
pub mod version;

pub use engine::{SyncConfig, SyncEngine};
pub use error::{Result, SyncError};
pub use layer::{LayerRole, SyncLayer};
pub use outcome::SyncOutcome;
pub use run::{SyncReport, SyncRun, SyncRunId, SyncStatus};
pub use version::VersionLookup;

pub use tokio_util::sync::CancellationToken;
