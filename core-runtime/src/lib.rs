//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the catalog client and sync engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! Other workspace crates depend on this crate for the shared `CoreConfig`
//! and for the logging conventions (credential redaction, filter defaults).

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
