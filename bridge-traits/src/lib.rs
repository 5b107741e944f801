//! # Host Bridge Traits
//!
//! Contracts between the catalog/sync core and the host application.
//!
//! ## Overview
//!
//! The core never talks to the network or the host logger directly. Each trait
//! here is a capability the host injects:
//!
//! - [`HttpClient`](http::HttpClient) - Authenticated HTTP transport with optional response cache
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations should
//! convert platform-specific errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared through `Arc` between sessions and sync runs.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
