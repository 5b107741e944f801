//! Workspace facade crate.
//!
//! Host applications depend on `catalog-sync-workspace` to pull in the catalog
//! client, the sync engine and (with `desktop-shims`) the desktop transport
//! without wiring each crate individually.

pub use bridge_traits;
pub use core_catalog;
pub use core_runtime;
pub use core_sync;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;
