//! Workspace umbrella crate.
//!
//! Host applications can depend on `promo-share-workspace` and enable the
//! `native-shims` feature to get the service façade with the reqwest client
//! and in-memory secure store wired in, without naming each crate.

#[cfg(feature = "native-shims")]
pub use core_service::*;
