//! # Host Bridge Traits
//!
//! Capability traits the core crates depend on instead of concrete I/O.
//!
//! ## Overview
//!
//! The OAuth and publishing logic never talks to the network, the secret store
//! or the wall clock directly. Each of those is a trait defined here and
//! injected at construction time, which keeps the core deterministic under test
//! and lets a deployment swap backends without touching it.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with timeouts and opt-in retry for idempotent calls
//! - [`SecureStore`](storage::SecureStore) - Session-scoped credential persistence
//! - [`Clock`](time::Clock) - Time source for deterministic token expiry checks
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to an external pipeline
//!
//! ## Implementations
//!
//! | Backend | Implementation Crate |
//! |---------|----------------------|
//! | Native server | `bridge-native` (reqwest, in-memory store) |
//! | Tests | stubs and `mockall` mocks in each crate |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Enable the `native-shims` feature or inject an adapter.".to_string()
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across request handlers.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::SecureStore;
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
