//! # Native Bridge Implementations
//!
//! Default implementations of bridge traits for a native server process.
//!
//! - `HttpClient` using `reqwest` (rustls, 30 s timeout, retry only for idempotent methods)
//! - `SecureStore` using an in-process `tokio::sync::RwLock` map
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_native::{MemorySecureStore, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let secure_store = Arc::new(MemorySecureStore::new());
//! ```

mod http;
mod secure_store;

pub use http::ReqwestHttpClient;
pub use secure_store::MemorySecureStore;
