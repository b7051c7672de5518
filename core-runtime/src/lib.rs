//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the auth, provider and
//! service crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Nothing here talks to LinkedIn. The crate fixes how configuration is
//! validated, how logs are formatted and scrubbed, and how the flows announce
//! progress to subscribers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
