//! # LinkedIn Provider
//!
//! Publishes a single-image post on behalf of a member through the v2 API.
//!
//! ## Overview
//!
//! This crate provides:
//! - Register upload, binary upload and UGC post calls (`LinkedInConnector`)
//! - The strictly ordered publish sequence (`MediaPublisher`)
//! - Wire types for the assets and ugcPosts endpoints
//!
//! Access tokens are supplied by the caller; this crate never refreshes them.

pub mod connector;
pub mod error;
pub mod publisher;
pub mod types;

pub use connector::LinkedInConnector;
pub use error::{PublishError, Result};
pub use publisher::{MediaPublisher, PublishRequest, PublishStep};
pub use types::{MediaText, PromoPayload, PublishedPost, UploadAsset};
