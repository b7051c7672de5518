//! # Authentication Module
//!
//! LinkedIn OAuth 2.0 authorization code flow for browser sessions.
//!
//! ## Overview
//!
//! This crate owns the credential lifecycle of a session: issuing the
//! authorization redirect, validating the callback, exchanging the code,
//! refreshing the access token near expiry and caching the member profile.
//! Credentials are kept per [`SessionId`] through the `SecureStore` bridge.
//!
//! ## Features
//!
//! - Single-use CSRF state nonce per authorization round trip
//! - Refresh five minutes before expiry, one attempt per call
//! - Session cleared on refresh failure or identity 401
//! - Auth state event emission

pub mod error;
pub mod manager;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use manager::AuthManager;
pub use oauth::OAuthFlowManager;
pub use token_store::TokenStore;
pub use types::{
    AuthState, CallbackParams, SessionId, SessionStatus, TokenSet, UserProfile,
    AUTH_STATE_TTL_MS, TOKEN_REFRESH_BUFFER_MS,
};
