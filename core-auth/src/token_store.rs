//! Session Token Storage
//!
//! Persists everything a session owns through the `SecureStore` bridge:
//! the [`TokenSet`], the cached [`UserProfile`] and the pending [`AuthState`].
//!
//! ## Security Features
//!
//! - Token values are never logged or placed in error messages
//! - Corrupted entries are deleted on read and reported as `TokenCorrupted`
//! - The authorization state is single-use: reading it removes it
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{SessionId, TokenSet, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//! let session = SessionId::new();
//!
//! let tokens = TokenSet::from_grant("access".into(), Some("refresh".into()), 3600, 0);
//! token_store.store_tokens(session, &tokens).await?;
//!
//! let retrieved = token_store.retrieve_tokens(session).await?;
//! token_store.clear_session(session).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{AuthState, SessionId, TokenSet, UserProfile};
use bridge_traits::storage::SecureStore;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TOKENS_PREFIX: &str = "linkedin:tokens:";
const PROFILE_PREFIX: &str = "linkedin:profile:";
const STATE_PREFIX: &str = "linkedin:state:";

/// Per-session credential storage on top of a [`SecureStore`].
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing TokenStore");
        Self { secure_store }
    }

    // ------------------------------------------------------------------
    // Token set
    // ------------------------------------------------------------------

    /// Store the token set for a session, replacing any previous one.
    pub async fn store_tokens(&self, session: SessionId, tokens: &TokenSet) -> Result<()> {
        self.write(&tokens_key(session), tokens, session).await?;

        info!(
            session_id = %session,
            has_refresh_token = tokens.has_refresh_token(),
            expires_at = tokens.expires_at,
            "Tokens stored"
        );
        Ok(())
    }

    /// Retrieve the token set for a session.
    ///
    /// Returns `Ok(None)` if the session never completed authorization or was
    /// cleared. Corrupted data is deleted and reported as `TokenCorrupted`.
    pub async fn retrieve_tokens(&self, session: SessionId) -> Result<Option<TokenSet>> {
        self.read(&tokens_key(session), session).await
    }

    pub async fn delete_tokens(&self, session: SessionId) -> Result<()> {
        self.delete(&tokens_key(session), session).await
    }

    pub async fn has_tokens(&self, session: SessionId) -> Result<bool> {
        self.secure_store
            .has_secret(&tokens_key(session))
            .await
            .map_err(|e| {
                warn!(session_id = %session, error = %e, "Failed to check token existence");
                AuthError::SecureStorageUnavailable(e.to_string())
            })
    }

    // ------------------------------------------------------------------
    // Cached profile
    // ------------------------------------------------------------------

    pub async fn store_profile(&self, session: SessionId, profile: &UserProfile) -> Result<()> {
        self.write(&profile_key(session), profile, session).await?;
        debug!(session_id = %session, "Profile cached");
        Ok(())
    }

    pub async fn retrieve_profile(&self, session: SessionId) -> Result<Option<UserProfile>> {
        self.read(&profile_key(session), session).await
    }

    pub async fn delete_profile(&self, session: SessionId) -> Result<()> {
        self.delete(&profile_key(session), session).await
    }

    // ------------------------------------------------------------------
    // Pending authorization state
    // ------------------------------------------------------------------

    /// Remember the state nonce of an authorization redirect.
    ///
    /// A newer redirect for the same session replaces the older nonce.
    pub async fn store_state(&self, session: SessionId, state: &AuthState) -> Result<()> {
        self.write(&state_key(session), state, session).await?;
        debug!(session_id = %session, "Authorization state stored");
        Ok(())
    }

    /// Remove and return the pending state nonce.
    ///
    /// The nonce is gone after this call whatever the caller does with it, so
    /// a callback can never be replayed against the same state.
    pub async fn take_state(&self, session: SessionId) -> Result<Option<AuthState>> {
        let data = self
            .secure_store
            .take_secret(&state_key(session))
            .await
            .map_err(|e| {
                warn!(session_id = %session, error = %e, "Failed to take authorization state");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(data) = data else {
            return Ok(None);
        };

        match serde_json::from_slice(&data) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(session_id = %session, error = %e, "Discarding unreadable authorization state");
                Ok(None)
            }
        }
    }

    pub async fn has_pending_state(&self, session: SessionId) -> Result<bool> {
        self.secure_store
            .has_secret(&state_key(session))
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }

    /// Delete every pending state that has expired at `now_millis`.
    ///
    /// Unreadable state entries are deleted too. Returns the number removed.
    pub async fn purge_expired_states(&self, now_millis: i64) -> Result<usize> {
        let keys = self.secure_store.list_keys().await.map_err(|e| {
            warn!(error = %e, "Failed to list keys from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let mut purged = 0;
        for key in keys.iter().filter(|key| key.starts_with(STATE_PREFIX)) {
            let data = self.secure_store.get_secret(key).await.map_err(|e| {
                warn!(error = %e, "Failed to read authorization state");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;
            let Some(data) = data else {
                continue;
            };

            let expired = serde_json::from_slice::<AuthState>(&data)
                .map(|state| state.is_expired(now_millis))
                .unwrap_or(true);
            if expired {
                self.secure_store.delete_secret(key).await.map_err(|e| {
                    warn!(error = %e, "Failed to delete authorization state");
                    AuthError::SecureStorageUnavailable(e.to_string())
                })?;
                purged += 1;
            }
        }

        debug!(purged, "Swept pending authorization states");
        Ok(purged)
    }

    // ------------------------------------------------------------------
    // Whole session
    // ------------------------------------------------------------------

    /// Delete tokens, cached profile and any pending state for a session.
    pub async fn clear_session(&self, session: SessionId) -> Result<()> {
        self.delete(&tokens_key(session), session).await?;
        self.delete(&profile_key(session), session).await?;
        self.delete(&state_key(session), session).await?;

        info!(session_id = %session, "Session credentials cleared");
        Ok(())
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, session: SessionId) -> Result<()> {
        let json = serde_json::to_vec(value).map_err(|e| {
            warn!(session_id = %session, error = %e, "Failed to serialize session data");
            AuthError::SerializationFailed(e.to_string())
        })?;

        self.secure_store.set_secret(key, &json).await.map_err(|e| {
            warn!(session_id = %session, error = %e, "Failed to write secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }

    async fn read<T: DeserializeOwned>(&self, key: &str, session: SessionId) -> Result<Option<T>> {
        let data = self.secure_store.get_secret(key).await.map_err(|e| {
            warn!(session_id = %session, error = %e, "Failed to read secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            return Ok(None);
        };

        match serde_json::from_slice(&data) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    session_id = %session,
                    error = %e,
                    "Stored session data is corrupted, deleting it"
                );
                if let Err(delete_err) = self.secure_store.delete_secret(key).await {
                    warn!(
                        session_id = %session,
                        error = %delete_err,
                        "Failed to delete corrupted session data"
                    );
                }
                Err(AuthError::TokenCorrupted(e.to_string()))
            }
        }
    }

    async fn delete(&self, key: &str, session: SessionId) -> Result<()> {
        self.secure_store.delete_secret(key).await.map_err(|e| {
            warn!(session_id = %session, error = %e, "Failed to delete from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }
}

fn tokens_key(session: SessionId) -> String {
    format!("{}{}", TOKENS_PREFIX, session)
}

fn profile_key(session: SessionId) -> String {
    format!("{}{}", PROFILE_PREFIX, session)
}

fn state_key(session: SessionId) -> String {
    format!("{}{}", STATE_PREFIX, session)
}
