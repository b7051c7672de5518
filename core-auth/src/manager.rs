//! # Authentication Manager
//!
//! Per-session orchestrator for the LinkedIn authorization code flow.
//!
//! ## Overview
//!
//! `AuthManager` ties the [`OAuthFlowManager`] to the [`TokenStore`] and the
//! event bus. It covers the whole credential lifecycle of a browser session:
//!
//! - issuing the authorization redirect with a fresh state nonce
//! - validating the callback and exchanging the code
//! - handing out a usable access token, refreshing it when near expiry
//! - caching the member profile and dropping everything on logout or 401
//!
//! A session is only ever touched through its own [`SessionId`]; nothing is
//! shared between sessions.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{AuthManager, CallbackParams, SessionId};
//! # async fn example(manager: AuthManager) -> core_auth::Result<()> {
//! let session = SessionId::new();
//!
//! let url = manager.begin_authorization(session).await?;
//! // ... browser returns to the callback with ?code=...&state=...
//! # let params = CallbackParams::default();
//! manager.complete_authorization(session, params).await?;
//!
//! let access_token = manager.valid_access_token(session).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::token_store::TokenStore;
use crate::types::{AuthState, CallbackParams, SessionId, SessionStatus, UserProfile};
use bridge_traits::time::Clock;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER_NAME: &str = "linkedin";

/// Credential lifecycle for browser sessions.
pub struct AuthManager {
    oauth: OAuthFlowManager,
    token_store: TokenStore,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    /// Serializes refreshes per session so one expired token is refreshed once
    refresh_locks: Arc<Mutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
}

impl AuthManager {
    pub fn new(
        oauth: OAuthFlowManager,
        token_store: TokenStore,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            oauth,
            token_store,
            event_bus,
            clock,
            refresh_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Wire a manager from the core configuration.
    pub fn from_config(config: &CoreConfig, event_bus: EventBus) -> Self {
        let oauth = OAuthFlowManager::new(
            config.linkedin.clone(),
            config.http_client.clone(),
            config.request_timeout,
        );
        let token_store = TokenStore::new(config.secure_store.clone());
        Self::new(oauth, token_store, event_bus, config.clock.clone())
    }

    /// Start an authorization round trip.
    ///
    /// Generates and stores a new state nonce for the session (replacing any
    /// pending one) and returns the provider URL to redirect the browser to.
    #[instrument(skip(self), fields(session_id = %session))]
    pub async fn begin_authorization(&self, session: SessionId) -> Result<String> {
        let state = AuthState::generate(self.clock.unix_timestamp_millis());
        let url = self.oauth.build_auth_url(&state)?;
        self.token_store.store_state(session, &state).await?;

        self.emit(AuthEvent::AuthorizationStarted {
            session_id: session.to_string(),
            provider: PROVIDER_NAME.to_string(),
        });

        info!("Authorization redirect issued");
        Ok(url)
    }

    /// Handle the provider redirect back to the callback URL.
    ///
    /// The pending state is consumed first, whatever the outcome. Checks run
    /// in a fixed order: provider error, missing code, missing state, state
    /// mismatch. A pending state older than
    /// [`AUTH_STATE_TTL_MS`](crate::types::AUTH_STATE_TTL_MS) counts as
    /// absent. No request reaches the token endpoint unless all pass.
    #[instrument(skip(self, params), fields(session_id = %session))]
    pub async fn complete_authorization(
        &self,
        session: SessionId,
        params: CallbackParams,
    ) -> Result<()> {
        let now = self.clock.unix_timestamp_millis();
        let pending = match self.token_store.take_state(session).await? {
            Some(state) if state.is_expired(now) => {
                debug!(issued_at = state.issued_at, "Pending authorization state expired");
                None
            }
            other => other,
        };

        let result = self.verify_and_exchange(session, params, pending).await;
        if let Err(ref e) = result {
            warn!(error = %e, "Authorization callback failed");
            self.emit(AuthEvent::AuthError {
                session_id: Some(session.to_string()),
                message: e.to_string(),
                recoverable: true,
            });
        }
        result
    }

    async fn verify_and_exchange(
        &self,
        session: SessionId,
        params: CallbackParams,
        pending: Option<AuthState>,
    ) -> Result<()> {
        if let Some(error) = params.error {
            return Err(AuthError::ProviderDenied {
                error,
                description: params.error_description,
            });
        }
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;
        let returned_state = params
            .state
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingState)?;

        match pending {
            Some(expected) if expected.matches(&returned_state) => {}
            Some(_) => return Err(AuthError::StateMismatch),
            None => {
                debug!("Callback arrived without a pending authorization state");
                return Err(AuthError::StateMismatch);
            }
        }

        let tokens = self
            .oauth
            .exchange_code(&code, self.clock.unix_timestamp_millis())
            .await?;

        self.token_store.delete_profile(session).await?;
        self.token_store.store_tokens(session, &tokens).await?;

        self.emit(AuthEvent::SignedIn {
            session_id: session.to_string(),
            provider: PROVIDER_NAME.to_string(),
        });

        info!("Session signed in");
        Ok(())
    }

    /// Return an access token that is valid for at least five more minutes.
    ///
    /// Refreshes at most once per call. A failed or impossible refresh clears
    /// the session so the caller falls back to a new authorization.
    #[instrument(skip(self), fields(session_id = %session))]
    pub async fn valid_access_token(&self, session: SessionId) -> Result<String> {
        let refresh_lock = {
            let mut locks = self.refresh_locks.lock().await;
            locks
                .entry(session)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = refresh_lock.lock().await;

        let tokens = self
            .token_store
            .retrieve_tokens(session)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        let now = self.clock.unix_timestamp_millis();
        if !tokens.needs_refresh(now) {
            debug!(
                expires_in_ms = ?tokens.millis_until_expiry(now),
                "Access token still valid"
            );
            return Ok(tokens.access_token);
        }

        info!("Access token expired or expiring soon, refreshing");
        self.emit(AuthEvent::TokenRefreshing {
            session_id: session.to_string(),
        });

        let refresh_token = match tokens.refresh_token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                error!("No refresh token available");
                self.fail_session(session, &AuthError::NoRefreshToken).await;
                return Err(AuthError::NoRefreshToken);
            }
        };

        let refreshed = match self.oauth.refresh_access_token(&refresh_token, now).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                self.fail_session(session, &e).await;
                return Err(e);
            }
        };

        self.token_store.store_tokens(session, &refreshed).await?;

        self.emit(AuthEvent::TokenRefreshed {
            session_id: session.to_string(),
            expires_at: refreshed.expires_at,
        });

        info!("Token refreshed successfully");
        Ok(refreshed.access_token)
    }

    /// Member profile for the session, fetched once and then cached.
    ///
    /// A 401 from the identity endpoint clears the session.
    #[instrument(skip(self), fields(session_id = %session))]
    pub async fn user_profile(&self, session: SessionId) -> Result<UserProfile> {
        match self.token_store.retrieve_profile(session).await {
            Ok(Some(profile)) => return Ok(profile),
            Ok(None) => {}
            Err(AuthError::TokenCorrupted(_)) => debug!("Cached profile discarded"),
            Err(e) => return Err(e),
        }

        let access_token = self.valid_access_token(session).await?;

        let profile = match self.oauth.fetch_user_profile(&access_token).await {
            Ok(profile) => profile,
            Err(AuthError::Unauthorized) => {
                self.fail_session(session, &AuthError::Unauthorized).await;
                return Err(AuthError::Unauthorized);
            }
            Err(e) => return Err(e),
        };

        self.token_store.store_profile(session, &profile).await?;
        Ok(profile)
    }

    /// Drop all credentials of a session because the provider rejected them.
    pub async fn invalidate_session(&self, session: SessionId, reason: &AuthError) {
        warn!(session_id = %session, reason = %reason, "Invalidating session credentials");
        self.fail_session(session, reason).await;
    }

    #[instrument(skip(self), fields(session_id = %session))]
    pub async fn sign_out(&self, session: SessionId) -> Result<()> {
        self.token_store.clear_session(session).await?;
        self.refresh_locks.lock().await.remove(&session);

        self.emit(AuthEvent::SignedOut {
            session_id: session.to_string(),
        });

        info!("Session signed out");
        Ok(())
    }

    pub async fn status(&self, session: SessionId) -> Result<SessionStatus> {
        if self.token_store.has_tokens(session).await? {
            Ok(SessionStatus::SignedIn)
        } else if self.token_store.has_pending_state(session).await? {
            Ok(SessionStatus::AwaitingCallback)
        } else {
            Ok(SessionStatus::SignedOut)
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Delete pending authorization states whose round trip was abandoned.
    ///
    /// Returns how many were removed.
    pub async fn purge_expired_states(&self) -> Result<usize> {
        let purged = self
            .token_store
            .purge_expired_states(self.clock.unix_timestamp_millis())
            .await?;
        if purged > 0 {
            info!(purged, "Expired authorization states purged");
        }
        Ok(purged)
    }

    async fn fail_session(&self, session: SessionId, reason: &AuthError) {
        if let Err(e) = self.token_store.clear_session(session).await {
            warn!(session_id = %session, error = %e, "Failed to clear session credentials");
        }
        self.refresh_locks.lock().await.remove(&session);
        self.emit(AuthEvent::AuthError {
            session_id: Some(session.to_string()),
            message: reason.to_string(),
            recoverable: true,
        });
        self.emit(AuthEvent::SignedOut {
            session_id: session.to_string(),
        });
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}
