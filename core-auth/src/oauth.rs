//! OAuth 2.0 Authorization Code Flow against LinkedIn
//!
//! Implements the confidential-client variant of RFC 6749: the client secret
//! is sent on the back channel, so no PKCE verifier is involved.
//!
//! # Overview
//!
//! The flow manager handles:
//! - Building the authorization URL carrying the state nonce
//! - Exchanging an authorization code for a [`TokenSet`]
//! - Refreshing an access token (one attempt, never retried)
//! - Fetching the member identity from the userinfo endpoint
//!
//! # Security
//!
//! - Tokens, codes and the client secret never appear in logs or errors
//! - Provider error bodies are logged only after `redact_secrets`
//!
//! # Example
//!
//! ```no_run
//! use core_auth::{AuthState, OAuthFlowManager};
//! use core_runtime::config::LinkedInSettings;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let settings = LinkedInSettings::new(
//!     "client-id",
//!     "client-secret",
//!     "http://localhost:3000/api/auth/linkedin/callback",
//! );
//! let flow = OAuthFlowManager::new(settings, http_client, Duration::from_secs(30));
//!
//! let state = AuthState::generate(0);
//! let url = flow.build_auth_url(&state)?;
//! // Redirect the browser to `url`, then on callback:
//! let tokens = flow.exchange_code("code-from-callback", 0).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::{AuthState, TokenSet, UserProfile};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_runtime::config::LinkedInSettings;
use core_runtime::logging::redact_secrets;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Drives the authorization code grant and identity lookup.
pub struct OAuthFlowManager {
    settings: LinkedInSettings,
    http_client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl OAuthFlowManager {
    pub fn new(
        settings: LinkedInSettings,
        http_client: Arc<dyn HttpClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            settings,
            http_client,
            timeout,
        }
    }

    pub fn settings(&self) -> &LinkedInSettings {
        &self.settings
    }

    /// Build the URL the browser is redirected to.
    ///
    /// Carries `response_type=code`, the client id, the registered redirect
    /// URI, the space-separated scopes and the state nonce.
    #[instrument(skip(self, state))]
    pub fn build_auth_url(&self, state: &AuthState) -> Result<String> {
        let mut url = Url::parse(&self.settings.auth_url)
            .map_err(|e| AuthError::InvalidResponse(format!("Invalid authorization URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("scope", &self.settings.scope_string())
            .append_pair("state", state.value());

        debug!(scopes = %self.settings.scope_string(), "Built authorization URL");
        Ok(url.into())
    }

    /// Exchange an authorization code for a token set.
    ///
    /// The caller must have verified the callback state before calling this.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str, now_millis: i64) -> Result<TokenSet> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self.post_token_form(&params).await.map_err(|e| {
            warn!(error = %e, "Token exchange request did not complete");
            e
        })?;

        if !response.is_success() {
            warn!(
                status = response.status,
                body = %response_excerpt(&response),
                "Token exchange rejected by provider"
            );
            return Err(AuthError::ExchangeFailed {
                status: response.status,
            });
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            warn!(error = %e, "Token exchange response could not be parsed");
            AuthError::InvalidResponse(e.to_string())
        })?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(token_response.into_token_set(None, now_millis))
    }

    /// Trade a refresh token for a new token set.
    ///
    /// Makes exactly one request. When the provider omits a new refresh
    /// token, the one passed in is carried over.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        now_millis: i64,
    ) -> Result<TokenSet> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        debug!("Refreshing access token");

        let response = self.post_token_form(&params).await.map_err(|e| {
            warn!(error = %e, "Token refresh request did not complete");
            AuthError::RefreshFailed(e.to_string())
        })?;

        if !response.is_success() {
            warn!(
                status = response.status,
                body = %response_excerpt(&response),
                "Token refresh rejected by provider"
            );
            return Err(AuthError::RefreshFailed(format!(
                "token endpoint returned {}",
                response.status
            )));
        }

        let token_response: TokenResponse = response.json().map_err(|e| {
            warn!(error = %e, "Token refresh response could not be parsed");
            AuthError::RefreshFailed(format!("unreadable token response: {}", e))
        })?;

        info!(
            expires_in = token_response.expires_in,
            rotated = token_response.refresh_token.is_some(),
            "Refreshed access token"
        );

        Ok(token_response.into_token_set(Some(refresh_token), now_millis))
    }

    /// Fetch the member identity for an access token.
    ///
    /// This is a read, so a transport failure or 5xx is retried once.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_user_profile(&self, access_token: &str) -> Result<UserProfile> {
        let request = HttpRequest::new(HttpMethod::Get, self.settings.userinfo_url.clone())
            .bearer_token(access_token)
            .timeout(self.timeout);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::single_retry())
            .await
            .map_err(|e| {
                warn!(error = %e, "Userinfo request did not complete");
                AuthError::NetworkError(e.to_string())
            })?;

        if response.status == 401 {
            warn!("Userinfo endpoint rejected the access token");
            return Err(AuthError::Unauthorized);
        }

        if !response.is_success() {
            warn!(
                status = response.status,
                body = %response_excerpt(&response),
                "Userinfo request failed"
            );
            return Err(AuthError::ProfileFetchFailed {
                status: response.status,
            });
        }

        let profile: UserProfile = response.json().map_err(|e| {
            warn!(error = %e, "Userinfo response could not be parsed");
            AuthError::InvalidResponse(e.to_string())
        })?;

        debug!(sub = %profile.sub, "Fetched member profile");
        Ok(profile)
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> Result<HttpResponse> {
        let request = HttpRequest::new(HttpMethod::Post, self.settings.token_url.clone())
            .form(params)
            .map_err(|e| AuthError::SerializationFailed(e.to_string()))?
            .timeout(self.timeout);

        // Token grants are single-use; a POST here is never replayed.
        Ok(self.http_client.execute(request).await?)
    }
}

fn response_excerpt(response: &HttpResponse) -> String {
    response
        .text()
        .map(|body| redact_secrets(&body))
        .unwrap_or_else(|_| "<non-utf8 body>".to_string())
}

/// Token endpoint response body.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self, previous_refresh: Option<&str>, now_millis: i64) -> TokenSet {
        let refresh_token = self
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| previous_refresh.map(str::to_string));
        TokenSet::from_grant(self.access_token, refresh_token, self.expires_in, now_millis)
    }
}

fn default_expires_in() -> i64 {
    3600
}
