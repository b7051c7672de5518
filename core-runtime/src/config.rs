//! # Core Configuration Module
//!
//! Provides configuration management for the promo share core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding the provider settings and every bridge the core needs.
//! Validation is fail-fast: a missing client id or HTTP client is reported at
//! startup with an actionable message instead of surfacing on the first
//! authorization attempt.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - outbound provider calls (native default: reqwest)
//! - `SecureStore` - session-scoped credential persistence (native default: in-memory)
//!
//! ## Optional Dependencies
//!
//! - `Clock` - defaults to `SystemClock`
//!
//! When the `native-shims` feature is enabled, the native defaults for
//! `HttpClient` and `SecureStore` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, LinkedInSettings};
//!
//! let config = CoreConfig::builder()
//!     .linkedin(LinkedInSettings::from_env()?)
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `LINKEDIN_CLIENT_ID` | OAuth client id (required) |
//! | `LINKEDIN_CLIENT_SECRET` | OAuth client secret (required) |
//! | `APP_URL` | Public base URL; the redirect URI is `{APP_URL}/api/auth/linkedin/callback` |
//! | `LINKEDIN_SCOPES` | Space separated scopes (default `openid profile email w_member_social`) |

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, SecureStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const ENV_CLIENT_ID: &str = "LINKEDIN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "LINKEDIN_CLIENT_SECRET";
pub const ENV_APP_URL: &str = "APP_URL";
pub const ENV_SCOPES: &str = "LINKEDIN_SCOPES";

pub const LINKEDIN_AUTH_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
pub const LINKEDIN_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
pub const LINKEDIN_API_BASE_URL: &str = "https://api.linkedin.com/v2";
pub const LINKEDIN_USERINFO_URL: &str = "https://api.linkedin.com/v2/userinfo";
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile", "email", "w_member_social"];

/// Path the provider redirects back to, relative to `APP_URL`.
pub const CALLBACK_PATH: &str = "/api/auth/linkedin/callback";

// ============================================================================
// Provider settings
// ============================================================================

/// LinkedIn OAuth client registration and endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct LinkedInSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub userinfo_url: String,
}

impl LinkedInSettings {
    /// Settings with the production LinkedIn endpoints and default scopes.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: LINKEDIN_AUTH_URL.to_string(),
            token_url: LINKEDIN_TOKEN_URL.to_string(),
            api_base_url: LINKEDIN_API_BASE_URL.to_string(),
            userinfo_url: LINKEDIN_USERINFO_URL.to_string(),
        }
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} must be set", key)))
        };

        let client_id = required(ENV_CLIENT_ID)?;
        let client_secret = required(ENV_CLIENT_SECRET)?;
        let app_url = required(ENV_APP_URL)?;
        let redirect_uri = format!("{}{}", app_url.trim_end_matches('/'), CALLBACK_PATH);

        let mut settings = Self::new(client_id, client_secret, redirect_uri);
        if let Some(scopes) = lookup(ENV_SCOPES).filter(|s| !s.trim().is_empty()) {
            settings.scopes = scopes.split_whitespace().map(str::to_string).collect();
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Points every endpoint at `base` (used to target a local stub server).
    pub fn with_endpoint_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{}/oauth/v2/authorization", base);
        self.token_url = format!("{}/oauth/v2/accessToken", base);
        self.api_base_url = format!("{}/v2", base);
        self.userinfo_url = format!("{}/v2/userinfo", base);
        self
    }

    /// Scopes joined the way the authorization endpoint expects them.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("LinkedIn client id cannot be empty".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::Config(
                "LinkedIn client secret cannot be empty".to_string(),
            ));
        }
        if self.scopes.is_empty() {
            return Err(Error::Config(
                "At least one OAuth scope is required".to_string(),
            ));
        }

        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("api_base_url", &self.api_base_url),
            ("userinfo_url", &self.userinfo_url),
        ] {
            let parsed = Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, value, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{} must use http or https, got '{}'",
                    name,
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for LinkedInSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedInSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

/// Fixed content attached to every published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareSettings {
    /// Title of the media entry in the post
    pub media_title: String,
    /// Description of the media entry in the post
    pub media_description: String,
    /// Prefix for the public post URL; the post id and a trailing `/` are appended
    pub permalink_base: String,
    /// Upper bound on the decoded image size
    pub max_image_bytes: usize,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            media_title: "HSR Founders Club Event".to_string(),
            media_description: "The AfterParty 2025".to_string(),
            permalink_base: "https://www.linkedin.com/feed/update/".to_string(),
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ShareSettings {
    pub fn permalink(&self, post_id: &str) -> String {
        format!("{}{}/", self.permalink_base, post_id)
    }
}

// ============================================================================
// Core configuration
// ============================================================================

/// Core configuration for the promo share core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// OAuth client registration and endpoints
    pub linkedin: LinkedInSettings,

    /// Fixed post content
    pub share: ShareSettings,

    /// HTTP client for provider calls
    pub http_client: Arc<dyn HttpClient>,

    /// Session-scoped credential storage
    pub secure_store: Arc<dyn SecureStore>,

    /// Time source for token expiry checks
    pub clock: Arc<dyn Clock>,

    /// Timeout applied to every outbound request
    pub request_timeout: Duration,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("linkedin", &self.linkedin)
            .field("share", &self.share)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("clock", &"Clock { ... }")
            .field("request_timeout", &self.request_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.linkedin.validate()?;

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 300 seconds".to_string(),
            ));
        }
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }
        if self.share.max_image_bytes == 0 {
            return Err(Error::Config(
                "Maximum image size must be greater than zero".to_string(),
            ));
        }
        if Url::parse(&self.share.permalink_base).is_err() {
            return Err(Error::Config(format!(
                "Invalid permalink base '{}'",
                self.share.permalink_base
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "native-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient implementation is required for provider calls. \
                 Enable the 'native-shims' feature to use the default ReqwestHttpClient \
                 or inject an adapter with .http_client()."
            .to_string(),
    })
}

#[cfg(feature = "native-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    let client = bridge_native::ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to build default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "native-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "A SecureStore implementation is required for session credentials. \
                 Enable the 'native-shims' feature to use the default MemorySecureStore \
                 or inject a store with .secure_store()."
            .to_string(),
    })
}

#[cfg(feature = "native-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Ok(Arc::new(bridge_native::MemorySecureStore::new()))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    linkedin: Option<LinkedInSettings>,
    share: Option<ShareSettings>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    clock: Option<Arc<dyn Clock>>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the LinkedIn OAuth settings (required).
    pub fn linkedin(mut self, settings: LinkedInSettings) -> Self {
        self.linkedin = Some(settings);
        self
    }

    /// Overrides the fixed post content.
    pub fn share(mut self, settings: ShareSettings) -> Self {
        self.share = Some(settings);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based default is used when the
    /// `native-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Timeout for every outbound request. Default: 30 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn build(self) -> Result<CoreConfig> {
        let linkedin = self.linkedin.ok_or_else(|| {
            Error::Config(
                "LinkedIn settings are required. Use .linkedin() or LinkedInSettings::from_env()."
                    .to_string(),
            )
        })?;

        let request_timeout = self
            .request_timeout
            .unwrap_or(bridge_traits::http::DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let config = CoreConfig {
            linkedin,
            share: self.share.unwrap_or_default(),
            http_client,
            secure_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            request_timeout,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse};
    use std::collections::HashMap;

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Ok(HttpResponse::new(200, ""))
        }
    }

    struct MockSecureStore;

    #[async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(
            &self,
            _key: &str,
            _value: &[u8],
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_secret(
            &self,
            _key: &str,
        ) -> std::result::Result<Option<Vec<u8>>, BridgeError> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }
    }

    fn settings() -> LinkedInSettings {
        LinkedInSettings::new(
            "client-id",
            "client-secret",
            "https://promo.example.com/api/auth/linkedin/callback",
        )
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_settings_defaults() {
        let s = settings();
        assert_eq!(s.auth_url, LINKEDIN_AUTH_URL);
        assert_eq!(s.token_url, LINKEDIN_TOKEN_URL);
        assert_eq!(s.scope_string(), "openid profile email w_member_social");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_builds_redirect_uri() {
        let s = LinkedInSettings::from_lookup(env(&[
            (ENV_CLIENT_ID, "id"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_APP_URL, "https://promo.example.com/"),
        ]))
        .unwrap();

        assert_eq!(
            s.redirect_uri,
            "https://promo.example.com/api/auth/linkedin/callback"
        );
    }

    #[test]
    fn test_from_lookup_custom_scopes() {
        let s = LinkedInSettings::from_lookup(env(&[
            (ENV_CLIENT_ID, "id"),
            (ENV_CLIENT_SECRET, "secret"),
            (ENV_APP_URL, "http://localhost:3000"),
            (ENV_SCOPES, "openid  w_member_social"),
        ]))
        .unwrap();

        assert_eq!(s.scopes, vec!["openid", "w_member_social"]);
    }

    #[test]
    fn test_from_lookup_requires_client_secret() {
        let err = LinkedInSettings::from_lookup(env(&[
            (ENV_CLIENT_ID, "id"),
            (ENV_APP_URL, "http://localhost:3000"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains(ENV_CLIENT_SECRET));
    }

    #[test]
    fn test_validate_rejects_bad_redirect() {
        let mut s = settings();
        s.redirect_uri = "not a url".to_string();
        assert!(matches!(s.validate(), Err(Error::Config(_))));

        s.redirect_uri = "ftp://example.com/cb".to_string();
        assert!(matches!(s.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let debug = format!("{:?}", settings());
        assert!(!debug.contains("client-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_endpoint_base_override() {
        let s = settings().with_endpoint_base("http://127.0.0.1:8080/");
        assert_eq!(s.token_url, "http://127.0.0.1:8080/oauth/v2/accessToken");
        assert_eq!(s.userinfo_url, "http://127.0.0.1:8080/v2/userinfo");
    }

    #[test]
    fn test_permalink() {
        assert_eq!(
            ShareSettings::default().permalink("urn:li:share:123"),
            "https://www.linkedin.com/feed/update/urn:li:share:123/"
        );
    }

    #[test]
    fn test_builder_requires_linkedin_settings() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .secure_store(Arc::new(MockSecureStore))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = CoreConfig::builder()
            .linkedin(settings())
            .http_client(Arc::new(MockHttpClient))
            .secure_store(Arc::new(MockSecureStore))
            .build()
            .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.share, ShareSettings::default());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = CoreConfig::builder()
            .linkedin(settings())
            .http_client(Arc::new(MockHttpClient))
            .secure_store(Arc::new(MockSecureStore))
            .request_timeout(Duration::ZERO)
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[cfg(not(feature = "native-shims"))]
    #[test]
    fn test_builder_requires_http_client_without_shims() {
        let result = CoreConfig::builder()
            .linkedin(settings())
            .secure_store(Arc::new(MockSecureStore))
            .build();

        assert!(matches!(result, Err(Error::CapabilityMissing { .. })));
    }

    #[cfg(feature = "native-shims")]
    #[tokio::test]
    async fn test_build_with_native_defaults() {
        let config = CoreConfig::builder().linkedin(settings()).build().unwrap();
        assert!(config
            .secure_store
            .get_secret("missing")
            .await
            .unwrap()
            .is_none());
    }
}
