use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Tokens are considered stale this long before their nominal expiry.
pub const TOKEN_REFRESH_BUFFER_MS: i64 = 5 * 60 * 1000;

/// A pending authorization state older than this is rejected and swept.
pub const AUTH_STATE_TTL_MS: i64 = 10 * 60 * 1000;

/// Number of random bytes behind an authorization state nonce.
const STATE_NONCE_BYTES: usize = 16;

/// Unique identifier for a browser session.
///
/// Every token set, cached profile and pending authorization state is owned by
/// exactly one session; sessions never share credentials.
///
/// # Examples
///
/// ```
/// use core_auth::SessionId;
///
/// let session = SessionId::new();
/// let parsed = SessionId::from_string(&session.to_string()).unwrap();
/// assert_eq!(session, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session ID from its string form
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// CSRF nonce for one authorization round trip.
///
/// Generated when the redirect is issued, stored for the session and consumed
/// exactly once by the callback.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    value: String,
    /// When the nonce was issued (Unix epoch milliseconds)
    pub issued_at: i64,
}

impl AuthState {
    /// Generate a fresh random nonce.
    pub fn generate(issued_at: i64) -> Self {
        let mut bytes = [0u8; STATE_NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            value: URL_SAFE_NO_PAD.encode(bytes),
            issued_at,
        }
    }

    /// Wrap an existing nonce value.
    pub fn from_value(value: impl Into<String>, issued_at: i64) -> Self {
        Self {
            value: value.into(),
            issued_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the round trip has outlived [`AUTH_STATE_TTL_MS`].
    pub fn is_expired(&self, now_millis: i64) -> bool {
        now_millis - self.issued_at >= AUTH_STATE_TTL_MS
    }

    /// Compare against the `state` returned by the provider.
    ///
    /// The comparison time does not depend on where the values differ.
    pub fn matches(&self, returned: &str) -> bool {
        let expected = self.value.as_bytes();
        let actual = returned.as_bytes();
        if expected.len() != actual.len() {
            return false;
        }
        expected
            .iter()
            .zip(actual)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// OAuth 2.0 token set owned by one session.
///
/// Replaced whole on code exchange or refresh; never partially updated.
///
/// # Security
///
/// The `Debug` implementation redacts both tokens.
///
/// # Examples
///
/// ```
/// use core_auth::TokenSet;
///
/// let now = 1_700_000_000_000;
/// let tokens = TokenSet::from_grant("access".into(), Some("refresh".into()), 3600, now);
///
/// assert!(!tokens.needs_refresh(now));
/// assert!(tokens.needs_refresh(now + 3_300_000));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token, when the provider issued one
    pub refresh_token: Option<String>,
    /// When the access token expires (Unix epoch milliseconds)
    pub expires_at: i64,
}

impl TokenSet {
    /// Build a token set from a token endpoint grant.
    ///
    /// `expires_in` is in seconds, as returned by the provider.
    pub fn from_grant(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        now_millis: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now_millis.saturating_add(expires_in.saturating_mul(1000)),
        }
    }

    /// Whether the access token must be refreshed before use.
    ///
    /// True from five minutes before expiry onwards.
    pub fn needs_refresh(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at - TOKEN_REFRESH_BUFFER_MS
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }

    /// Milliseconds until expiry, or `None` once expired.
    pub fn millis_until_expiry(&self, now_millis: i64) -> Option<i64> {
        let remaining = self.expires_at - now_millis;
        (remaining > 0).then_some(remaining)
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Member identity from the OpenID Connect userinfo endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Member id; the author URN is derived from it
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<serde_json::Value>,
}

impl UserProfile {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            given_name: None,
            family_name: None,
            picture: None,
            email: None,
            email_verified: None,
            locale: None,
        }
    }

    /// `urn:li:person:{sub}`
    pub fn person_urn(&self) -> String {
        format!("urn:li:person:{}", self.sub)
    }

    /// Name to greet the member with.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.given_name.as_deref())
            .unwrap_or(&self.sub)
    }
}

impl fmt::Debug for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserProfile")
            .field("sub", &self.sub)
            .field("name", &self.name)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Query parameters of the provider redirect back to the callback URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Authorization status of a session.
///
/// ```text
/// SignedOut -> AwaitingCallback -> SignedIn
///     ^                               |
///     +-------------------------------+  (logout, refresh failure, 401)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionStatus {
    #[default]
    SignedOut,
    AwaitingCallback,
    SignedIn,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::SignedIn)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::SignedOut => write!(f, "Signed Out"),
            SessionStatus::AwaitingCallback => write!(f, "Awaiting Callback"),
            SessionStatus::SignedIn => write!(f, "Signed In"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_session_id_creation() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_session_id_from_string() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = SessionId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert!(SessionId::from_string("invalid-uuid").is_err());
    }

    #[test]
    fn test_auth_state_is_random_and_url_safe() {
        let a = AuthState::generate(NOW);
        let b = AuthState::generate(NOW);

        assert_ne!(a.value(), b.value());
        assert_eq!(a.value().len(), 22);
        assert!(a
            .value()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_auth_state_matches() {
        let state = AuthState::from_value("xyz", NOW);
        assert!(state.matches("xyz"));
        assert!(!state.matches("xyw"));
        assert!(!state.matches("xy"));
        assert!(!state.matches(""));
    }

    #[test]
    fn test_auth_state_expiry() {
        let state = AuthState::from_value("xyz", NOW);
        assert!(!state.is_expired(NOW));
        assert!(!state.is_expired(NOW + AUTH_STATE_TTL_MS - 1));
        assert!(state.is_expired(NOW + AUTH_STATE_TTL_MS));
    }

    #[test]
    fn test_auth_state_debug_redacts_value() {
        let state = AuthState::from_value("nonce-value", NOW);
        assert!(!format!("{:?}", state).contains("nonce-value"));
    }

    #[test]
    fn test_token_set_from_grant() {
        let tokens = TokenSet::from_grant("a".into(), Some("r".into()), 3600, NOW);
        assert_eq!(tokens.expires_at, NOW + 3_600_000);
        assert!(tokens.has_refresh_token());
        assert_eq!(tokens.millis_until_expiry(NOW), Some(3_600_000));
    }

    #[test]
    fn test_token_set_refresh_threshold() {
        let tokens = TokenSet::from_grant("a".into(), None, 3600, NOW);

        assert!(!tokens.needs_refresh(NOW));
        assert!(!tokens.needs_refresh(tokens.expires_at - TOKEN_REFRESH_BUFFER_MS - 1));
        assert!(tokens.needs_refresh(tokens.expires_at - TOKEN_REFRESH_BUFFER_MS));
        assert!(tokens.needs_refresh(tokens.expires_at + 1));
    }

    #[test]
    fn test_token_set_already_expired() {
        let tokens = TokenSet {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: NOW - 1000,
        };
        assert!(tokens.needs_refresh(NOW));
        assert_eq!(tokens.millis_until_expiry(NOW), None);
    }

    #[test]
    fn test_empty_refresh_token_is_absent() {
        let tokens = TokenSet::from_grant("a".into(), Some(String::new()), 60, NOW);
        assert!(!tokens.has_refresh_token());
    }

    #[test]
    fn test_token_set_debug_redacts() {
        let tokens = TokenSet::from_grant("AQX-secret".into(), Some("RT-secret".into()), 60, NOW);
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("AQX-secret"));
        assert!(!debug.contains("RT-secret"));
    }

    #[test]
    fn test_user_profile_from_userinfo() {
        let json = r#"{
            "sub": "782bbtaQ",
            "name": "Ada Lovelace",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://media.licdn.com/ada.jpg",
            "locale": {"country": "US", "language": "en"},
            "email": "ada@example.com",
            "email_verified": true
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.person_urn(), "urn:li:person:782bbtaQ");
        assert_eq!(profile.display_name(), "Ada Lovelace");
        assert!(!format!("{:?}", profile).contains("ada@example.com"));
    }

    #[test]
    fn test_user_profile_minimal() {
        let profile: UserProfile = serde_json::from_str(r#"{"sub":"abc"}"#).unwrap();
        assert_eq!(profile.display_name(), "abc");
    }

    #[test]
    fn test_session_status() {
        assert!(!SessionStatus::default().is_authenticated());
        assert!(SessionStatus::SignedIn.is_authenticated());
        assert_eq!(SessionStatus::AwaitingCallback.to_string(), "Awaiting Callback");
    }
}
