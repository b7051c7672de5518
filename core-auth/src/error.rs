use thiserror::Error;

/// Failures of the authorization flow and token lifecycle.
///
/// Every variant is terminal for the operation that produced it. Messages
/// never carry token material or raw provider bodies.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization denied by provider: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("Authorization callback is missing the code parameter")]
    MissingCode,

    #[error("Authorization callback is missing the state parameter")]
    MissingState,

    #[error("Authorization state does not match the pending request")]
    StateMismatch,

    #[error("Token exchange failed with status {status}")]
    ExchangeFailed { status: u16 },

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("No refresh token available; authorization is required")]
    NoRefreshToken,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Identity endpoint returned status {status}")]
    ProfileFetchFailed { status: u16 },

    #[error("Access token rejected by provider")]
    Unauthorized,

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Stored credentials are corrupted: {0}")]
    TokenCorrupted(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Whether the user must go through the authorization redirect again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated
                | AuthError::NoRefreshToken
                | AuthError::RefreshFailed(_)
                | AuthError::Unauthorized
                | AuthError::TokenCorrupted(_)
        )
    }

    /// Short machine-readable code used in the callback redirect.
    pub fn redirect_code(&self) -> &'static str {
        match self {
            AuthError::ProviderDenied { .. } => "auth_failed",
            AuthError::MissingCode => "no_code",
            AuthError::MissingState => "no_state",
            AuthError::StateMismatch => "state_mismatch",
            AuthError::ExchangeFailed { .. }
            | AuthError::InvalidResponse(_)
            | AuthError::NetworkError(_) => "token_exchange_failed",
            _ => "auth_failed",
        }
    }
}

impl From<bridge_traits::BridgeError> for AuthError {
    fn from(err: bridge_traits::BridgeError) -> Self {
        AuthError::NetworkError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_codes() {
        assert_eq!(
            AuthError::ProviderDenied {
                error: "user_cancelled_login".into(),
                description: None
            }
            .redirect_code(),
            "auth_failed"
        );
        assert_eq!(AuthError::MissingCode.redirect_code(), "no_code");
        assert_eq!(AuthError::MissingState.redirect_code(), "no_state");
        assert_eq!(AuthError::StateMismatch.redirect_code(), "state_mismatch");
        assert_eq!(
            AuthError::ExchangeFailed { status: 400 }.redirect_code(),
            "token_exchange_failed"
        );
    }

    #[test]
    fn test_requires_reauthorization() {
        assert!(AuthError::NoRefreshToken.requires_reauthorization());
        assert!(AuthError::RefreshFailed("400".into()).requires_reauthorization());
        assert!(AuthError::Unauthorized.requires_reauthorization());
        assert!(!AuthError::NetworkError("reset".into()).requires_reauthorization());
        assert!(!AuthError::StateMismatch.requires_reauthorization());
    }
}
