use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use core_service::{AuthError, CoreError};
use serde_json::json;

use crate::routes::AUTHORIZE_PATH;

pub(crate) const SHARE_FAILED: &str = "Failed to share on LinkedIn. Please try again.";
pub(crate) const PROFILE_FAILED: &str = "Failed to load the LinkedIn profile. Please try again.";

/// Errors returned by the JSON endpoints.
///
/// Provider details are logged where they happen; clients only see the
/// generic message.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    /// No usable LinkedIn credentials for the session.
    #[error("Please connect your LinkedIn account")]
    Unauthorized,

    #[error("A share is already in progress")]
    Conflict,

    #[error("{0}")]
    BadRequest(String),

    /// LinkedIn rejected or failed the request.
    #[error("{0}")]
    Upstream(&'static str),

    #[error("Internal error")]
    Internal,
}

impl ApiError {
    /// Classify a service failure; `upstream` is the message shown when the
    /// provider is at fault.
    pub(crate) fn from_core(err: CoreError, upstream: &'static str) -> Self {
        if err.is_invalid_input() {
            return Self::BadRequest(err.to_string());
        }
        match err {
            CoreError::ReauthorizationRequired => Self::Unauthorized,
            CoreError::PublishInProgress => Self::Conflict,
            CoreError::Publish(_) => Self::Upstream(upstream),
            CoreError::Auth(
                AuthError::ProfileFetchFailed { .. }
                | AuthError::NetworkError(_)
                | AuthError::InvalidResponse(_),
            ) => Self::Upstream(upstream),
            other => {
                tracing::error!(error = %other, "Request failed");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": message, "authorizeUrl": AUTHORIZE_PATH })),
            )
                .into_response(),
            Self::Conflict => {
                (StatusCode::CONFLICT, Json(json!({ "error": message }))).into_response()
            }
            Self::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::Upstream(_) => {
                (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))).into_response()
            }
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response(),
        }
    }
}
