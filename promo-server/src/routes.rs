use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use core_service::{CallbackParams, CoreError, SessionId, ShareRequest, UserProfile};
use serde::Serialize;

use crate::cookies;
use crate::error::{ApiError, PROFILE_FAILED, SHARE_FAILED};
use crate::state::AppState;

pub(crate) const AUTHORIZE_PATH: &str = "/api/auth/linkedin";
const CALLBACK_PATH: &str = "/api/auth/linkedin/callback";

/// Base64 inflates the image by a third; leave room for the JSON around it.
fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes / 3 * 4 + 64 * 1024
}

pub(crate) fn api_routes(state: AppState, max_image_bytes: usize) -> Router {
    Router::new()
        .route(AUTHORIZE_PATH, get(authorize))
        .route(CALLBACK_PATH, get(callback))
        .route("/api/auth/logout", post(logout))
        .route("/api/linkedin/userinfo", get(userinfo))
        .route(
            "/api/linkedin/share",
            post(share).layer(DefaultBodyLimit::max(body_limit(max_image_bytes))),
        )
        .route("/healthz", get(healthz))
        .with_state(state)
}

// ── Authorization ──────────────────────────────────────────────────

async fn authorize(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), Response> {
    let session = cookies::get_session(&jar).unwrap_or_default();

    let url = state
        .service
        .begin_authorization(session)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Could not start authorization");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        })?;

    let jar = jar.add(cookies::session_cookie(session, state.secure_cookies));
    Ok((jar, Redirect::to(&url)))
}

async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    // Without a cookie there is no pending state, so the callback is
    // rejected as a mismatch after the usual parameter checks.
    let session = cookies::get_session(&jar).unwrap_or_default();

    match state.service.complete_authorization(session, params).await {
        Ok(()) => {
            tracing::info!(session_id = %session, "LinkedIn sign-in successful");
            Redirect::to("/")
        }
        Err(e) => {
            let code = match &e {
                CoreError::Auth(auth) => auth.redirect_code(),
                _ => "auth_failed",
            };
            tracing::warn!(session_id = %session, error = %e, code, "LinkedIn sign-in failed");
            Redirect::to(&format!("/?error={code}"))
        }
    }
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, StatusCode) {
    if let Some(session) = cookies::get_session(&jar) {
        if let Err(e) = state.service.sign_out(session).await {
            tracing::warn!(error = %e, "Credential removal failed during logout");
        }
    }
    (jar.remove(cookies::clear_session_cookie()), StatusCode::NO_CONTENT)
}

// ── LinkedIn API ───────────────────────────────────────────────────

async fn userinfo(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Json<UserProfile>, ApiError> {
    let session = require_session(&jar)?;
    let profile = state
        .service
        .user_profile(session)
        .await
        .map_err(|e| ApiError::from_core(e, PROFILE_FAILED))?;
    tracing::debug!(session_id = %session, member = profile.display_name(), "Profile served");
    Ok(Json(profile))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareResponse {
    post_id: String,
    post_url: String,
}

async fn share(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    body: Result<Json<ShareRequest>, JsonRejection>,
) -> Result<Json<ShareResponse>, ApiError> {
    let session = require_session(&jar)?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let post = state.service.share(session, request).await.map_err(|e| {
        tracing::warn!(session_id = %session, error = %e, "Share failed");
        ApiError::from_core(e, SHARE_FAILED)
    })?;

    Ok(Json(ShareResponse {
        post_id: post.post_id,
        post_url: post.permalink,
    }))
}

async fn healthz() -> &'static str {
    "ok"
}

fn require_session(jar: &PrivateCookieJar) -> Result<SessionId, ApiError> {
    cookies::get_session(jar).ok_or(ApiError::Unauthorized)
}
