use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::PrivateCookieJar;
use core_service::SessionId;
use time::Duration;

pub(crate) const SESSION_COOKIE_NAME: &str = "__promo_session";

/// LinkedIn access tokens live for 60 days; the cookie does not outlive them.
const SESSION_TTL_DAYS: i64 = 60;

/// Create the session cookie carrying the session id.
pub(crate) fn session_cookie(session_id: SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Create removal cookie for the session.
pub(crate) fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Session id from the jar, if present and well formed.
pub(crate) fn get_session(jar: &PrivateCookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|c| SessionId::from_string(c.value()).ok())
}
