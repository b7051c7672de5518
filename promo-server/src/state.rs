use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use core_service::PromoService;

/// Shared state for route handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: PromoService,
    pub(crate) cookie_key: Key,
    pub(crate) secure_cookies: bool,
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
