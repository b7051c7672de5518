//! HTTP surface of the promo share service.
//!
//! Routes:
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/api/auth/linkedin` | Redirect to the LinkedIn consent screen |
//! | GET | `/api/auth/linkedin/callback` | Complete authorization, redirect to `/` |
//! | POST | `/api/auth/logout` | Forget the session's credentials |
//! | GET | `/api/linkedin/userinfo` | Signed-in member profile |
//! | POST | `/api/linkedin/share` | Publish the promo image post |
//! | GET | `/healthz` | Liveness |
//!
//! The session id travels in a private (encrypted) cookie. Credentials stay
//! server-side in the service's secure store.

mod cookies;
mod error;
mod routes;
pub mod settings;
mod state;

use std::time::Duration;

use axum::Router;
use axum_extra::extract::cookie::Key;
use core_runtime::events::{CoreEvent, EventSeverity, RecvError};
use core_service::PromoService;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use settings::ServerSettings;

use state::AppState;

/// Upper bound for a whole request, covering the three provider calls of a share.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How often abandoned authorization states are swept.
pub const STATE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the application router.
pub fn build_router(service: PromoService, cookie_key: Key, secure_cookies: bool) -> Router {
    let max_image_bytes = service.share_settings().max_image_bytes;
    let state = AppState {
        service,
        cookie_key,
        secure_cookies,
    };

    routes::api_routes(state, max_image_bytes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// Log every core event until the bus closes.
///
/// Debug-severity events are skipped before serialization unless the
/// events target is enabled at debug level.
pub fn spawn_event_logger(service: &PromoService) -> JoinHandle<()> {
    let mut events = service.subscribe_events().filter(|event| {
        event.severity() != EventSeverity::Debug
            || tracing::enabled!(target: "promo_server::events", tracing::Level::DEBUG)
    });
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Periodically delete authorization states whose callback never came.
pub fn spawn_state_sweeper(service: &PromoService, every: Duration) -> JoinHandle<()> {
    let service = service.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = service.purge_expired_states().await {
                tracing::warn!(error = %e, "Authorization state sweep failed");
            }
        }
    })
}

fn log_event(event: &CoreEvent) {
    let payload = serde_json::to_string(event).unwrap_or_default();
    match event.severity() {
        EventSeverity::Error => {
            tracing::warn!(target: "promo_server::events", event = %payload, "{}", event.description())
        }
        EventSeverity::Warning | EventSeverity::Info => {
            tracing::info!(target: "promo_server::events", event = %payload, "{}", event.description())
        }
        EventSeverity::Debug => {
            tracing::debug!(target: "promo_server::events", event = %payload, "{}", event.description())
        }
    }
}
