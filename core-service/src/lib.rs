//! Core service façade and bootstrap helpers.
//!
//! This crate wires the auth manager and the LinkedIn publisher together
//! behind [`PromoService`], the one type the HTTP layer talks to. Native
//! deployments enable the `native-shims` feature (reqwest client, in-memory
//! secure store); tests inject their own bridges through [`CoreConfig`].

pub mod error;
pub mod image;

pub use error::{CoreError, Result};
pub use image::decode_image_data;

pub use core_auth::{AuthError, CallbackParams, SessionId, SessionStatus, UserProfile};
pub use core_runtime::config::{CoreConfig, LinkedInSettings, ShareSettings};
pub use provider_linkedin::{PublishError, PublishedPost};

use core_auth::AuthManager;
use core_runtime::events::{EventBus, EventStream};
use provider_linkedin::{LinkedInConnector, MediaPublisher, PublishRequest};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// Body of a share request as sent by the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub text: String,
    /// `data:image/...;base64,...` or bare base64
    pub image_data: String,
}

/// Primary façade exposed to the HTTP layer.
#[derive(Clone)]
pub struct PromoService {
    auth: Arc<AuthManager>,
    publisher: Arc<MediaPublisher>,
    share: ShareSettings,
    event_bus: EventBus,
    in_flight: Arc<Mutex<HashSet<SessionId>>>,
}

impl PromoService {
    /// Create a new service from a validated configuration.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let auth = AuthManager::from_config(&config, event_bus.clone());
        let connector = LinkedInConnector::new(
            config.http_client.clone(),
            config.linkedin.api_base_url.clone(),
            config.request_timeout,
        );
        let publisher = MediaPublisher::new(connector, config.share.clone(), event_bus.clone());

        info!(
            redirect_uri = %config.linkedin.redirect_uri,
            scopes = %config.linkedin.scope_string(),
            "Promo service initialized"
        );

        Ok(Self {
            auth: Arc::new(auth),
            publisher: Arc::new(publisher),
            share: config.share,
            event_bus,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// URL to send the browser to for authorization.
    pub async fn begin_authorization(&self, session: SessionId) -> Result<String> {
        Ok(self.auth.begin_authorization(session).await?)
    }

    /// Validate the provider callback and sign the session in.
    pub async fn complete_authorization(
        &self,
        session: SessionId,
        params: CallbackParams,
    ) -> Result<()> {
        Ok(self.auth.complete_authorization(session, params).await?)
    }

    /// Member profile of a signed-in session.
    pub async fn user_profile(&self, session: SessionId) -> Result<UserProfile> {
        self.auth.user_profile(session).await.map_err(auth_failure)
    }

    /// Publish the image post for a session.
    ///
    /// Rejects a second share for the same session while one is running.
    /// Input is checked before any provider call.
    #[instrument(skip(self, request), fields(session_id = %session))]
    pub async fn share(&self, session: SessionId, request: ShareRequest) -> Result<PublishedPost> {
        let _guard = InFlightGuard::acquire(&self.in_flight, session)?;

        if request.text.trim().is_empty() {
            return Err(PublishError::EmptyText.into());
        }
        let image = decode_image_data(&request.image_data)?;

        let access_token = self
            .auth
            .valid_access_token(session)
            .await
            .map_err(auth_failure)?;
        let profile = self.auth.user_profile(session).await.map_err(auth_failure)?;
        let author_urn = profile.person_urn();
        let session_label = session.to_string();

        let result = self
            .publisher
            .publish(PublishRequest {
                session_id: &session_label,
                access_token: &access_token,
                author_urn: &author_urn,
                text: &request.text,
                image,
            })
            .await;

        match result {
            Ok(post) => Ok(post),
            Err(e) if e.is_unauthorized() => {
                self.auth
                    .invalidate_session(session, &AuthError::Unauthorized)
                    .await;
                Err(CoreError::ReauthorizationRequired)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn sign_out(&self, session: SessionId) -> Result<()> {
        Ok(self.auth.sign_out(session).await?)
    }

    pub async fn status(&self, session: SessionId) -> Result<SessionStatus> {
        Ok(self.auth.status(session).await?)
    }

    /// Delete authorization states whose callback never arrived.
    pub async fn purge_expired_states(&self) -> Result<usize> {
        Ok(self.auth.purge_expired_states().await?)
    }

    pub fn share_settings(&self) -> &ShareSettings {
        &self.share
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

/// Stale or missing credentials become `ReauthorizationRequired`.
fn auth_failure(err: AuthError) -> CoreError {
    if err.requires_reauthorization() {
        CoreError::ReauthorizationRequired
    } else {
        CoreError::Auth(err)
    }
}

/// Marks a session as publishing until dropped.
struct InFlightGuard {
    sessions: Arc<Mutex<HashSet<SessionId>>>,
    session: SessionId,
}

impl InFlightGuard {
    fn acquire(sessions: &Arc<Mutex<HashSet<SessionId>>>, session: SessionId) -> Result<Self> {
        let mut active = sessions
            .lock()
            .map_err(|_| CoreError::InitializationFailed("in-flight registry poisoned".into()))?;
        if !active.insert(session) {
            warn!(session_id = %session, "Share rejected, another one is running");
            return Err(CoreError::PublishInProgress);
        }
        Ok(Self {
            sessions: Arc::clone(sessions),
            session,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.sessions.lock() {
            active.remove(&self.session);
        }
    }
}

/// Build a service from the process environment with the native bridges.
///
/// ```no_run
/// # fn example() -> core_service::Result<()> {
/// let service = core_service::bootstrap_from_env()?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "native-shims")]
pub fn bootstrap_from_env() -> Result<PromoService> {
    let linkedin = LinkedInSettings::from_env()?;
    let config = CoreConfig::builder().linkedin(linkedin).build()?;
    PromoService::new(config)
}
