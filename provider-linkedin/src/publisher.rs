//! Three-step image post publisher
//!
//! ```text
//! Pending --register--> Registered --upload--> Uploaded --create--> Posted
//!    |                      |                     |
//!    +----------------------+---------------------+--> Err(PublishError)
//! ```
//!
//! Each step consumes the previous step's result, so the order cannot be
//! changed and a failed step never reaches the next one.
//!
//! A failure after registration leaves the registered asset on LinkedIn. The
//! v2 assets API offers no supported way to abandon a feed-share image, so the
//! asset URN is reported in the `Failed` event and nothing else is attempted.

use bytes::Bytes;
use core_runtime::config::ShareSettings;
use core_runtime::events::{CoreEvent, EventBus, PublishEvent, PublishStage};
use tracing::{info, instrument, warn};

use crate::connector::LinkedInConnector;
use crate::error::{PublishError, Result};
use crate::types::{MediaText, PromoPayload, PublishedPost, UploadAsset};

/// Result of the last completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStep {
    Pending,
    Registered(UploadAsset),
    Uploaded { asset_id: String },
    Posted(PublishedPost),
}

impl PublishStep {
    /// Asset registered on the provider side, if any.
    pub fn asset_id(&self) -> Option<&str> {
        match self {
            PublishStep::Registered(asset) => Some(&asset.asset_id),
            PublishStep::Uploaded { asset_id } => Some(asset_id),
            PublishStep::Pending | PublishStep::Posted(_) => None,
        }
    }
}

/// One publish attempt's input.
///
/// `Debug` omits the access token and the image bytes.
pub struct PublishRequest<'a> {
    /// Used only to tag events and logs
    pub session_id: &'a str,
    pub access_token: &'a str,
    pub author_urn: &'a str,
    pub text: &'a str,
    pub image: Bytes,
}

impl std::fmt::Debug for PublishRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishRequest")
            .field("session_id", &self.session_id)
            .field("author_urn", &self.author_urn)
            .field("text_len", &self.text.len())
            .field("image_bytes", &self.image.len())
            .finish_non_exhaustive()
    }
}

pub struct MediaPublisher {
    connector: LinkedInConnector,
    share: ShareSettings,
    event_bus: EventBus,
}

impl MediaPublisher {
    pub fn new(connector: LinkedInConnector, share: ShareSettings, event_bus: EventBus) -> Self {
        Self {
            connector,
            share,
            event_bus,
        }
    }

    /// Run register, upload and create-post in order.
    ///
    /// Input is validated before the first request. No step is retried.
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn publish(&self, request: PublishRequest<'_>) -> Result<PublishedPost> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(PublishError::EmptyText);
        }
        if request.image.is_empty() {
            return Err(PublishError::InvalidImage("image is empty".to_string()));
        }
        if request.image.len() > self.share.max_image_bytes {
            return Err(PublishError::InvalidImage(format!(
                "image is {} bytes, limit is {}",
                request.image.len(),
                self.share.max_image_bytes
            )));
        }

        self.emit(PublishEvent::Started {
            session_id: request.session_id.to_string(),
            image_bytes: request.image.len() as u64,
        });

        let mut step = PublishStep::Pending;
        loop {
            step = match self.advance(step.clone(), &request, text).await {
                Ok(PublishStep::Posted(post)) => {
                    info!(post_id = %post.post_id, "Post published");
                    self.emit(PublishEvent::Completed {
                        session_id: request.session_id.to_string(),
                        post_id: post.post_id.clone(),
                        permalink: post.permalink.clone(),
                    });
                    return Ok(post);
                }
                Ok(next) => next,
                Err(err) => {
                    let orphaned_asset = step.asset_id().map(str::to_string);
                    if let Some(asset) = &orphaned_asset {
                        warn!(asset = %asset, "Registered asset left without a post");
                    }
                    self.emit(PublishEvent::Failed {
                        session_id: request.session_id.to_string(),
                        stage: err.stage(),
                        message: err.to_string(),
                        orphaned_asset,
                    });
                    return Err(err);
                }
            };
        }
    }

    async fn advance(
        &self,
        step: PublishStep,
        request: &PublishRequest<'_>,
        text: &str,
    ) -> Result<PublishStep> {
        let (next, stage) = match step {
            PublishStep::Pending => {
                let asset = self
                    .connector
                    .register_upload(request.access_token, request.author_urn)
                    .await?;
                (PublishStep::Registered(asset), PublishStage::RegisterUpload)
            }
            PublishStep::Registered(asset) => {
                self.connector
                    .upload_binary(request.access_token, &asset, request.image.clone())
                    .await?;
                (
                    PublishStep::Uploaded {
                        asset_id: asset.asset_id,
                    },
                    PublishStage::UploadBinary,
                )
            }
            PublishStep::Uploaded { asset_id } => {
                let payload = PromoPayload {
                    author_urn: request.author_urn.to_string(),
                    text: text.to_string(),
                    asset_id,
                };
                let media_text = MediaText {
                    title: self.share.media_title.clone(),
                    description: self.share.media_description.clone(),
                };
                let post_id = self
                    .connector
                    .create_post(request.access_token, &payload, &media_text)
                    .await?;
                let permalink = self.share.permalink(&post_id);
                (
                    PublishStep::Posted(PublishedPost { post_id, permalink }),
                    PublishStage::CreatePost,
                )
            }
            PublishStep::Posted(post) => return Ok(PublishStep::Posted(post)),
        };

        self.emit(PublishEvent::StepCompleted {
            session_id: request.session_id.to_string(),
            stage,
        });
        Ok(next)
    }

    fn emit(&self, event: PublishEvent) {
        let _ = self.event_bus.emit(CoreEvent::Publish(event));
    }
}
