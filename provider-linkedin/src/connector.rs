//! LinkedIn v2 API connector
//!
//! One method per provider call of the publish sequence. None of them retry:
//! every call here is a POST whose side effects the provider does not
//! guarantee to be idempotent.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_runtime::logging::redact_secrets;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{PublishError, Result};
use crate::types::{
    MediaText, PromoPayload, RegisterUploadRequest, RegisterUploadResponse, UgcPost,
    UgcPostResponse, UploadAsset,
};

const RESTLI_PROTOCOL_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_PROTOCOL_VERSION: &str = "2.0.0";
const RESTLI_ID_HEADER: &str = "x-restli-id";

/// LinkedIn API connector
///
/// # Example
///
/// ```ignore
/// use provider_linkedin::LinkedInConnector;
///
/// let connector = LinkedInConnector::new(http_client, "https://api.linkedin.com/v2", timeout);
/// let asset = connector.register_upload(&token, "urn:li:person:abc").await?;
/// connector.upload_binary(&token, &asset, image).await?;
/// ```
pub struct LinkedInConnector {
    http_client: Arc<dyn HttpClient>,
    api_base_url: String,
    timeout: Duration,
}

impl LinkedInConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Reserve an upload slot for a feed-share image owned by `owner_urn`.
    #[instrument(skip(self, access_token))]
    pub async fn register_upload(&self, access_token: &str, owner_urn: &str) -> Result<UploadAsset> {
        let url = format!("{}/assets?action=registerUpload", self.api_base_url);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(access_token)
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .timeout(self.timeout)
            .json(&RegisterUploadRequest::feedshare_image(owner_urn))
            .map_err(|e| PublishError::RegisterFailed {
                status: None,
                message: e.to_string(),
            })?;

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Register upload request did not complete");
            PublishError::RegisterFailed {
                status: None,
                message: e.to_string(),
            }
        })?;

        if !response.is_success() {
            log_failure("Register upload", &response);
            return Err(PublishError::RegisterFailed {
                status: Some(response.status),
                message: "provider rejected the request".to_string(),
            });
        }

        let asset = response
            .json::<RegisterUploadResponse>()
            .ok()
            .and_then(RegisterUploadResponse::into_upload_asset)
            .ok_or_else(|| {
                warn!(
                    status = response.status,
                    body = %excerpt(&response),
                    "Register upload response is missing the upload URL or asset"
                );
                PublishError::RegisterFailed {
                    status: Some(response.status),
                    message: "response missing upload URL or asset".to_string(),
                }
            })?;

        info!(asset = %asset.asset_id, "Upload registered");
        Ok(asset)
    }

    /// POST the raw image bytes to the registered upload URL.
    #[instrument(skip(self, access_token, asset, image), fields(asset = %asset.asset_id, bytes = image.len()))]
    pub async fn upload_binary(
        &self,
        access_token: &str,
        asset: &UploadAsset,
        image: Bytes,
    ) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Post, asset.upload_url.clone())
            .bearer_token(access_token)
            .header("Content-Type", "application/octet-stream")
            .timeout(self.timeout)
            .body(image);

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Image upload request did not complete");
            PublishError::UploadFailed {
                status: None,
                message: e.to_string(),
            }
        })?;

        if !response.is_success() {
            log_failure("Image upload", &response);
            return Err(PublishError::UploadFailed {
                status: Some(response.status),
                message: "provider rejected the upload".to_string(),
            });
        }

        debug!(status = response.status, "Image uploaded");
        Ok(())
    }

    /// Create the post and return its id.
    ///
    /// The id comes from the JSON `id` field, or the `x-restli-id` header
    /// when the body does not carry one.
    #[instrument(skip(self, access_token, payload, media_text), fields(asset = %payload.asset_id))]
    pub async fn create_post(
        &self,
        access_token: &str,
        payload: &PromoPayload,
        media_text: &MediaText,
    ) -> Result<String> {
        let url = format!("{}/ugcPosts", self.api_base_url);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(access_token)
            .header(RESTLI_PROTOCOL_HEADER, RESTLI_PROTOCOL_VERSION)
            .timeout(self.timeout)
            .json(&UgcPost::image_share(payload, media_text))
            .map_err(|e| PublishError::PostFailed {
                status: None,
                message: e.to_string(),
            })?;

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Post creation request did not complete");
            PublishError::PostFailed {
                status: None,
                message: e.to_string(),
            }
        })?;

        if !response.is_success() {
            log_failure("Post creation", &response);
            return Err(PublishError::PostFailed {
                status: Some(response.status),
                message: "provider rejected the post".to_string(),
            });
        }

        let body_id = response
            .json::<UgcPostResponse>()
            .ok()
            .and_then(|body| body.id)
            .filter(|id| !id.is_empty());

        let post_id = body_id
            .or_else(|| response.header(RESTLI_ID_HEADER).map(str::to_string))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                warn!(status = response.status, "Post created but no id was returned");
                PublishError::PostFailed {
                    status: Some(response.status),
                    message: "response carried no post id".to_string(),
                }
            })?;

        info!(post_id = %post_id, "Post created");
        Ok(post_id)
    }
}

fn log_failure(operation: &str, response: &HttpResponse) {
    warn!(
        status = response.status,
        body = %excerpt(response),
        "{} failed",
        operation
    );
}

fn excerpt(response: &HttpResponse) -> String {
    response
        .text()
        .map(|body| redact_secrets(&body))
        .unwrap_or_else(|_| "<non-utf8 body>".to_string())
}
