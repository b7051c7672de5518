//! LinkedIn v2 API request and response types
//!
//! Wire shapes for the assets and UGC posts endpoints, plus the plain data
//! passed between publish steps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FEEDSHARE_IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";
pub const USER_GENERATED_CONTENT: &str = "urn:li:userGeneratedContent";
pub const MEDIA_UPLOAD_HTTP_REQUEST: &str =
    "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest";

// ============================================================================
// Register upload
// ============================================================================

/// Body of `POST /assets?action=registerUpload`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUploadRequest {
    pub register_upload_request: RegisterUploadSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUploadSpec {
    pub recipes: Vec<String>,
    pub owner: String,
    pub service_relationships: Vec<ServiceRelationship>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRelationship {
    pub relationship_type: String,
    pub identifier: String,
}

impl RegisterUploadRequest {
    /// Feed-share image upload owned by `owner_urn`.
    pub fn feedshare_image(owner_urn: impl Into<String>) -> Self {
        Self {
            register_upload_request: RegisterUploadSpec {
                recipes: vec![FEEDSHARE_IMAGE_RECIPE.to_string()],
                owner: owner_urn.into(),
                service_relationships: vec![ServiceRelationship {
                    relationship_type: "OWNER".to_string(),
                    identifier: USER_GENERATED_CONTENT.to_string(),
                }],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterUploadResponse {
    pub value: RegisterUploadValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUploadValue {
    pub asset: String,
    /// Keyed by mechanism type; only the plain HTTP request one is used
    pub upload_mechanism: HashMap<String, UploadMechanism>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMechanism {
    pub upload_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl RegisterUploadResponse {
    /// Pull the upload URL and asset URN out of the response.
    pub fn into_upload_asset(mut self) -> Option<UploadAsset> {
        let mechanism = self
            .value
            .upload_mechanism
            .remove(MEDIA_UPLOAD_HTTP_REQUEST)?;
        if mechanism.upload_url.is_empty() || self.value.asset.is_empty() {
            return None;
        }
        Some(UploadAsset {
            upload_url: mechanism.upload_url,
            asset_id: self.value.asset,
        })
    }
}

/// Upload slot returned by register-upload. Used once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAsset {
    pub upload_url: String,
    /// Digital media asset URN, e.g. `urn:li:digitalmediaAsset:C5522AQ...`
    pub asset_id: String,
}

// ============================================================================
// UGC post
// ============================================================================

/// Everything the post needs, derived at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoPayload {
    pub author_urn: String,
    pub text: String,
    pub asset_id: String,
}

/// Title and description attached to the image entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaText {
    pub title: String,
    pub description: String,
}

/// Body of `POST /ugcPosts`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UgcPost {
    pub author: String,
    pub lifecycle_state: String,
    pub specific_content: SpecificContent,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecificContent {
    #[serde(rename = "com.linkedin.ugc.ShareContent")]
    pub share_content: ShareContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareContent {
    pub share_commentary: TextValue,
    pub share_media_category: String,
    pub media: Vec<ShareMedia>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareMedia {
    pub status: String,
    pub description: TextValue,
    pub media: String,
    pub title: TextValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextValue {
    pub text: String,
}

impl TextValue {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Visibility {
    #[serde(rename = "com.linkedin.ugc.MemberNetworkVisibility")]
    pub member_network_visibility: String,
}

impl UgcPost {
    /// A public, published single-image post.
    pub fn image_share(payload: &PromoPayload, media_text: &MediaText) -> Self {
        Self {
            author: payload.author_urn.clone(),
            lifecycle_state: "PUBLISHED".to_string(),
            specific_content: SpecificContent {
                share_content: ShareContent {
                    share_commentary: TextValue::new(payload.text.clone()),
                    share_media_category: "IMAGE".to_string(),
                    media: vec![ShareMedia {
                        status: "READY".to_string(),
                        description: TextValue::new(media_text.description.clone()),
                        media: payload.asset_id.clone(),
                        title: TextValue::new(media_text.title.clone()),
                    }],
                },
            },
            visibility: Visibility {
                member_network_visibility: "PUBLIC".to_string(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UgcPostResponse {
    #[serde(default)]
    pub id: Option<String>,
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPost {
    pub post_id: String,
    pub permalink: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_upload_request_shape() {
        let body = serde_json::to_value(RegisterUploadRequest::feedshare_image(
            "urn:li:person:782bbtaQ",
        ))
        .unwrap();

        assert_eq!(
            body,
            json!({
                "registerUploadRequest": {
                    "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                    "owner": "urn:li:person:782bbtaQ",
                    "serviceRelationships": [{
                        "relationshipType": "OWNER",
                        "identifier": "urn:li:userGeneratedContent"
                    }]
                }
            })
        );
    }

    #[test]
    fn test_register_upload_response_parsing() {
        let response: RegisterUploadResponse = serde_json::from_value(json!({
            "value": {
                "uploadMechanism": {
                    "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest": {
                        "headers": {},
                        "uploadUrl": "https://api.linkedin.com/mediaUpload/C5522AQ/feedshare-uploadedImage/0"
                    }
                },
                "mediaArtifact": "urn:li:digitalmediaMediaArtifact:(urn:li:digitalmediaAsset:C5522AQ,urn:li:digitalmediaMediaArtifactClass:feedshare-uploadedImage)",
                "asset": "urn:li:digitalmediaAsset:C5522AQ"
            }
        }))
        .unwrap();

        let asset = response.into_upload_asset().unwrap();
        assert_eq!(asset.asset_id, "urn:li:digitalmediaAsset:C5522AQ");
        assert!(asset.upload_url.starts_with("https://api.linkedin.com/mediaUpload/"));
    }

    #[test]
    fn test_register_upload_response_without_http_mechanism() {
        let response: RegisterUploadResponse = serde_json::from_value(json!({
            "value": {
                "uploadMechanism": {},
                "asset": "urn:li:digitalmediaAsset:C5522AQ"
            }
        }))
        .unwrap();

        assert!(response.into_upload_asset().is_none());
    }

    #[test]
    fn test_ugc_post_shape() {
        let payload = PromoPayload {
            author_urn: "urn:li:person:abc".into(),
            text: "See you there".into(),
            asset_id: "urn:li:digitalmediaAsset:X".into(),
        };
        let media_text = MediaText {
            title: "HSR Founders Club Event".into(),
            description: "The AfterParty 2025".into(),
        };

        let body = serde_json::to_value(UgcPost::image_share(&payload, &media_text)).unwrap();

        assert_eq!(
            body,
            json!({
                "author": "urn:li:person:abc",
                "lifecycleState": "PUBLISHED",
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareCommentary": {"text": "See you there"},
                        "shareMediaCategory": "IMAGE",
                        "media": [{
                            "status": "READY",
                            "description": {"text": "The AfterParty 2025"},
                            "media": "urn:li:digitalmediaAsset:X",
                            "title": {"text": "HSR Founders Club Event"}
                        }]
                    }
                },
                "visibility": {"com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"}
            })
        );
    }

    #[test]
    fn test_published_post_serializes_camel_case() {
        let post = PublishedPost {
            post_id: "urn:li:share:1".into(),
            permalink: "https://www.linkedin.com/feed/update/urn:li:share:1/".into(),
        };
        let value = serde_json::to_value(&post).unwrap();
        assert_eq!(value["postId"], "urn:li:share:1");
        assert!(value.get("permalink").is_some());
    }
}
