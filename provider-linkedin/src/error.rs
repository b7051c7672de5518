//! Error types for the LinkedIn publisher

use core_runtime::events::PublishStage;
use thiserror::Error;

/// Failures of the image publish sequence.
///
/// `status` is `None` when the request never produced a response.
#[derive(Error, Debug)]
pub enum PublishError {
    /// Registering the upload slot failed or returned an unreadable body
    #[error("Register upload failed{}: {message}", status_suffix(.status))]
    RegisterFailed { status: Option<u16>, message: String },

    /// Uploading the image bytes failed
    #[error("Image upload failed{}: {message}", status_suffix(.status))]
    UploadFailed { status: Option<u16>, message: String },

    /// Creating the post failed
    #[error("Post creation failed{}: {message}", status_suffix(.status))]
    PostFailed { status: Option<u16>, message: String },

    /// Image payload was empty, undecodable or too large
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Commentary text was empty
    #[error("Post text cannot be empty")]
    EmptyText,
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (status {})", s))
        .unwrap_or_default()
}

impl PublishError {
    /// Stage the sequence stopped at, if it got as far as a request.
    pub fn stage(&self) -> Option<PublishStage> {
        match self {
            PublishError::RegisterFailed { .. } => Some(PublishStage::RegisterUpload),
            PublishError::UploadFailed { .. } => Some(PublishStage::UploadBinary),
            PublishError::PostFailed { .. } => Some(PublishStage::CreatePost),
            PublishError::InvalidImage(_) | PublishError::EmptyText => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            PublishError::RegisterFailed { status, .. }
            | PublishError::UploadFailed { status, .. }
            | PublishError::PostFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// The provider rejected the access token.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Input problems the user can fix, as opposed to provider failures.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, PublishError::InvalidImage(_) | PublishError::EmptyText)
    }
}

/// Result type for publish operations
pub type Result<T> = std::result::Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status() {
        let err = PublishError::RegisterFailed {
            status: Some(500),
            message: "provider error".into(),
        };
        assert_eq!(
            err.to_string(),
            "Register upload failed (status 500): provider error"
        );

        let err = PublishError::UploadFailed {
            status: None,
            message: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "Image upload failed: connection reset");
    }

    #[test]
    fn test_classification() {
        let unauthorized = PublishError::PostFailed {
            status: Some(401),
            message: String::new(),
        };
        assert!(unauthorized.is_unauthorized());
        assert_eq!(unauthorized.stage(), Some(PublishStage::CreatePost));

        assert!(PublishError::EmptyText.is_invalid_input());
        assert_eq!(PublishError::EmptyText.stage(), None);
    }
}
