use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Authorization with LinkedIn is required")]
    ReauthorizationRequired,

    #[error("A share is already in progress for this session")]
    PublishInProgress,

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Publish error: {0}")]
    Publish(#[from] provider_linkedin::PublishError),
}

impl CoreError {
    /// Bad input from the caller rather than a provider or wiring failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CoreError::Publish(e) if e.is_invalid_input())
    }
}

impl From<core_runtime::error::Error> for CoreError {
    fn from(err: core_runtime::error::Error) -> Self {
        match err {
            core_runtime::error::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::InitializationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
