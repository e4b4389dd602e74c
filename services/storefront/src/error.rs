use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorefrontError>;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    /// Business-rule rejection from the backend, e.g. a review without a purchase.
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorefrontError {
    /// Text suitable for an inline message or alert.
    pub fn user_message(&self) -> String {
        match self {
            StorefrontError::Network(_) => "Could not reach the store, please try again".to_string(),
            StorefrontError::Unauthorized => "Please log in to continue".to_string(),
            StorefrontError::Validation(msg) => msg.clone(),
            StorefrontError::Rejected { message, .. } => message.clone(),
            StorefrontError::Decode(_) => "The store returned an unexpected response".to_string(),
            StorefrontError::Storage(_) => "Local data could not be saved".to_string(),
            StorefrontError::Config(msg) => msg.clone(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StorefrontError::Unauthorized)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StorefrontError::Unauthorized => Some(401),
            StorefrontError::Rejected { status, .. } => Some(*status),
            StorefrontError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorefrontError {
    fn from(err: serde_json::Error) -> Self {
        StorefrontError::Decode(err.to_string())
    }
}
