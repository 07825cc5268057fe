//! Teamup-specific error types.

use teamup_core::{DatabaseError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeamupError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Access to calendar forbidden")]
    Forbidden,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl From<reqwest::Error> for TeamupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

impl TeamupError {
    /// User-friendly error message for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "The Teamup API key was rejected".to_string(),
            Self::Forbidden => "The Teamup API key may not read this calendar".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::CalendarNotFound(_) => "Calendar not found. Check the calendar id.".to_string(),
            Self::InvalidEventData(msg) => format!("Invalid event: {}", msg),
            Self::ApiError(msg) => format!("Teamup error: {}", msg),
            Self::Storage(e) => e.user_message().to_string(),
            Self::Network(e) => e.user_message().to_string(),
        }
    }

    /// Whether a later attempt may succeed without configuration changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Network(_))
    }
}
