//! Error types for the Husqvarna HTTP client

use thiserror::Error;

/// Errors that can occur while talking to the Husqvarna cloud
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport failure (DNS, connect, timeout, broken body)
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The token endpoint rejected the credentials
    #[error("Authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// The API answered with a non-success status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The API answered 429; the monthly or per-second quota is exhausted
    #[error("API rate limit reached: {0}")]
    RateLimited(String),

    /// JSON decoding error
    #[error("JSON parsing error: {0}")]
    Parse(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth { status, .. } | ClientError::Http { status, .. } => Some(*status),
            ClientError::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}
