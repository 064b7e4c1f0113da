use husqvarna_client::ClientError;
use thiserror::Error;

/// High-level API errors for Automower operations
///
/// Wraps the transport errors of `husqvarna-client` into variants the poller
/// can act on: rate limiting throttles, authentication failures are fatal,
/// everything else counts as a failed poll.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The credentials were rejected by the token endpoint or the API
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The API answered with an error status
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    /// HTTP 429 from the API
    #[error("Rate limit reached: {0}")]
    RateLimited(String),

    /// Response parsing error
    ///
    /// The body was valid HTTP but not the JSON:API document we expected.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid parameter value, such as a cutting height outside 1..=9
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Mower not found: {0}")]
    MowerNotFound(String),
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited(_))
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::AuthError(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<ClientError> for ApiError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Network(msg) => ApiError::NetworkError(msg),
            ClientError::Auth { status, message } => {
                ApiError::AuthError(format!("HTTP {}: {}", status, message))
            }
            ClientError::Http { status: 401, message } => ApiError::AuthError(message),
            ClientError::Http { status, message } => ApiError::HttpError { status, message },
            ClientError::RateLimited(msg) => ApiError::RateLimited(msg),
            ClientError::Parse(msg) => ApiError::ParseError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_conversion() {
        let err: ApiError = ClientError::RateLimited("Limit Exceeded".to_string()).into();
        assert!(err.is_rate_limited());

        let err: ApiError = ClientError::Http { status: 401, message: "expired".to_string() }.into();
        assert!(err.is_auth_error());

        let err: ApiError = ClientError::Auth { status: 400, message: "bad".to_string() }.into();
        assert_eq!(err.to_string(), "Authentication failed: HTTP 400: bad");

        let err: ApiError = ClientError::Http { status: 500, message: "boom".to_string() }.into();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));

        let err: ApiError = ClientError::Parse("eof".to_string()).into();
        assert!(matches!(err, ApiError::ParseError(_)));
    }
}
