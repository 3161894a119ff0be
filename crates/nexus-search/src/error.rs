//! Error types for search and suggestion fetches.

use serde::Serialize;
use thiserror::Error;

/// Failure of a single fetch, as seen by the controllers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The query was rejected before any request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded its time budget.
    #[error("Response took longer than {timeout_ms}ms")]
    SlowResponse { timeout_ms: u64 },

    /// The remote answered with a 5xx status.
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// The remote rejected the request with a 4xx status other than 429.
    /// `message` is Jikan's explanation when the body carried one.
    #[error("Client error: HTTP {status}")]
    Client { status: u16, message: Option<String> },

    /// Backoff budget exhausted on consecutive 429 responses.
    #[error("Rate limit exceeded after {retries} retries")]
    RateLimitExceeded { retries: u32 },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Coarse error classification exposed to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NetworkError,
    SlowResponse,
    ServerError,
    ClientError,
    RateLimitExceeded,
    /// Internal bookkeeping for responses that lost the freshness check.
    StaleResponseDiscarded,
}

impl ErrorKind {
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ErrorKind::StaleResponseDiscarded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::SlowResponse => "slow_response",
            ErrorKind::ServerError => "server_error",
            ErrorKind::ClientError => "client_error",
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::StaleResponseDiscarded => "stale_response_discarded",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Validation(_) => ErrorKind::ValidationError,
            FetchError::Network(_) => ErrorKind::NetworkError,
            FetchError::SlowResponse { .. } => ErrorKind::SlowResponse,
            // A body we cannot read is the server's fault from the user's side
            FetchError::Server { .. } | FetchError::Decode(_) => ErrorKind::ServerError,
            FetchError::Client { .. } => ErrorKind::ClientError,
            FetchError::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
        }
    }
}

/// A specialized `Result` type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FetchError::RateLimitExceeded { retries: 3 }.kind(),
            ErrorKind::RateLimitExceeded
        );
        assert_eq!(FetchError::Decode("eof".into()).kind(), ErrorKind::ServerError);
        assert_eq!(
            FetchError::Client {
                status: 404,
                message: None,
            }
            .kind(),
            ErrorKind::ClientError
        );
        assert_eq!(
            FetchError::SlowResponse { timeout_ms: 10 }.kind(),
            ErrorKind::SlowResponse
        );
    }

    #[test]
    fn test_stale_is_internal() {
        assert!(!ErrorKind::StaleResponseDiscarded.is_user_visible());
        assert!(ErrorKind::NetworkError.is_user_visible());
        assert_eq!(ErrorKind::RateLimitExceeded.to_string(), "rate_limit_exceeded");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            FetchError::Server { status: 503 }.to_string(),
            "Server error: HTTP 503"
        );
        assert_eq!(
            FetchError::RateLimitExceeded { retries: 3 }.to_string(),
            "Rate limit exceeded after 3 retries"
        );
    }
}
