use thiserror::Error;

/// Failure of a call to the remote API.
///
/// Every variant is transient from the feed core's point of view: loads
/// freeze pagination and mutations roll back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether the server rejected the request (4xx) rather than failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if (400..500).contains(status))
    }
}

/// Convenience alias for remote call results.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
