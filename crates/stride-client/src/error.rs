use thiserror::Error;

/// Errors raised while setting up the HTTP client.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    #[error("API token contains characters not allowed in a header")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, ClientError>;
