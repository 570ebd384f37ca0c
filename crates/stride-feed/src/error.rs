use stride_shared::ApiError;
use thiserror::Error;

/// Errors produced by feed controllers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The remote call failed.  Loads freeze pagination, mutations are
    /// rolled back before this is returned.
    #[error("Remote call failed: {0}")]
    Remote(#[from] ApiError),

    /// The request was rejected before any remote call was made.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The feed has been torn down by its owner.
    #[error("Feed has been torn down")]
    TornDown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Comment body is empty")]
    EmptyBody,

    #[error("Comment body is too long: {len} characters (max {max})")]
    BodyTooLong { len: usize, max: usize },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
