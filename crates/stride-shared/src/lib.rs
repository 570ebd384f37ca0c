//! # stride-shared
//!
//! Domain types shared by the Stride feed core and its HTTP client: the
//! records a feed holds, their identifiers, pagination envelopes and the
//! error type every remote call returns.

pub mod constants;
pub mod error;
pub mod models;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use models::*;
pub use types::*;
