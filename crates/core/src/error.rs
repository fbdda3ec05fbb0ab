//! Unified error type for APDU operations

use thiserror::Error;

/// The main error type for APDU operations
#[derive(Debug, Error)]
pub enum Error {
    /// Command-related errors
    #[error(transparent)]
    Command(#[from] crate::command::error::CommandError),

    /// Response-related errors
    #[error(transparent)]
    Response(#[from] crate::response::error::ResponseError),
}

/// Result type for APDU operations
pub type Result<T> = core::result::Result<T, Error>;
