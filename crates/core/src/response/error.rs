//! Error types specific to APDU responses

/// Error for APDU response processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// Response shorter than a status word
    #[error("Response shorter than a status word")]
    BufferTooSmall,
}
