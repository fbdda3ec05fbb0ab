//! Error types for the TR-03110 protocol layer

use thiserror::Error;

use crate::crypto::CryptoError;

/// Result type for protocol layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for secure messaging and command construction
///
/// The secure messaging engine never retries: every failure is surfaced to
/// the caller, and failures that leave the send sequence counter out of
/// step with the card additionally move the session into its terminal
/// failed state.
#[derive(Debug, Error)]
pub enum Error {
    /// APDU could not be serialized, classified or parsed
    #[error(transparent)]
    MalformedApdu(#[from] mrtd_apdu_core::Error),

    /// Mandatory status data object (DO99) missing from a protected response
    #[error("mandatory status data object (DO99) not found")]
    MissingDo99,

    /// Mandatory checksum data object (DO8E) missing from a protected response
    #[error("mandatory checksum data object (DO8E) not found")]
    MissingDo8e,

    /// Computed checksum does not match the one carried in the response
    #[error("response checksum is incorrect")]
    BadMac,

    /// Cipher or MAC primitive failed
    #[error(transparent)]
    Cipher(#[from] CryptoError),

    /// Protected response body could not be parsed
    #[error("invalid data object: {0}")]
    Tlv(&'static str),

    /// Protocol OID could not be encoded
    #[error("invalid protocol identifier: {0}")]
    InvalidOid(&'static str),

    /// Requested feature is not implemented
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// The session aborted after an earlier failure and refuses traffic
    #[error("secure messaging session is in failed state")]
    SessionFailed,
}

impl From<mrtd_apdu_core::command::error::CommandError> for Error {
    fn from(error: mrtd_apdu_core::command::error::CommandError) -> Self {
        Self::MalformedApdu(error.into())
    }
}
