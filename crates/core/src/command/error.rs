//! Error types specific to APDU commands

/// Error for APDU command processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The serialized command does not match any ISO 7816-3 case
    #[error("Malformed APDU: {0}")]
    MalformedApdu(&'static str),

    /// Command data field exceeds the extended-length limit of 65535 bytes
    #[error("Command data too long: {0} bytes")]
    DataTooLong(usize),

    /// Expected length outside the valid range 1..=65536
    #[error("Invalid expected length: {0}")]
    InvalidLe(u32),
}
