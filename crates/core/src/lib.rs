//! Core types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4, as used by the
//! eMRTD protocol layers built on top of it.
//!
//! ## Overview
//!
//! APDU (Application Protocol Data Unit) is the communication format used by
//! smart cards. This crate provides:
//!
//! - Command APDUs with the full short and extended length serialization
//!   rules of ISO/IEC 7816-3 §12.1
//! - The seven-case command classifier (case 1 through case 4 extended)
//! - Response APDUs and status word interpretation
//!
//! Transports (PC/SC or otherwise) are deliberately out of scope; everything
//! here deals only with bytes.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod response;

mod error;
pub use error::{Error, Result};

pub use command::Command;
pub use command::case::ApduCase;
pub use response::Response;
pub use response::status::StatusWord;

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{
        ApduCase, Bytes, BytesMut, Command, Error, Response, Result,
        command::error::CommandError, response::error::ResponseError,
        response::status::StatusWord,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // A protected EXTERNAL AUTHENTICATE as secure messaging emits it: the
    // body is a DO8E and the card is asked for a full short response.
    #[test]
    fn test_protected_command_roundtrip() {
        let body = Bytes::from_static(&[
            0x8E, 0x08, 0xBF, 0x8B, 0x92, 0xD6, 0x35, 0xFF, 0x24, 0xF8,
        ]);
        let command = Command::new(0x0C, 0x82, 0x00, 0x00)
            .with_data(body.clone())
            .unwrap()
            .with_le(256)
            .unwrap();

        let raw = command.to_bytes();
        assert_eq!(ApduCase::classify(&raw), Ok(ApduCase::Case4s));
        assert_eq!(raw.last(), Some(&0x00));

        let parsed = Command::from_bytes(&raw).unwrap();
        assert_eq!(parsed.class() & 0x0C, 0x0C);
        assert_eq!(parsed.data(), Some(body.as_ref()));
        assert_eq!(parsed.expected_length(), Some(256));
    }

    // The status word a card answers with when secure messaging breaks
    #[test]
    fn test_response_with_error_status() {
        let response = Response::from_bytes(&[0x69, 0x88]).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.status(), StatusWord::from_u16(0x6988));
        assert_eq!(
            response.status().description(),
            "Secure messaging objects incorrect"
        );
    }
}
