//! Status word definitions for APDU responses

use std::fmt;

/// Status Word (SW1-SW2) from an APDU response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte (SW1)
    pub sw1: u8,
    /// Second status byte (SW2)
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create from the big-endian u16 form
    pub const fn from_u16(status: u16) -> Self {
        let [sw1, sw2] = status.to_be_bytes();
        Self { sw1, sw2 }
    }

    /// The big-endian u16 form
    pub const fn to_u16(&self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// Whether the card reported normal processing (90 00)
    pub const fn is_success(&self) -> bool {
        self.to_u16() == 0x9000
    }

    /// Whether the card rejected the authentication attempt (63 00)
    pub const fn is_authentication_failed(&self) -> bool {
        self.to_u16() == 0x6300
    }

    /// Whether the card flagged broken secure messaging (69 87 or 69 88)
    ///
    /// Cards answer with these when the protecting data objects are absent
    /// or fail verification; the session is unusable afterwards.
    pub const fn is_secure_messaging_broken(&self) -> bool {
        self.to_u16() == 0x6987 || self.to_u16() == 0x6988
    }

    /// A terminal-side description of the status, for diagnostics
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Normal processing",
            (0x61, _) => "More response bytes available",
            (0x63, 0x00) => "Authentication failed",
            (0x63, n) if (n & 0xF0) == 0xC0 => "Retry counter",
            (0x67, 0x00) => "Wrong length field",
            (0x68, 0x82) => "Secure messaging not supported",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x83) => "Authentication method blocked",
            (0x69, 0x85) => "Conditions of use not satisfied",
            (0x69, 0x87) => "Secure messaging objects missing",
            (0x69, 0x88) => "Secure messaging objects incorrect",
            (0x6A, 0x80) => "Wrong data field",
            (0x6A, 0x82) => "File or application not found",
            (0x6A, 0x86) => "Wrong P1-P2 parameters",
            (0x6A, 0x88) => "Referenced data not found",
            (0x6B, 0x00) => "Invalid P1-P2 parameters",
            (0x6D, 0x00) => "Instruction not supported",
            (0x6E, 0x00) => "Class not supported",
            _ => "Unknown status",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self::new(sw1, sw2)
    }
}

impl From<u16> for StatusWord {
    fn from(status: u16) -> Self {
        Self::from_u16(status)
    }
}

impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self {
        status.to_u16()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.to_u16())
    }
}

/// The status words the protocol layer checks for
pub mod common {
    use super::StatusWord;

    /// Normal processing (90 00)
    pub const SUCCESS: StatusWord = StatusWord::from_u16(0x9000);

    /// Authentication failed (63 00)
    pub const AUTHENTICATION_FAILED: StatusWord = StatusWord::from_u16(0x6300);

    /// Security status not satisfied (69 82)
    pub const SECURITY_STATUS_NOT_SATISFIED: StatusWord = StatusWord::from_u16(0x6982);

    /// Referenced data not found (6A 88)
    pub const REFERENCED_DATA_NOT_FOUND: StatusWord = StatusWord::from_u16(0x6A88);

    /// Secure messaging data objects incorrect (69 88)
    pub const SM_OBJECTS_INCORRECT: StatusWord = StatusWord::from_u16(0x6988);
}
