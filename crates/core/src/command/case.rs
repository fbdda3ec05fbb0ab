//! APDU command case classification
//!
//! ISO/IEC 7816-3 §12.1 defines seven shapes a serialized command APDU can
//! take, depending on the presence of a data field, an expected response
//! length, and short vs extended length encoding. Secure messaging needs to
//! know the exact case before it can rebuild a command, so the classifier
//! works on the raw bytes alone.

use super::error::CommandError;

/// The seven command APDU cases of ISO/IEC 7816-3 §12.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApduCase {
    /// Header only
    Case1,
    /// Header and short Le
    Case2s,
    /// Header and extended Le
    Case2e,
    /// Header, short Lc and data
    Case3s,
    /// Header, extended Lc and data
    Case3e,
    /// Header, short Lc, data and short Le
    Case4s,
    /// Header, extended Lc, data and extended Le
    Case4e,
}

impl ApduCase {
    /// Classify a serialized command APDU
    ///
    /// The decision is made from the total length and the length bytes
    /// alone; anything that fits no case is rejected.
    pub fn classify(raw: &[u8]) -> Result<Self, CommandError> {
        match raw.len() {
            0..=3 => {
                return Err(CommandError::MalformedApdu(
                    "shorter than a command header",
                ));
            }
            4 => return Ok(Self::Case1),
            5 => return Ok(Self::Case2s),
            _ => {}
        }

        let lc = raw[4] as usize;
        if lc != 0 {
            if raw.len() == 5 + lc {
                return Ok(Self::Case3s);
            }
            if raw.len() == 6 + lc {
                return Ok(Self::Case4s);
            }
            return Err(CommandError::MalformedApdu("short Lc does not match body"));
        }

        // Fifth byte zero: extended length encoding
        if raw.len() == 7 {
            return Ok(Self::Case2e);
        }
        if raw.len() >= 7 {
            let lc = ((raw[5] as usize) << 8) | raw[6] as usize;
            if lc != 0 {
                if raw.len() == 7 + lc {
                    return Ok(Self::Case3e);
                }
                if raw.len() == 9 + lc {
                    return Ok(Self::Case4e);
                }
            }
        }
        Err(CommandError::MalformedApdu(
            "extended length fields do not match body",
        ))
    }

    /// Whether this case carries a command data field
    pub const fn has_data(self) -> bool {
        matches!(self, Self::Case3s | Self::Case3e | Self::Case4s | Self::Case4e)
    }

    /// Whether this case expects response data
    pub const fn expects_response(self) -> bool {
        matches!(self, Self::Case2s | Self::Case2e | Self::Case4s | Self::Case4e)
    }

    /// Whether this case uses extended length encoding
    pub const fn is_extended(self) -> bool {
        matches!(self, Self::Case2e | Self::Case3e | Self::Case4e)
    }
}
