//! APDU command definitions
//!
//! This module provides the command APDU type and its serialization
//! according to ISO/IEC 7816-3 §12.1, covering all seven command cases in
//! both short and extended length form.

pub mod case;
pub mod error;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use case::ApduCase;
use error::CommandError;

/// Largest expected response length expressible in short form (Le = 0x00)
pub const NE_SHORT_MAX: u32 = 256;

/// Largest expected response length expressible in extended form (Le = 0x0000)
pub const NE_EXTENDED_MAX: u32 = 65_536;

/// Command APDU
///
/// Holds the four header bytes, an optional data field and an optional
/// expected response length Ne. Ne is stored exactly (1..=65536); the
/// serializer picks the wire encoding, so `Le = 0x00` round-trips as
/// `Ne = 256` and an extended `Le = 0x0000` as `Ne = 65536`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte (CLA)
    cla: u8,
    /// Instruction byte (INS)
    ins: u8,
    /// Parameter 1 (P1)
    p1: u8,
    /// Parameter 2 (P2)
    p2: u8,
    /// Command data field
    data: Option<Bytes>,
    /// Expected response length (Ne)
    ne: Option<u32>,
}

impl Command {
    /// Create a new command with the given header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            ne: None,
        }
    }

    /// Attach a data field to the command
    ///
    /// An empty data field is treated as absent. Data fields longer than
    /// 65535 bytes do not fit even the extended Lc and are rejected.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Result<Self, CommandError> {
        let data = data.into();
        if data.len() > 65_535 {
            return Err(CommandError::DataTooLong(data.len()));
        }
        self.data = if data.is_empty() { None } else { Some(data) };
        Ok(self)
    }

    /// Set the expected response length Ne (1..=65536)
    pub fn with_le(mut self, ne: u32) -> Result<Self, CommandError> {
        if !(1..=NE_EXTENDED_MAX).contains(&ne) {
            return Err(CommandError::InvalidLe(ne));
        }
        self.ne = Some(ne);
        Ok(self)
    }

    /// Get the class byte (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Get the instruction byte (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// Get the P1 parameter
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Get the P2 parameter
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Get the command data field, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Get the expected response length Ne, if any
    pub const fn expected_length(&self) -> Option<u32> {
        self.ne
    }

    /// Whether the instruction byte is odd
    ///
    /// Odd instructions carry BER-TLV encoded data fields per ISO 7816-4
    /// and are treated differently under secure messaging.
    pub const fn has_odd_instruction(&self) -> bool {
        self.ins & 0x01 == 0x01
    }

    /// Whether this command requires extended length encoding
    pub fn is_extended(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.len() > 255)
            || self.ne.is_some_and(|ne| ne > NE_SHORT_MAX)
    }

    /// Serialize to raw bytes per ISO 7816-3 §12.1
    pub fn to_bytes(&self) -> Bytes {
        let data_len = self.data.as_ref().map_or(0, |d| d.len());
        let extended = self.is_extended();

        let mut buf = BytesMut::with_capacity(4 + 3 + data_len + 2);
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);

        if let Some(data) = &self.data {
            if extended {
                buf.put_u8(0x00);
                buf.put_u16(data.len() as u16);
            } else {
                buf.put_u8(data.len() as u8);
            }
            buf.put_slice(data);
        }

        if let Some(ne) = self.ne {
            if extended {
                // An extended Le without a data field carries its own
                // leading zero byte.
                if self.data.is_none() {
                    buf.put_u8(0x00);
                }
                buf.put_u16((ne % NE_EXTENDED_MAX) as u16);
            } else {
                buf.put_u8((ne % NE_SHORT_MAX) as u8);
            }
        }

        let raw = buf.freeze();
        trace!(command = %hex::encode(&raw), "Serialized command APDU");
        raw
    }

    /// Parse a serialized command by classifying its case
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CommandError> {
        let case = ApduCase::classify(raw)?;
        let header = Self::new(raw[0], raw[1], raw[2], raw[3]);

        let command = match case {
            ApduCase::Case1 => header,
            ApduCase::Case2s => header.with_le(decode_short_ne(raw[4]))?,
            ApduCase::Case3s => header.with_data(Bytes::copy_from_slice(&raw[5..]))?,
            ApduCase::Case4s => {
                let lc = raw[4] as usize;
                header
                    .with_data(Bytes::copy_from_slice(&raw[5..5 + lc]))?
                    .with_le(decode_short_ne(raw[5 + lc]))?
            }
            ApduCase::Case2e => header.with_le(decode_extended_ne(raw[5], raw[6]))?,
            ApduCase::Case3e => header.with_data(Bytes::copy_from_slice(&raw[7..]))?,
            ApduCase::Case4e => {
                let lc = ((raw[5] as usize) << 8) | raw[6] as usize;
                header
                    .with_data(Bytes::copy_from_slice(&raw[7..7 + lc]))?
                    .with_le(decode_extended_ne(raw[7 + lc], raw[8 + lc]))?
            }
        };
        Ok(command)
    }
}

const fn decode_short_ne(le: u8) -> u32 {
    if le == 0 { NE_SHORT_MAX } else { le as u32 }
}

const fn decode_extended_ne(hi: u8, lo: u8) -> u32 {
    let ne = ((hi as u32) << 8) | lo as u32;
    if ne == 0 { NE_EXTENDED_MAX } else { ne }
}
