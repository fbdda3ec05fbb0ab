//! MSE:Set AT command construction
//!
//! MANAGE SECURITY ENVIRONMENT: Set Authentication Template selects one of
//! the three access protocols (PACE, Chip Authentication, Terminal
//! Authentication) on the card and supplies its parameters as a
//! concatenation of BER-TLV data objects.

use bytes::{BufMut, BytesMut};
use const_oid::ObjectIdentifier;

use mrtd_apdu_core::Command;

use crate::constants::{cla, ins, mse_p2, tags};
use crate::data_object::put_length;
use crate::error::{Error, Result};

/// Authentication template selected through P1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTemplate {
    /// Password Authenticated Connection Establishment
    Pace,
    /// Chip Authentication
    ChipAuthentication,
    /// Terminal Authentication
    TerminalAuthentication,
}

impl AuthTemplate {
    const fn p1(self) -> u8 {
        match self {
            Self::Pace => 0xC1,
            Self::ChipAuthentication => 0x41,
            Self::TerminalAuthentication => 0x81,
        }
    }
}

/// Password to authenticate with during PACE (tag 0x83)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyReference {
    /// Key derived from the machine readable zone
    Mrz = 1,
    /// Card access number
    Can = 2,
    /// Personal identification number
    Pin = 3,
    /// PIN unblock key
    Puk = 4,
}

/// Builder for the MSE:Set AT command APDU
///
/// All fields are optional and last-write-wins. [`to_command`](Self::to_command)
/// emits the set fields in the canonical order 0x80, 0x83, 0x84, 0x91,
/// 0x7F4C regardless of the order they were set; when both forms of the
/// 0x83 key reference are present they appear in the order they were set.
///
/// Without a template the command carries `P1 = 0x00`, which no card
/// accepts; callers are expected to select one.
#[derive(Debug, Default, Clone)]
pub struct MseSetAt {
    p1: u8,
    protocol: Option<Vec<u8>>,
    key_reference: Option<(u32, Vec<u8>)>,
    key_reference_name: Option<(u32, Vec<u8>)>,
    private_key_reference: Option<Vec<u8>>,
    ephemeral_public_key: Option<Vec<u8>>,
    chat: Option<Vec<u8>>,
    sequence: u32,
}

impl MseSetAt {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the authentication template, fixing P1
    pub fn set_template(&mut self, template: AuthTemplate) -> &mut Self {
        self.p1 = template.p1();
        self
    }

    /// Set the protocol OID (tag 0x80) from its dotted-decimal form
    ///
    /// The known protocol identifiers live in [`crate::constants::oids`].
    /// An unparseable OID is reported immediately.
    pub fn set_protocol(&mut self, protocol: &str) -> Result<&mut Self> {
        let oid: ObjectIdentifier = protocol
            .parse()
            .map_err(|_| Error::InvalidOid("not a dotted-decimal object identifier"))?;
        self.protocol = Some(encode_object(tags::CRYPTOGRAPHIC_MECHANISM, oid.as_bytes()));
        Ok(self)
    }

    /// Reference the password to authenticate with (tag 0x83)
    pub fn set_key_reference(&mut self, reference: KeyReference) -> &mut Self {
        let content = integer_content(reference as u32);
        let object = encode_object(tags::KEY_REFERENCE, &content);
        self.key_reference = Some((self.next_sequence(), object));
        self
    }

    /// Reference a terminal key by name (tag 0x83)
    ///
    /// The name is carried verbatim; callers encode it as ISO 8859-1.
    pub fn set_key_reference_name(&mut self, name: &[u8]) -> &mut Self {
        let object = encode_object(tags::KEY_REFERENCE, name);
        self.key_reference_name = Some((self.next_sequence(), object));
        self
    }

    /// Reference a private key or domain parameter set by index (tag 0x84)
    pub fn set_private_key_reference(&mut self, reference: u32) -> &mut Self {
        let content = integer_content(reference);
        self.private_key_reference = Some(encode_object(tags::PRIVATE_KEY_REFERENCE, &content));
        self
    }

    /// Supply the compressed ephemeral public key (tag 0x91)
    ///
    /// The key must already be compressed per TR-03110 A.2.2.3.
    pub fn set_ephemeral_public_key(&mut self, public_key: &[u8]) -> &mut Self {
        self.ephemeral_public_key = Some(encode_object(tags::EPHEMERAL_PUBLIC_KEY, public_key));
        self
    }

    /// Supply the certificate holder authorization template value (tag 0x7F4C)
    ///
    /// `chat` is the pre-encoded template content; only the outer tag and
    /// length are added here.
    pub fn set_chat(&mut self, chat: &[u8]) -> &mut Self {
        let mut buf = BytesMut::with_capacity(4 + chat.len());
        buf.put_slice(&tags::CHAT);
        put_length(&mut buf, chat.len());
        buf.put_slice(chat);
        self.chat = Some(buf.to_vec());
        self
    }

    /// Auxiliary authenticated data (tag 0x67) is not implemented
    pub fn set_auxiliary_authenticated_data(&mut self) -> Result<&mut Self> {
        Err(Error::Unsupported("auxiliary authenticated data"))
    }

    /// Emit the command APDU
    ///
    /// Field encoding problems surface here: a body that outgrows the
    /// extended-length data field is an error rather than a truncated
    /// command.
    pub fn to_command(&self) -> Result<Command> {
        let mut body = BytesMut::new();

        if let Some(object) = &self.protocol {
            body.put_slice(object);
        }
        let mut references: Vec<&(u32, Vec<u8>)> = self
            .key_reference
            .iter()
            .chain(self.key_reference_name.iter())
            .collect();
        references.sort_by_key(|entry| entry.0);
        for (_, object) in references {
            body.put_slice(object);
        }
        if let Some(object) = &self.private_key_reference {
            body.put_slice(object);
        }
        if let Some(object) = &self.ephemeral_public_key {
            body.put_slice(object);
        }
        if let Some(object) = &self.chat {
            body.put_slice(object);
        }

        let command = Command::new(
            cla::ISO7816,
            ins::MANAGE_SECURITY_ENVIRONMENT,
            self.p1,
            mse_p2::SET_AT,
        )
        .with_data(body.freeze())?;
        Ok(command)
    }

    fn next_sequence(&mut self) -> u32 {
        self.sequence += 1;
        self.sequence
    }
}

fn encode_object(tag: u8, value: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(4 + value.len());
    buf.put_u8(tag);
    put_length(&mut buf, value.len());
    buf.put_slice(value);
    buf.to_vec()
}

/// Minimal content octets of a non-negative DER INTEGER
fn integer_content(value: u32) -> Vec<u8> {
    let be = value.to_be_bytes();
    let first = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    let mut content = Vec::with_capacity(5);
    if be[first] & 0x80 != 0 {
        content.push(0x00);
    }
    content.extend_from_slice(&be[first..]);
    content
}
