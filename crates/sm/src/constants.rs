//! Constants used by the TR-03110 protocol layer
//!
//! Tag assignments, class and instruction bytes, and the protocol object
//! identifiers from BSI TR-03110 part 3.

/// Command classes
pub mod cla {
    /// Plain ISO 7816 command class
    pub const ISO7816: u8 = 0x00;
    /// Secure messaging mask: command header included in authentication
    pub const SECURE_MESSAGING: u8 = 0x0C;
}

/// Instruction codes
pub mod ins {
    /// MANAGE SECURITY ENVIRONMENT command
    pub const MANAGE_SECURITY_ENVIRONMENT: u8 = 0x22;
    /// EXTERNAL AUTHENTICATE command
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// GENERAL AUTHENTICATE command
    pub const GENERAL_AUTHENTICATE: u8 = 0x86;
}

/// Parameter values for MANAGE SECURITY ENVIRONMENT (P2)
pub mod mse_p2 {
    /// Set Authentication Template
    pub const SET_AT: u8 = 0xA4;
}

/// Context-specific data object tags
pub mod tags {
    /// Cryptographic mechanism reference (protocol OID)
    pub const CRYPTOGRAPHIC_MECHANISM: u8 = 0x80;
    /// Public / shared-secret key reference
    pub const KEY_REFERENCE: u8 = 0x83;
    /// Private key / domain parameter reference
    pub const PRIVATE_KEY_REFERENCE: u8 = 0x84;
    /// Encrypted data without padding-content indicator (odd instruction)
    pub const ENCRYPTED_DATA: u8 = 0x85;
    /// Encrypted data with padding-content indicator (even instruction)
    pub const ENCRYPTED_DATA_WITH_INDICATOR: u8 = 0x87;
    /// Compressed ephemeral public key
    pub const EPHEMERAL_PUBLIC_KEY: u8 = 0x91;
    /// Protected expected response length
    pub const EXPECTED_LENGTH: u8 = 0x97;
    /// Processing status of a protected response
    pub const PROCESSING_STATUS: u8 = 0x99;
    /// Cryptographic checksum
    pub const CRYPTOGRAPHIC_CHECKSUM: u8 = 0x8E;
    /// Auxiliary authenticated data (not supported)
    pub const AUXILIARY_DATA: u8 = 0x67;
    /// Certificate holder authorization template (two-byte tag)
    pub const CHAT: [u8; 2] = [0x7F, 0x4C];
}

/// Protocol object identifiers from BSI TR-03110 part 3, in dotted-decimal
/// form as accepted by [`crate::MseSetAt::set_protocol`]
pub mod oids {
    /// PACE with DH generic mapping and 3DES-CBC session cipher
    pub const ID_PACE_DH_GM_3DES_CBC_CBC: &str = "0.4.0.127.0.7.2.2.4.1.1";
    /// PACE with DH generic mapping and AES-128 session cipher
    pub const ID_PACE_DH_GM_AES_CBC_CMAC_128: &str = "0.4.0.127.0.7.2.2.4.1.2";
    /// PACE with DH generic mapping and AES-192 session cipher
    pub const ID_PACE_DH_GM_AES_CBC_CMAC_192: &str = "0.4.0.127.0.7.2.2.4.1.3";
    /// PACE with DH generic mapping and AES-256 session cipher
    pub const ID_PACE_DH_GM_AES_CBC_CMAC_256: &str = "0.4.0.127.0.7.2.2.4.1.4";
    /// PACE with ECDH generic mapping and 3DES-CBC session cipher
    pub const ID_PACE_ECDH_GM_3DES_CBC_CBC: &str = "0.4.0.127.0.7.2.2.4.2.1";
    /// PACE with ECDH generic mapping and AES-128 session cipher
    pub const ID_PACE_ECDH_GM_AES_CBC_CMAC_128: &str = "0.4.0.127.0.7.2.2.4.2.2";
    /// PACE with ECDH generic mapping and AES-192 session cipher
    pub const ID_PACE_ECDH_GM_AES_CBC_CMAC_192: &str = "0.4.0.127.0.7.2.2.4.2.3";
    /// PACE with ECDH generic mapping and AES-256 session cipher
    pub const ID_PACE_ECDH_GM_AES_CBC_CMAC_256: &str = "0.4.0.127.0.7.2.2.4.2.4";
    /// Chip Authentication with ECDH and 3DES-CBC session cipher
    pub const ID_CA_ECDH_3DES_CBC_CBC: &str = "0.4.0.127.0.7.2.2.3.2.1";
    /// Chip Authentication with ECDH and AES-128 session cipher
    pub const ID_CA_ECDH_AES_CBC_CMAC_128: &str = "0.4.0.127.0.7.2.2.3.2.2";
    /// Chip Authentication with ECDH and AES-192 session cipher
    pub const ID_CA_ECDH_AES_CBC_CMAC_192: &str = "0.4.0.127.0.7.2.2.3.2.3";
    /// Chip Authentication with ECDH and AES-256 session cipher
    pub const ID_CA_ECDH_AES_CBC_CMAC_256: &str = "0.4.0.127.0.7.2.2.3.2.4";
    /// Terminal Authentication
    pub const ID_TA: &str = "0.4.0.127.0.7.2.2.2";
}
