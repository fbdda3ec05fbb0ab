//! BSI TR-03110 protocol layer for eMRTD terminals
//!
//! This crate implements the two subsystems a terminal needs once session
//! keys have been agreed with an electronic passport:
//!
//! - **Secure messaging**: the symmetric transform that turns a plain
//!   command APDU into an authenticated-and-encrypted one (data objects
//!   DO85/DO87/DO97/DO8E) and reverses the transform for protected
//!   responses (DO87/DO99/DO8E), maintaining the send sequence counter
//!   across the session.
//! - **MSE:Set AT construction**: the MANAGE SECURITY ENVIRONMENT command
//!   that selects PACE, Chip Authentication or Terminal Authentication and
//!   carries protocol OIDs, key references, ephemeral public keys and
//!   certificate holder authorization templates.
//!
//! Key agreement, certificate validation and the card transport are out of
//! scope; the secure messaging engine is handed session keys, an initial
//! counter value and a [`crypto::CryptoProvider`] and works purely on
//! APDUs.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod constants;
pub mod crypto;
pub mod data_object;
pub mod secure_messaging;

mod error;
pub use error::{Error, Result};

pub use commands::{AuthTemplate, KeyReference, MseSetAt};
pub use crypto::{AesProvider, CryptoError, CryptoProvider, TdesProvider};
pub use secure_messaging::{Keys, SecureMessaging};
