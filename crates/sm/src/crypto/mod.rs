//! Cipher and MAC providers for secure messaging
//!
//! Secure messaging needs a block cipher in CBC mode plus an 8-byte MAC
//! keyed separately from the cipher. The engine talks to both through the
//! [`CryptoProvider`] trait; the 3DES provider covers BAC-era sessions and
//! the AES provider covers PACE and Chip Authentication sessions.

mod aes;
mod tdes;

pub use aes::AesProvider;
pub use tdes::TdesProvider;

use cipher::block_padding::{Iso7816, NoPadding};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use thiserror::Error;

/// Error type for cipher and MAC operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key length does not match the cipher
    #[error("invalid key length: expected {expected}, got {actual}")]
    KeyLength {
        /// Length the cipher requires
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Input is not a whole number of cipher blocks
    #[error("input is not block aligned: {0} bytes")]
    NotBlockAligned(usize),

    /// Decrypted data carries no valid ISO 7816-4 padding
    #[error("invalid padding")]
    Padding,
}

/// Cipher and MAC capability used by the secure messaging engine
///
/// [`init`](Self::init) configures the following operations with a key and
/// the current send sequence counter. The engine re-initializes before
/// every encrypt, decrypt and MAC computation, so a single provider serves
/// both session keys.
pub trait CryptoProvider {
    /// Cipher block size in bytes
    ///
    /// Also the width of the send sequence counter for this cipher suite.
    fn block_size(&self) -> usize;

    /// Configure key material and send sequence counter for subsequent operations
    fn init(&mut self, key: &[u8], ssc: &[u8]);

    /// Apply ISO 7816-4 padding and encrypt in CBC mode
    fn encrypt(&mut self, plain: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt in CBC mode and strip ISO 7816-4 padding
    fn decrypt(&mut self, cipher: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Pad with 0x80 and zero bytes up to the next block boundary
    fn add_padding(&self, data: &[u8]) -> Vec<u8> {
        pad_to_block(data, self.block_size())
    }

    /// Compute the 8-byte MAC over the send sequence counter followed by `data`
    ///
    /// The provider applies its own padding to the whole MAC input; callers
    /// pass the counter-less message and never pad twice.
    fn get_mac(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// ISO/IEC 9797-1 padding method 2: a 0x80 byte, then zeros to the block boundary
pub(crate) fn pad_to_block(data: &[u8], block_size: usize) -> Vec<u8> {
    let mut padded = data.to_vec();
    padded.push(0x80);
    while padded.len() % block_size != 0 {
        padded.push(0x00);
    }
    padded
}

/// Pad with ISO 7816-4 padding and CBC-encrypt
pub(crate) fn cbc_encrypt<CM>(key: &[u8], iv: &[u8], plain: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    CM: BlockEncryptMut + KeyIvInit,
{
    check_key_len(key, CM::key_size())?;
    Ok(CM::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Iso7816>(plain))
}

/// CBC-decrypt and strip ISO 7816-4 padding
pub(crate) fn cbc_decrypt<CM>(key: &[u8], iv: &[u8], cipher: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    CM: BlockDecryptMut + KeyIvInit,
{
    check_key_len(key, CM::key_size())?;
    if cipher.is_empty() || cipher.len() % CM::block_size() != 0 {
        return Err(CryptoError::NotBlockAligned(cipher.len()));
    }
    CM::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Iso7816>(cipher)
        .map_err(|_| CryptoError::Padding)
}

/// ECB-encrypt block-aligned data without padding
pub(crate) fn ecb_encrypt<CM>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    CM: BlockEncryptMut + KeyInit,
{
    check_key_len(key, CM::key_size())?;
    if data.len() % CM::block_size() != 0 {
        return Err(CryptoError::NotBlockAligned(data.len()));
    }
    Ok(CM::new(key.into()).encrypt_padded_vec_mut::<NoPadding>(data))
}

/// ECB-decrypt block-aligned data without stripping anything
pub(crate) fn ecb_decrypt<CM>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    CM: BlockDecryptMut + KeyInit,
{
    check_key_len(key, CM::key_size())?;
    if data.len() % CM::block_size() != 0 {
        return Err(CryptoError::NotBlockAligned(data.len()));
    }
    CM::new(key.into())
        .decrypt_padded_vec_mut::<NoPadding>(data)
        .map_err(|_| CryptoError::Padding)
}

fn check_key_len(key: &[u8], expected: usize) -> Result<(), CryptoError> {
    if key.len() != expected {
        return Err(CryptoError::KeyLength {
            expected,
            actual: key.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_to_block() {
        assert_eq!(pad_to_block(&[], 8), [0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            pad_to_block(&[0x01, 0x1E], 8),
            [0x01, 0x1E, 0x80, 0, 0, 0, 0, 0]
        );
        // Block-aligned input grows by a whole padding block
        let padded = pad_to_block(&[0xAA; 8], 8);
        assert_eq!(padded.len(), 16);
        assert_eq!(padded[8], 0x80);
        assert!(padded[9..].iter().all(|&b| b == 0));
    }
}
