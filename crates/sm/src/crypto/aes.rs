//! AES cipher suite for PACE and Chip Authentication secure messaging

use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockCipher, BlockEncryptMut};
use cmac::digest::KeyInit;
use cmac::{Cmac, Mac};
use zeroize::Zeroizing;

use super::{CryptoError, CryptoProvider, cbc_decrypt, cbc_encrypt, ecb_encrypt, pad_to_block};

/// AES provider for 128, 192 or 256 bit session keys
///
/// The key length selects the variant. The CBC IV is the current send
/// sequence counter encrypted with the session key in ECB mode (ICAO
/// Doc 9303 part 11); the MAC is AES-CMAC over the padded counter and
/// input, truncated to 8 bytes.
#[derive(Default)]
pub struct AesProvider {
    key: Zeroizing<Vec<u8>>,
    ssc: Vec<u8>,
}

impl AesProvider {
    /// AES block size in bytes
    pub const BLOCK_SIZE: usize = 16;
    /// Length of the truncated CMAC in bytes
    pub const MAC_SIZE: usize = 8;

    /// Create a provider; keys arrive through [`CryptoProvider::init`]
    pub fn new() -> Self {
        Self::default()
    }

    fn derive_iv(&self) -> Result<Vec<u8>, CryptoError> {
        match self.key.len() {
            16 => ecb_encrypt::<ecb::Encryptor<Aes128>>(&self.key, &self.ssc),
            24 => ecb_encrypt::<ecb::Encryptor<Aes192>>(&self.key, &self.ssc),
            32 => ecb_encrypt::<ecb::Encryptor<Aes256>>(&self.key, &self.ssc),
            n => Err(CryptoError::KeyLength {
                expected: 16,
                actual: n,
            }),
        }
    }
}

impl CryptoProvider for AesProvider {
    fn block_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    fn init(&mut self, key: &[u8], ssc: &[u8]) {
        self.key = Zeroizing::new(key.to_vec());
        self.ssc = ssc.to_vec();
    }

    fn encrypt(&mut self, plain: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv = self.derive_iv()?;
        match self.key.len() {
            16 => cbc_encrypt::<cbc::Encryptor<Aes128>>(&self.key, &iv, plain),
            24 => cbc_encrypt::<cbc::Encryptor<Aes192>>(&self.key, &iv, plain),
            _ => cbc_encrypt::<cbc::Encryptor<Aes256>>(&self.key, &iv, plain),
        }
    }

    fn decrypt(&mut self, cipher: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let iv = self.derive_iv()?;
        match self.key.len() {
            16 => cbc_decrypt::<cbc::Decryptor<Aes128>>(&self.key, &iv, cipher),
            24 => cbc_decrypt::<cbc::Decryptor<Aes192>>(&self.key, &iv, cipher),
            _ => cbc_decrypt::<cbc::Decryptor<Aes256>>(&self.key, &iv, cipher),
        }
    }

    fn get_mac(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut input = self.ssc.clone();
        input.extend_from_slice(data);
        let padded = pad_to_block(&input, Self::BLOCK_SIZE);

        let tag = match self.key.len() {
            16 => cmac_tag::<Aes128>(&self.key, &padded),
            24 => cmac_tag::<Aes192>(&self.key, &padded),
            32 => cmac_tag::<Aes256>(&self.key, &padded),
            n => {
                return Err(CryptoError::KeyLength {
                    expected: 16,
                    actual: n,
                });
            }
        }?;
        Ok(tag[..Self::MAC_SIZE].to_vec())
    }
}

fn cmac_tag<C>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    C: BlockCipher + BlockEncryptMut + Clone,
    cipher::Block<C>: dbl::Dbl,
    C::BlockSize: cmac::digest::generic_array::typenum::IsLess<
        cmac::digest::generic_array::typenum::U256,
    >,
    cmac::digest::generic_array::typenum::Le<
        C::BlockSize,
        cmac::digest::generic_array::typenum::U256,
    >: cmac::digest::generic_array::typenum::NonZero,
    Cmac<C>: Mac + KeyInit,
{
    let mut mac = <Cmac<C> as Mac>::new_from_slice(key).map_err(|_| CryptoError::KeyLength {
        expected: 16,
        actual: key.len(),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_iv_depends_on_counter() {
        let key = hex!("000102030405060708090A0B0C0D0E0F");
        let mut provider = AesProvider::new();

        provider.init(&key, &[0; 16]);
        let first = provider.encrypt(&[0x11; 4]).unwrap();

        let mut ssc = [0u8; 16];
        ssc[15] = 1;
        provider.init(&key, &ssc);
        let second = provider.encrypt(&[0x11; 4]).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip_all_key_sizes() {
        for key_len in [16usize, 24, 32] {
            let key = vec![0x2B; key_len];
            let mut provider = AesProvider::new();
            provider.init(&key, &[0x05; 16]);

            for len in [1usize, 15, 16, 17, 40] {
                let plain = vec![0x42; len];
                let ciphertext = provider.encrypt(&plain).unwrap();
                assert_eq!(ciphertext.len() % 16, 0);
                assert_eq!(provider.decrypt(&ciphertext).unwrap(), plain);
            }
        }
    }

    #[test]
    fn test_mac_is_truncated_and_counter_bound() {
        let key = hex!("000102030405060708090A0B0C0D0E0F");
        let mut provider = AesProvider::new();

        provider.init(&key, &[0; 16]);
        let first = provider.get_mac(&hex!("99029000")).unwrap();
        assert_eq!(first.len(), 8);

        let mut ssc = [0u8; 16];
        ssc[15] = 1;
        provider.init(&key, &ssc);
        let second = provider.get_mac(&hex!("99029000")).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_rejects_wrong_key_length() {
        let mut provider = AesProvider::new();
        provider.init(&[0x01; 10], &[0; 16]);
        assert!(matches!(
            provider.encrypt(&[0x01]),
            Err(CryptoError::KeyLength { .. })
        ));
    }
}
