//! Two-key 3DES cipher suite for BAC-era secure messaging

use des::{Des, TdesEde2};
use zeroize::Zeroizing;

use super::{CryptoError, CryptoProvider, cbc_decrypt, cbc_encrypt, ecb_decrypt, ecb_encrypt, pad_to_block};

/// Null bytes used as the CBC IV (ICAO Doc 9303 part 11 §9.8.6.1)
const NULL_BYTES_8: [u8; 8] = [0; 8];

/// 3DES-EDE provider with 16-byte two-key session keys
///
/// Encryption is CBC with a zero IV; the MAC is ISO/IEC 9797-1 algorithm 3
/// (retail MAC) over the send sequence counter and the input, padded with
/// method 2.
#[derive(Default)]
pub struct TdesProvider {
    key: Zeroizing<Vec<u8>>,
    ssc: Vec<u8>,
}

impl TdesProvider {
    /// DES block size in bytes
    pub const BLOCK_SIZE: usize = 8;
    /// Session key length in bytes (two-key 3DES)
    pub const KEY_SIZE: usize = 16;

    /// Create a provider; keys arrive through [`CryptoProvider::init`]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CryptoProvider for TdesProvider {
    fn block_size(&self) -> usize {
        Self::BLOCK_SIZE
    }

    fn init(&mut self, key: &[u8], ssc: &[u8]) {
        self.key = Zeroizing::new(key.to_vec());
        self.ssc = ssc.to_vec();
    }

    fn encrypt(&mut self, plain: &[u8]) -> Result<Vec<u8>, CryptoError> {
        cbc_encrypt::<cbc::Encryptor<TdesEde2>>(&self.key, &NULL_BYTES_8, plain)
    }

    fn decrypt(&mut self, cipher: &[u8]) -> Result<Vec<u8>, CryptoError> {
        cbc_decrypt::<cbc::Decryptor<TdesEde2>>(&self.key, &NULL_BYTES_8, cipher)
    }

    fn get_mac(&mut self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut input = self.ssc.clone();
        input.extend_from_slice(data);
        retail_mac(&self.key, &pad_to_block(&input, Self::BLOCK_SIZE))
    }
}

/// ISO/IEC 9797-1 algorithm 3: single-DES CBC chaining with a 3DES final step
///
/// The input must already be padded to a multiple of eight bytes.
fn retail_mac(key: &[u8], padded: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != TdesProvider::KEY_SIZE {
        return Err(CryptoError::KeyLength {
            expected: TdesProvider::KEY_SIZE,
            actual: key.len(),
        });
    }
    let (key1, key2) = key.split_at(8);

    let mut state = ecb_encrypt::<ecb::Encryptor<Des>>(key1, &padded[..8])?;
    for block in padded[8..].chunks(8) {
        state = ecb_encrypt::<ecb::Encryptor<Des>>(key1, &xor_block(&state, block))?;
    }
    let state = ecb_decrypt::<ecb::Decryptor<Des>>(key2, &state)?;
    ecb_encrypt::<ecb::Encryptor<Des>>(key1, &state)
}

fn xor_block(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(&x, &y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // Session keys and counters from the ICAO Doc 9303 part 11 Appendix D
    // worked example.
    const KS_ENC: [u8; 16] = hex!("979EC13B1CBFE9DCD01AB0FED307EAE5");
    const KS_MAC: [u8; 16] = hex!("F1CB1F1FB5ADF208806B89DC579DC1F8");

    #[test]
    fn test_encrypt_select_data() {
        let mut provider = TdesProvider::new();
        provider.init(&KS_ENC, &hex!("887022120C06C227"));
        let ciphertext = provider.encrypt(&hex!("011E")).unwrap();
        assert_eq!(ciphertext, hex!("6375432908C044F6"));
    }

    #[test]
    fn test_decrypt_strips_padding() {
        let mut provider = TdesProvider::new();
        provider.init(&KS_ENC, &hex!("887022120C06C22A"));
        let plain = provider.decrypt(&hex!("9FF0EC34F9922651")).unwrap();
        assert_eq!(plain, hex!("60145F01"));
    }

    #[test]
    fn test_mac_over_padded_header_and_data_object() {
        let mut provider = TdesProvider::new();
        provider.init(&KS_MAC, &hex!("887022120C06C227"));
        // Padded command header followed by the complete DO87
        let input = hex!("0CA4020C80000000 8709016375432908C044F6");
        let mac = provider.get_mac(&input).unwrap();
        assert_eq!(mac, hex!("BF8B92D635FF24F8"));
    }

    #[test]
    fn test_mac_over_response_objects() {
        let mut provider = TdesProvider::new();
        provider.init(&KS_MAC, &hex!("887022120C06C228"));
        let mac = provider.get_mac(&hex!("99029000")).unwrap();
        assert_eq!(mac, hex!("FA855A5D4C50A8ED"));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut provider = TdesProvider::new();
        provider.init(&KS_ENC, &hex!("0000000000000001"));
        for len in [1usize, 7, 8, 9, 23] {
            let plain = vec![0x42; len];
            let ciphertext = provider.encrypt(&plain).unwrap();
            assert_eq!(ciphertext.len() % 8, 0);
            assert_eq!(provider.decrypt(&ciphertext).unwrap(), plain);
        }
    }

    #[test]
    fn test_rejects_wrong_key_length() {
        let mut provider = TdesProvider::new();
        provider.init(&hex!("0102030405060708"), &[0; 8]);
        assert!(matches!(
            provider.encrypt(&[0x01]),
            Err(CryptoError::KeyLength { expected: 16, .. })
        ));
        assert!(matches!(
            provider.get_mac(&[0x01]),
            Err(CryptoError::KeyLength { expected: 16, .. })
        ));
    }
}
