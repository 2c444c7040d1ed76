//! Symmetric codec: AES in CBC mode with PKCS#7 padding.
//!
//! The key length picks the AES variant (16, 24 or 32 bytes). The IV is
//! always one block.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{CryptoError, Result};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt and pad `plaintext`.
///
/// The output is always a non-empty multiple of [`BLOCK_SIZE`]; an empty
/// plaintext produces one full padding block.
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let ciphertext = match key.len() {
        16 => Aes128CbcEnc::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        24 => Aes192CbcEnc::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        32 => Aes256CbcEnc::new_from_slices(key, iv)
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        n => {
            return Err(CryptoError::Encrypt(format!(
                "unsupported key length: {} bytes",
                n
            )))
        }
    };

    ciphertext.map_err(|_| CryptoError::Encrypt(format!("invalid IV length: {} bytes", iv.len())))
}

/// Decrypt `ciphertext` and strip its padding.
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Decrypt(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }

    let plaintext = match key.len() {
        16 => Aes128CbcDec::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)),
        24 => Aes192CbcDec::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)),
        32 => Aes256CbcDec::new_from_slices(key, iv)
            .map(|c| c.decrypt_padded_vec_mut::<Pkcs7>(ciphertext)),
        n => {
            return Err(CryptoError::Decrypt(format!(
                "unsupported key length: {} bytes",
                n
            )))
        }
    };

    match plaintext {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(_)) => Err(CryptoError::Decrypt("invalid padding".into())),
        Err(_) => Err(CryptoError::Decrypt(format!(
            "invalid IV length: {} bytes",
            iv.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::derive_default;

    const SALT: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn test_encrypt_known_vector() {
        let km = derive_default(b"playhq@2023@", &SALT);
        let ct = encrypt(b"1234|5678|1700000000000", km.key(), km.iv()).unwrap();
        assert_eq!(
            hex::encode(&ct),
            "5e29ee11908aac954c24b3cd5b63e67eb44eb6a8d8c5e9d7a4dead59f54b16a3"
        );
    }

    #[test]
    fn test_encrypt_decrypt() {
        let km = derive_default(b"playhq@2023@", &SALT);
        let plaintext = b"1234|5678|1700000000000";

        let ct = encrypt(plaintext, km.key(), km.iv()).unwrap();
        assert_ne!(&ct[..], &plaintext[..]);

        let pt = decrypt(&ct, km.key(), km.iv()).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn test_empty_plaintext_is_one_block() {
        let km = derive_default(b"k", &SALT);
        let ct = encrypt(b"", km.key(), km.iv()).unwrap();
        assert_eq!(ct.len(), BLOCK_SIZE);
        assert!(decrypt(&ct, km.key(), km.iv()).unwrap().is_empty());
    }

    #[test]
    fn test_aes128_key() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let ct = encrypt(b"short", &key, &iv).unwrap();
        assert_eq!(decrypt(&ct, &key, &iv).unwrap(), b"short");
    }

    #[test]
    fn test_bad_key_length() {
        let err = encrypt(b"x", &[0u8; 20], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::Encrypt(_)));

        let err = decrypt(&[0u8; 16], &[0u8; 20], &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt(_)));
    }

    #[test]
    fn test_bad_iv_length() {
        let err = encrypt(b"x", &[0u8; 32], &[0u8; 8]).unwrap_err();
        assert!(matches!(err, CryptoError::Encrypt(_)));
    }

    #[test]
    fn test_truncated_ciphertext() {
        let km = derive_default(b"k", &SALT);
        let ct = encrypt(b"hello world, this spans blocks", km.key(), km.iv()).unwrap();

        let err = decrypt(&ct[..ct.len() - 3], km.key(), km.iv()).unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt(_)));

        assert!(decrypt(&[], km.key(), km.iv()).is_err());
    }

    #[test]
    fn test_wrong_key_does_not_panic() {
        let a = derive_default(b"right", &SALT);
        let b = derive_default(b"wrong", &SALT);
        let ct = encrypt(b"payload", a.key(), a.iv()).unwrap();

        // Usually a padding failure; occasionally garbage that happens to unpad.
        if let Ok(pt) = decrypt(&ct, b.key(), b.iv()) {
            assert_ne!(pt, b"payload");
        }
    }
}
