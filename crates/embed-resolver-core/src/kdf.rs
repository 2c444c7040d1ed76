//! Passphrase-based key derivation compatible with OpenSSL's `EVP_BytesToKey`.
//!
//! One round per digest block:
//!
//! ```text
//! D_1 = H(passphrase || salt)
//! D_i = H(D_{i-1} || passphrase || salt)
//! key || iv = D_1 || D_2 || ...   (truncated to key_len + iv_len)
//! ```
//!
//! Every known provider uses MD5 with a 32-byte key and 16-byte IV, which is
//! what [`derive`] and [`derive_default`] produce. [`derive_with`] accepts any
//! RustCrypto digest.

use md5::{Digest, Md5};
use std::fmt;

/// Key length for AES-256.
pub const KEY_LEN: usize = 32;

/// IV length for AES in CBC mode.
pub const IV_LEN: usize = 16;

/// Key and IV derived from a passphrase and salt.
///
/// Computed fresh per operation. Never cache it: the salt changes per message.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKeyMaterial {
    key: Vec<u8>,
    iv: Vec<u8>,
}

impl DerivedKeyMaterial {
    /// The cipher key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The initialization vector.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Key followed by IV, as produced by the digest chain.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.key.len() + self.iv.len());
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&self.iv);
        out
    }
}

impl fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DerivedKeyMaterial(key: <{} bytes>, iv: <{} bytes>)",
            self.key.len(),
            self.iv.len()
        )
    }
}

/// Derive `key_len + iv_len` bytes with digest `D`.
///
/// Lengths need not be multiples of the digest size; the chain is cut at the
/// byte level.
pub fn derive_with<D: Digest>(
    passphrase: &[u8],
    salt: &[u8],
    key_len: usize,
    iv_len: usize,
) -> DerivedKeyMaterial {
    let total = key_len + iv_len;
    let mut material = Vec::with_capacity(total + <D as Digest>::output_size());
    let mut prev: Vec<u8> = Vec::new();

    while material.len() < total {
        let mut hasher = D::new();
        hasher.update(&prev);
        hasher.update(passphrase);
        hasher.update(salt);
        prev = hasher.finalize().to_vec();
        material.extend_from_slice(&prev);
    }

    let iv = material[key_len..total].to_vec();
    material.truncate(key_len);

    DerivedKeyMaterial { key: material, iv }
}

/// Derive key material with MD5.
pub fn derive(passphrase: &[u8], salt: &[u8], key_len: usize, iv_len: usize) -> DerivedKeyMaterial {
    derive_with::<Md5>(passphrase, salt, key_len, iv_len)
}

/// Derive a 256-bit key and 128-bit IV with MD5.
pub fn derive_default(passphrase: &[u8], salt: &[u8]) -> DerivedKeyMaterial {
    derive(passphrase, salt, KEY_LEN, IV_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn test_derive_known_vector() {
        // openssl enc -aes-256-cbc -md md5 -S 0102030405060708 -pass pass:playhq@2023@ -P
        let km = derive_default(b"playhq@2023@", &SALT);
        assert_eq!(
            hex::encode(km.key()),
            "37321d80df66949b114ec58279f53c0dc6fd4cc95bc0e0df6d103f96cb6c5f4d"
        );
        assert_eq!(hex::encode(km.iv()), "a45621d250fd9d6b8998a18cc43d56ee");
    }

    #[test]
    fn test_derive_deterministic() {
        let a = derive_default(b"secret", &SALT);
        let b = derive_default(b"secret", &SALT);
        assert_eq!(a, b);
        assert_eq!(a.to_bytes().len(), 48);
    }

    #[test]
    fn test_derive_short_lengths_are_prefixes() {
        let full = derive(b"secret", &SALT, 32, 16).to_bytes();
        let short = derive(b"secret", &SALT, 16, 16).to_bytes();
        assert_eq!(short, full[..32]);
    }

    #[test]
    fn test_derive_unaligned_lengths() {
        let full = derive(b"secret", &SALT, 32, 16).to_bytes();
        let odd = derive(b"secret", &SALT, 20, 7);
        assert_eq!(odd.key(), &full[..20]);
        assert_eq!(odd.iv(), &full[20..27]);
    }

    #[test]
    fn test_derive_salt_changes_output() {
        let a = derive_default(b"secret", &SALT);
        let b = derive_default(b"secret", &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_debug_redacts_material() {
        let km = derive_default(b"secret", &SALT);
        assert_eq!(
            format!("{:?}", km),
            "DerivedKeyMaterial(key: <32 bytes>, iv: <16 bytes>)"
        );
    }
}
