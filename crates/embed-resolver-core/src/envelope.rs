//! Salted envelope in the OpenSSL `enc` layout.
//!
//! ```text
//! "Salted__" (8) | salt (8) | ciphertext (n * 16)
//! ```
//!
//! base64-encoded for transport. The salt travels inline, so the recipient
//! re-derives key and IV from the passphrase alone.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::cipher;
use crate::error::{CryptoError, Result};
use crate::kdf::derive_default;
use crate::types::{Passphrase, Salt, SALT_LEN};

/// The 8-byte marker that opens every envelope.
pub const MAGIC: &[u8; 8] = b"Salted__";

/// Marker plus salt.
pub const HEADER_LEN: usize = MAGIC.len() + SALT_LEN;

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Salt used to derive key and IV.
    pub salt: Salt,
    /// AES-CBC ciphertext.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Split raw envelope bytes into salt and ciphertext.
    ///
    /// The marker is not checked; some providers emit envelopes with a
    /// different prefix and the same layout.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN {
            return Err(CryptoError::EnvelopeTooShort { len: raw.len() });
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[MAGIC.len()..HEADER_LEN]);

        Ok(Self {
            salt: Salt(salt),
            ciphertext: raw[HEADER_LEN..].to_vec(),
        })
    }

    /// Decode base64 text and split it.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let raw = STANDARD.decode(encoded.trim())?;
        Self::parse(&raw)
    }

    /// Raw bytes: marker, salt, ciphertext.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// base64 of [`Envelope::to_bytes`].
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decrypt the ciphertext with a key derived from `passphrase` and the
    /// envelope's salt.
    pub fn open(&self, passphrase: Passphrase<'_>) -> Result<Vec<u8>> {
        let km = derive_default(passphrase.as_bytes(), self.salt.as_bytes());
        cipher::decrypt(&self.ciphertext, km.key(), km.iv())
    }

    /// Encrypt `plaintext` under `passphrase` with a given salt.
    pub fn seal(plaintext: &[u8], passphrase: Passphrase<'_>, salt: Salt) -> Result<Self> {
        let km = derive_default(passphrase.as_bytes(), salt.as_bytes());
        let ciphertext = cipher::encrypt(plaintext, km.key(), km.iv())?;
        Ok(Self { salt, ciphertext })
    }
}

/// Encrypt `plaintext` under `passphrase` with a fresh random salt.
pub fn wrap<'a>(plaintext: &[u8], passphrase: impl Into<Passphrase<'a>>) -> Result<String> {
    wrap_with_salt(plaintext, passphrase, Salt::generate())
}

/// Encrypt with a caller-chosen salt. Deterministic; meant for test vectors.
pub fn wrap_with_salt<'a>(
    plaintext: &[u8],
    passphrase: impl Into<Passphrase<'a>>,
    salt: Salt,
) -> Result<String> {
    Ok(Envelope::seal(plaintext, passphrase.into(), salt)?.to_base64())
}

/// Decode and decrypt an envelope.
pub fn unwrap<'a>(encoded: &str, passphrase: impl Into<Passphrase<'a>>) -> Result<Vec<u8>> {
    Envelope::from_base64(encoded)?.open(passphrase.into())
}

/// [`unwrap`], then require the plaintext to be UTF-8.
pub fn unwrap_str<'a>(encoded: &str, passphrase: impl Into<Passphrase<'a>>) -> Result<String> {
    let bytes = unwrap(encoded, passphrase)?;
    String::from_utf8(bytes)
        .map_err(|_| CryptoError::Decrypt("plaintext is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: Salt = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);

    #[test]
    fn test_wrap_known_vector() {
        let encoded = wrap_with_salt(b"1234|5678|1700000000000", "playhq@2023@", SALT).unwrap();
        assert_eq!(
            encoded,
            "U2FsdGVkX18BAgMEBQYHCF4p7hGQiqyVTCSzzVtj5n60Trao2MXp16TerVn1Sxaj"
        );
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let encoded = wrap("https://cdn.test/a.m3u8".as_bytes(), "k1").unwrap();
        assert!(encoded.starts_with("U2FsdGVkX1"));

        let decoded = unwrap_str(&encoded, "k1").unwrap();
        assert_eq!(decoded, "https://cdn.test/a.m3u8");
    }

    #[test]
    fn test_wrap_uses_fresh_salt() {
        let a = wrap(b"same", "k").unwrap();
        let b = wrap(b"same", "k").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_payload() {
        let encoded = wrap(b"", "k").unwrap();
        let raw = STANDARD.decode(&encoded).unwrap();
        assert_eq!(raw.len(), HEADER_LEN + 16);
        assert_eq!(&raw[..8], MAGIC);

        assert!(unwrap(&encoded, "k").unwrap().is_empty());
    }

    #[test]
    fn test_too_short_rejected() {
        // 15 raw bytes
        let encoded = STANDARD.encode([0u8; 15]);
        let err = unwrap(&encoded, "k").unwrap_err();
        assert!(matches!(err, CryptoError::EnvelopeTooShort { len: 15 }));

        let err = unwrap("", "k").unwrap_err();
        assert!(matches!(err, CryptoError::EnvelopeTooShort { len: 0 }));
    }

    #[test]
    fn test_header_only_is_decrypt_error() {
        let mut raw = MAGIC.to_vec();
        raw.extend_from_slice(SALT.as_bytes());
        let err = unwrap(&STANDARD.encode(raw), "k").unwrap_err();
        assert!(matches!(err, CryptoError::Decrypt(_)));
    }

    #[test]
    fn test_invalid_base64() {
        let err = unwrap("not base64!!", "k").unwrap_err();
        assert!(matches!(err, CryptoError::Base64(_)));
        assert!(err.is_decrypt());
    }

    #[test]
    fn test_marker_not_validated() {
        let sealed = Envelope::seal(b"data", Passphrase::from("k"), SALT).unwrap();
        let mut raw = sealed.to_bytes();
        raw[..8].copy_from_slice(b"XXXXXXXX");

        let parsed = Envelope::parse(&raw).unwrap();
        assert_eq!(parsed.open(Passphrase::from("k")).unwrap(), b"data");
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let encoded = wrap(b"data", "k").unwrap();
        let padded = format!("  {}\n", encoded);
        assert_eq!(unwrap(&padded, "k").unwrap(), b"data");
    }

    #[test]
    fn test_non_utf8_plaintext() {
        let encoded = wrap(&[0xff, 0xfe, 0x00], "k").unwrap();
        assert!(matches!(
            unwrap_str(&encoded, "k").unwrap_err(),
            CryptoError::Decrypt(_)
        ));
    }
}
