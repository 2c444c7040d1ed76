//! Error types for embed-resolver core.

use thiserror::Error;

/// Errors from the symmetric codec and the salted envelope.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption could not be performed (bad key or IV length).
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// Decryption failed: bad key/IV length, truncated ciphertext, or padding mismatch.
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Decoded envelope is shorter than marker + salt.
    #[error("envelope too short: {len} bytes, need at least 16")]
    EnvelopeTooShort { len: usize },

    /// Envelope text is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CryptoError {
    /// Whether this error belongs to the decrypt side (wrong passphrase,
    /// corrupted or truncated input).
    pub fn is_decrypt(&self) -> bool {
        !matches!(self, CryptoError::Encrypt(_))
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
