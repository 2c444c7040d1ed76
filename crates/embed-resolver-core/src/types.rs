//! Strong types for key material.
//!
//! Salts and passphrases are newtypes so a salt is never passed where a
//! passphrase is expected and neither leaks through `Debug` output.

use rand::RngCore;
use std::fmt;

/// Length of an envelope salt in bytes.
pub const SALT_LEN: usize = 8;

/// An 8-byte salt carried inline in a salted envelope.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt(pub [u8; SALT_LEN]);

impl Salt {
    /// Generate a fresh salt from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Salt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; SALT_LEN]> for Salt {
    fn from(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Salt {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; SALT_LEN] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A site passphrase, borrowed from provider configuration.
///
/// Never stored by the core; supplied per call.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Passphrase<'a>(&'a [u8]);

impl<'a> Passphrase<'a> {
    /// Wrap raw passphrase bytes.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.0
    }
}

impl<'a> From<&'a str> for Passphrase<'a> {
    fn from(s: &'a str) -> Self {
        Self(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Passphrase<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl<'a> From<&'a String> for Passphrase<'a> {
    fn from(s: &'a String) -> Self {
        Self(s.as_bytes())
    }
}

impl fmt::Debug for Passphrase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase(<{} bytes>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_generate_differs() {
        // 2^-64 chance of a false failure
        assert_ne!(Salt::generate(), Salt::generate());
    }

    #[test]
    fn test_salt_from_slice() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let salt = Salt::try_from(&bytes[..]).unwrap();
        assert_eq!(salt.to_hex(), "0102030405060708");

        assert!(Salt::try_from(&bytes[..7]).is_err());
    }

    #[test]
    fn test_passphrase_debug_redacts() {
        let pass = Passphrase::from("playhq@2023@");
        let debug = format!("{:?}", pass);
        assert!(!debug.contains("playhq"));
        assert_eq!(debug, "Passphrase(<12 bytes>)");
    }
}
