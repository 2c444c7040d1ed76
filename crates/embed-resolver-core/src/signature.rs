//! Request signatures: one MD5 round over the transmitted ciphertext and a
//! site-specific salt string, hex-encoded.

use md5::{Digest, Md5};

/// Hex MD5 of `ciphertext || salt`.
pub fn sign(ciphertext: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(ciphertext.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a received signature, ignoring hex case.
pub fn verify(ciphertext: &str, salt: &str, signature: &str) -> bool {
    sign(ciphertext, salt).eq_ignore_ascii_case(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_value() {
        assert_eq!(sign("abc", "salt"), "1e21f6da01c5047e4bf45b0496bd6937");
    }

    #[test]
    fn test_sign_deterministic() {
        let a = sign("U2FsdGVkX18BAgMEBQYHCA==", "42@site#7");
        let b = sign("U2FsdGVkX18BAgMEBQYHCA==", "42@site#7");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_verify() {
        let sig = sign("ct", "s");
        assert!(verify("ct", "s", &sig));
        assert!(verify("ct", "s", &sig.to_uppercase()));
        assert!(!verify("ct", "other", &sig));
    }
}
