//! Proptest generators for property-based testing.

use proptest::prelude::*;

use embed_resolver_core::Salt;

/// A printable-ASCII passphrase, as sites embed them in scripts.
pub fn passphrase() -> impl Strategy<Value = String> {
    "[ -~]{1,32}"
}

/// A random salt.
pub fn salt() -> impl Strategy<Value = Salt> {
    any::<[u8; 8]>().prop_map(Salt::from_bytes)
}

/// Payload bytes up to `max_len`.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// A numeric site identifier (file id, user id).
pub fn identifier() -> impl Strategy<Value = String> {
    "[1-9][0-9]{0,11}"
}

/// Parameters of a resolver payload `idfile|idUser|timestamp`.
#[derive(Debug, Clone)]
pub struct PayloadParams {
    pub idfile: String,
    pub id_user: String,
    pub timestamp: u64,
    pub passphrase: String,
    pub salt: Salt,
}

impl PayloadParams {
    /// The plaintext payload.
    pub fn plaintext(&self) -> String {
        format!("{}|{}|{}", self.idfile, self.id_user, self.timestamp)
    }
}

impl Arbitrary for PayloadParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            identifier(),
            identifier(),
            0u64..=4_102_444_800_000u64, // up to 2100-01-01
            passphrase(),
            salt(),
        )
            .prop_map(|(idfile, id_user, timestamp, passphrase, salt)| PayloadParams {
                idfile,
                id_user,
                timestamp,
                passphrase,
                salt,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embed_resolver_core::{envelope, signature};

    proptest! {
        #[test]
        fn test_payload_roundtrip(params: PayloadParams) {
            let sealed = envelope::wrap_with_salt(
                params.plaintext().as_bytes(),
                params.passphrase.as_str(),
                params.salt,
            )
            .unwrap();
            let opened = envelope::unwrap_str(&sealed, params.passphrase.as_str()).unwrap();
            prop_assert_eq!(opened, params.plaintext());
        }

        #[test]
        fn test_signature_deterministic(params: PayloadParams) {
            let sealed = envelope::wrap_with_salt(
                params.plaintext().as_bytes(),
                params.passphrase.as_str(),
                params.salt,
            )
            .unwrap();
            let salt = format!("{}@{}", params.passphrase, params.idfile);
            prop_assert_eq!(signature::sign(&sealed, &salt), signature::sign(&sealed, &salt));
            prop_assert_eq!(signature::sign(&sealed, &salt).len(), 32);
        }

        #[test]
        fn test_salt_changes_envelope(p in payload(64), s1 in salt(), s2 in salt()) {
            prop_assume!(s1 != s2);
            let a = envelope::wrap_with_salt(&p, "k", s1).unwrap();
            let b = envelope::wrap_with_salt(&p, "k", s2).unwrap();
            prop_assert_ne!(a, b);
        }
    }
}
