//! Property tests for the key derivation and envelope codec.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use embed_resolver_core::envelope::HEADER_LEN;
use embed_resolver_core::{cipher, derive, envelope, CryptoError, Salt};
use proptest::prelude::*;

fn passphrase() -> impl Strategy<Value = String> {
    "[ -~]{1,32}"
}

proptest! {
    #[test]
    fn kdf_is_deterministic(
        pass in prop::collection::vec(any::<u8>(), 0..64),
        salt in any::<[u8; 8]>(),
        key_len in 0usize..64,
        iv_len in 0usize..32,
    ) {
        let a = derive(&pass, &salt, key_len, iv_len);
        let b = derive(&pass, &salt, key_len, iv_len);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.key().len(), key_len);
        prop_assert_eq!(a.iv().len(), iv_len);
    }

    #[test]
    fn envelope_roundtrip_bytes(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        pass in passphrase(),
    ) {
        let sealed = envelope::wrap(&plaintext, pass.as_str()).unwrap();
        let opened = envelope::unwrap(&sealed, pass.as_str()).unwrap();
        prop_assert_eq!(opened, plaintext);
    }

    #[test]
    fn envelope_roundtrip_unicode(text in "\\PC{0,64}", pass in passphrase()) {
        let sealed = envelope::wrap(text.as_bytes(), pass.as_str()).unwrap();
        let opened = envelope::unwrap_str(&sealed, pass.as_str()).unwrap();
        prop_assert_eq!(opened, text);
    }

    #[test]
    fn envelope_length_is_block_aligned(plaintext in prop::collection::vec(any::<u8>(), 0..256)) {
        let sealed = envelope::wrap(&plaintext, "k").unwrap();
        let raw = STANDARD.decode(&sealed).unwrap();
        prop_assert!(raw.len() >= HEADER_LEN + cipher::BLOCK_SIZE);
        prop_assert_eq!((raw.len() - HEADER_LEN) % cipher::BLOCK_SIZE, 0);
    }

    #[test]
    fn wrong_passphrase_never_panics(
        plaintext in prop::collection::vec(any::<u8>(), 0..128),
        k1 in passphrase(),
        k2 in passphrase(),
    ) {
        prop_assume!(k1 != k2);
        let sealed = envelope::wrap(&plaintext, k1.as_str()).unwrap();
        match envelope::unwrap(&sealed, k2.as_str()) {
            Ok(bytes) => prop_assert_ne!(bytes, plaintext),
            Err(e) => prop_assert!(matches!(e, CryptoError::Decrypt(_))),
        }
    }

    #[test]
    fn short_envelopes_are_typed_errors(raw in prop::collection::vec(any::<u8>(), 0..16)) {
        let encoded = STANDARD.encode(&raw);
        let err = envelope::unwrap(&encoded, "k").unwrap_err();
        let is_too_short = matches!(err, CryptoError::EnvelopeTooShort { len } if len == raw.len());
        prop_assert!(is_too_short);
    }

    #[test]
    fn same_salt_same_envelope(plaintext in prop::collection::vec(any::<u8>(), 0..64), salt in any::<[u8; 8]>()) {
        let a = envelope::wrap_with_salt(&plaintext, "k", Salt::from_bytes(salt)).unwrap();
        let b = envelope::wrap_with_salt(&plaintext, "k", Salt::from_bytes(salt)).unwrap();
        prop_assert_eq!(a, b);
    }
}
