//! Golden test vectors for the key derivation, envelope and signature.
//!
//! Every value here matches `openssl enc -aes-256-cbc -md md5` output, so a
//! site's own script and this implementation agree bit-for-bit.

use embed_resolver_core::{derive, envelope, signature, Salt};

/// Salt shared by the vectors.
pub const SALT: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

/// Passphrase shared by the vectors.
pub const PASSPHRASE: &str = "playhq@2023@";

/// A key-derivation vector.
#[derive(Debug, Clone)]
pub struct KdfVector {
    pub name: &'static str,
    pub passphrase: &'static str,
    pub salt: [u8; 8],
    pub key_len: usize,
    pub iv_len: usize,
    /// Expected key (hex).
    pub key: &'static str,
    /// Expected IV (hex).
    pub iv: &'static str,
}

/// An envelope vector: `plaintext` sealed under `passphrase` with `salt`.
#[derive(Debug, Clone)]
pub struct EnvelopeVector {
    pub name: &'static str,
    pub passphrase: &'static str,
    pub salt: [u8; 8],
    pub plaintext: &'static str,
    /// Expected base64 envelope.
    pub envelope: &'static str,
}

/// A signature vector.
#[derive(Debug, Clone)]
pub struct SignatureVector {
    pub name: &'static str,
    pub ciphertext: &'static str,
    pub salt: &'static str,
    /// Expected hex digest.
    pub signature: &'static str,
}

/// Key-derivation vectors.
pub fn kdf_vectors() -> Vec<KdfVector> {
    vec![
        KdfVector {
            name: "AES-256 key and IV",
            passphrase: PASSPHRASE,
            salt: SALT,
            key_len: 32,
            iv_len: 16,
            key: "37321d80df66949b114ec58279f53c0dc6fd4cc95bc0e0df6d103f96cb6c5f4d",
            iv: "a45621d250fd9d6b8998a18cc43d56ee",
        },
        KdfVector {
            name: "AES-128 key and IV",
            passphrase: PASSPHRASE,
            salt: SALT,
            key_len: 16,
            iv_len: 16,
            key: "37321d80df66949b114ec58279f53c0d",
            iv: "c6fd4cc95bc0e0df6d103f96cb6c5f4d",
        },
    ]
}

/// Envelope vectors.
pub fn envelope_vectors() -> Vec<EnvelopeVector> {
    vec![
        EnvelopeVector {
            name: "resolver payload",
            passphrase: PASSPHRASE,
            salt: SALT,
            plaintext: "1234|5678|1700000000000",
            envelope: "U2FsdGVkX18BAgMEBQYHCF4p7hGQiqyVTCSzzVtj5n60Trao2MXp16TerVn1Sxaj",
        },
        EnvelopeVector {
            name: "media URL",
            passphrase: PASSPHRASE,
            salt: SALT,
            plaintext: "https://cdn.example/hls/master.m3u8",
            envelope: "U2FsdGVkX18BAgMEBQYHCF/payT5usD47H+pa8/GciR2CxDwwkQNTCmLKRksMNEllQI+X+vlPT/zgjBT9fEtqw==",
        },
    ]
}

/// Signature vectors.
pub fn signature_vectors() -> Vec<SignatureVector> {
    vec![
        SignatureVector {
            name: "short strings",
            ciphertext: "abc",
            salt: "salt",
            signature: "1e21f6da01c5047e4bf45b0496bd6937",
        },
        SignatureVector {
            name: "envelope with identifier salt",
            ciphertext: "U2FsdGVkX18BAgMEBQYHCF4p7hGQiqyVTCSzzVtj5n60Trao2MXp16TerVn1Sxaj",
            salt: "signkey@1234",
            signature: "48174a7c93cf0f033cfb25841b85dfa8",
        },
        SignatureVector {
            name: "empty input",
            ciphertext: "",
            salt: "",
            signature: "d41d8cd98f00b204e9800998ecf8427e",
        },
    ]
}

/// Check every vector; returns `(name, matches)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool)> {
    let kdf = kdf_vectors().into_iter().map(|v| {
        let km = derive(v.passphrase.as_bytes(), &v.salt, v.key_len, v.iv_len);
        let ok = hex::encode(km.key()) == v.key && hex::encode(km.iv()) == v.iv;
        (v.name.to_string(), ok)
    });

    let envelopes = envelope_vectors().into_iter().map(|v| {
        let sealed = envelope::wrap_with_salt(v.plaintext.as_bytes(), v.passphrase, Salt::from_bytes(v.salt));
        let opened = envelope::unwrap_str(v.envelope, v.passphrase);
        let ok = matches!(sealed, Ok(ref s) if s == v.envelope)
            && matches!(opened, Ok(ref p) if p == v.plaintext);
        (v.name.to_string(), ok)
    });

    let signatures = signature_vectors().into_iter().map(|v| {
        let ok = signature::sign(v.ciphertext, v.salt) == v.signature;
        (v.name.to_string(), ok)
    });

    kdf.chain(envelopes).chain(signatures).collect()
}
