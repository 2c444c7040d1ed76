//! # Embed Resolver Core
//!
//! Pure primitives for recovering stream links from obfuscated embed pages:
//! passphrase key derivation, AES-CBC, salted envelopes and request signatures.
//!
//! This crate contains no I/O, no networking. Every function runs to
//! completion synchronously.
//!
//! ## Stages
//!
//! - [`kdf`] - OpenSSL `EVP_BytesToKey` derivation (MD5, one round per block)
//! - [`cipher`] - AES-CBC with PKCS#7 padding
//! - [`envelope`] - `"Salted__" | salt | ciphertext`, base64 for transport
//! - [`signature`] - hex MD5 over ciphertext and a salt string
//!
//! ## Usage
//!
//! ```rust
//! use embed_resolver_core::envelope;
//!
//! let sealed = envelope::wrap(b"1234|5678|1700000000000", "site-passphrase").unwrap();
//! let opened = envelope::unwrap_str(&sealed, "site-passphrase").unwrap();
//! assert_eq!(opened, "1234|5678|1700000000000");
//! ```

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod signature;
pub mod types;

pub use envelope::{unwrap, unwrap_str, wrap, wrap_with_salt, Envelope};
pub use error::{CryptoError, Result};
pub use kdf::{derive, derive_default, derive_with, DerivedKeyMaterial, IV_LEN, KEY_LEN};
pub use types::{Passphrase, Salt, SALT_LEN};
