//! Key types, signatures and hybrid key wrapping.
//!
//! Keys are a tagged variant over the supported algorithms. Textual form is
//! `"<type> <base64>"`, e.g. `ed25519 q83v...`. An unrecognised tag is its own
//! error so callers can tell "unsupported algorithm" apart from "bad bytes".

mod keys;
pub mod symmetric;

pub use keys::{KeyPair, KeyType, PrivateKey, PublicKey};
pub use symmetric::{Iv, SymmetricKey};

use crate::MailError;

/// Crypto error types.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("unknown key type: {0}")]
    UnknownKeyType(String),
    #[error("{key_type} keys cannot {operation}")]
    UnsupportedOperation {
        key_type: KeyType,
        operation: &'static str,
    },
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("encryption failed: {0}")]
    Encrypt(String),
    #[error("decryption failed: {0}")]
    Decrypt(String),
    #[error("malformed ciphertext")]
    MalformedCiphertext,
}

impl From<CryptoError> for MailError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnknownKeyType(_) | CryptoError::InvalidKey(_) => {
                MailError::invalid_format("key", err.to_string())
            }
            CryptoError::InvalidSignature => MailError::AuthenticationFailed,
            other => MailError::Encryption(other.to_string()),
        }
    }
}
