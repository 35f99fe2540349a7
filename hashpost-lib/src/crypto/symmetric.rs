//! Per-item AES-256-GCM keys.
//!
//! Every block, attachment and catalog gets its own [`SymmetricKey`] and
//! [`Iv`]. Nothing is derived from a shared master, so one leaked key opens
//! exactly one item.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;
use crate::encoding;

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the GCM nonce in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Random AES-256 key, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("expected {KEY_SIZE} key bytes")))?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt `plaintext` under this key and `iv`. Output is ciphertext || tag.
    pub fn encrypt(&self, iv: &Iv, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(&iv.0), plaintext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))
    }

    /// Decrypt and authenticate.
    pub fn decrypt(&self, iv: &Iv, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::MalformedCiphertext);
        }
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&iv.0), ciphertext)
            .map_err(|_| CryptoError::Decrypt("authentication failed".to_string()))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

impl Serialize for SymmetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encoding::to_base64(self.0))
    }
}

impl<'de> Deserialize<'de> for SymmetricKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = encoding::from_base64("key", &s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Random GCM nonce.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    pub fn generate() -> Self {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        Self(iv)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let iv: [u8; IV_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::MalformedCiphertext)?;
        Ok(Self(iv))
    }

    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iv({})", hex::encode(self.0))
    }
}

impl Serialize for Iv {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encoding::to_base64(self.0))
    }
}

impl<'de> Deserialize<'de> for Iv {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = encoding::from_base64("iv", &s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt() {
        let key = SymmetricKey::generate();
        let iv = Iv::generate();
        let ct = key.encrypt(&iv, b"block content").unwrap();
        assert_eq!(ct.len(), b"block content".len() + TAG_SIZE);
        assert_eq!(key.decrypt(&iv, &ct).unwrap(), b"block content");
    }

    #[test]
    fn wrong_key_or_iv_fails() {
        let key = SymmetricKey::generate();
        let iv = Iv::generate();
        let ct = key.encrypt(&iv, b"secret").unwrap();

        assert!(SymmetricKey::generate().decrypt(&iv, &ct).is_err());
        assert!(key.decrypt(&Iv::generate(), &ct).is_err());
        assert!(matches!(
            key.decrypt(&iv, &ct[..4]),
            Err(CryptoError::MalformedCiphertext)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = SymmetricKey::generate();
        let iv = Iv::generate();
        let mut ct = key.encrypt(&iv, b"secret").unwrap();
        ct[0] ^= 0x01;
        assert!(key.decrypt(&iv, &ct).is_err());
    }

    #[test]
    fn serde_as_base64() {
        let key = SymmetricKey::generate();
        let json = serde_json::to_string(&key).unwrap();
        let back: SymmetricKey = serde_json::from_str(&json).unwrap();
        assert!(back == key);
        assert!(serde_json::from_str::<SymmetricKey>("\"AAAA\"").is_err());
        assert_eq!(format!("{key:?}"), "SymmetricKey(..)");
    }
}
