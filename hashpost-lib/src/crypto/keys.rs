//! Concrete key algorithms behind [`PublicKey`] and [`PrivateKey`].
//!
//! Ed25519 and X25519 keys are stored as their 32 raw bytes. ECDSA uses
//! P-384 with the private scalar and a SEC1 uncompressed public point. RSA
//! keys are PKCS#8 (private) and SPKI (public) DER documents.

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use p384::ecdsa::{
    Signature as EcdsaSignature, SigningKey as EcdsaSigningKey,
    VerifyingKey as EcdsaVerifyingKey,
};
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};
use rsa::pkcs1v15::{
    Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey,
};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::SignatureEncoding;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::symmetric::{IV_SIZE, TAG_SIZE};
use super::CryptoError;
use crate::encoding;

/// HKDF info string binding wrapped keys to this protocol.
const WRAP_INFO: &[u8] = b"hashpost-key-wrap-v1";

const KEY_LEN: usize = 32;

/// Modulus size for freshly generated RSA keys.
pub const RSA_BITS: usize = 2048;

/// Supported key algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Signing and (via its Montgomery form) key wrapping.
    Ed25519,
    /// Key wrapping only.
    X25519,
    /// ECDSA over P-384 with SHA-384. Signing only.
    Ecdsa,
    /// PKCS#1 v1.5 signatures and OAEP key wrapping, both over SHA-256.
    Rsa,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::X25519 => "x25519",
            Self::Ecdsa => "ecdsa",
            Self::Rsa => "rsa",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(Self::Ed25519),
            "x25519" => Ok(Self::X25519),
            "ecdsa" => Ok(Self::Ecdsa),
            "rsa" => Ok(Self::Rsa),
            other => Err(CryptoError::UnknownKeyType(other.to_string())),
        }
    }
}

fn invalid_key(err: impl fmt::Display) -> CryptoError {
    CryptoError::InvalidKey(err.to_string())
}

fn fixed(bytes: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("expected {KEY_LEN} key bytes")))
}

fn unsupported(key_type: KeyType, operation: &'static str) -> CryptoError {
    CryptoError::UnsupportedOperation {
        key_type,
        operation,
    }
}

fn split_encoded(s: &str) -> Result<(KeyType, Vec<u8>), CryptoError> {
    let (tag, body) = s
        .trim()
        .split_once(' ')
        .ok_or_else(|| CryptoError::InvalidKey("expected \"<type> <base64>\"".to_string()))?;
    let key_type: KeyType = tag.parse()?;
    let bytes = encoding::from_base64("key", body.trim()).map_err(invalid_key)?;
    Ok((key_type, bytes))
}

/// A public key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Validate `bytes` as a public key of `key_type`.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 => {
                VerifyingKey::from_bytes(&fixed(bytes)?).map_err(invalid_key)?;
            }
            KeyType::X25519 => {
                fixed(bytes)?;
            }
            KeyType::Ecdsa => {
                EcdsaVerifyingKey::from_sec1_bytes(bytes).map_err(invalid_key)?;
            }
            KeyType::Rsa => {
                RsaPublicKey::from_public_key_der(bytes).map_err(invalid_key)?;
            }
        }
        Ok(Self {
            key_type,
            bytes: bytes.to_vec(),
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        match self.key_type {
            KeyType::Ed25519 => {
                let key = VerifyingKey::from_bytes(&fixed(&self.bytes)?).map_err(invalid_key)?;
                let sig =
                    Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
                key.verify(message, &sig)
                    .map_err(|_| CryptoError::InvalidSignature)
            }
            KeyType::Ecdsa => {
                let key = EcdsaVerifyingKey::from_sec1_bytes(&self.bytes).map_err(invalid_key)?;
                let sig = EcdsaSignature::from_der(signature)
                    .map_err(|_| CryptoError::InvalidSignature)?;
                key.verify(message, &sig)
                    .map_err(|_| CryptoError::InvalidSignature)
            }
            KeyType::Rsa => {
                let key = RsaPublicKey::from_public_key_der(&self.bytes).map_err(invalid_key)?;
                let sig = RsaSignature::try_from(signature)
                    .map_err(|_| CryptoError::InvalidSignature)?;
                RsaVerifyingKey::<Sha256>::new(key)
                    .verify(message, &sig)
                    .map_err(|_| CryptoError::InvalidSignature)
            }
            KeyType::X25519 => Err(unsupported(self.key_type, "verify")),
        }
    }

    /// Wrap `plaintext` so only the matching private key can open it.
    ///
    /// Curve keys produce
    ///
    /// ```text
    /// [32 bytes ephemeral x25519 public][12 bytes nonce][ciphertext + 16 byte tag]
    /// ```
    ///
    /// RSA keys produce a single OAEP block.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.key_type {
            KeyType::Ed25519 | KeyType::X25519 => self.wrap_ecies(plaintext),
            KeyType::Rsa => {
                let key = RsaPublicKey::from_public_key_der(&self.bytes).map_err(invalid_key)?;
                key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
                    .map_err(|e| CryptoError::Encrypt(e.to_string()))
            }
            KeyType::Ecdsa => Err(unsupported(self.key_type, "encrypt")),
        }
    }

    fn wrap_ecies(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let recipient = XPublicKey::from(self.montgomery()?);
        let ephemeral = StaticSecret::random_from_rng(OsRng);
        let ephemeral_public = XPublicKey::from(&ephemeral);

        let shared = ephemeral.diffie_hellman(&recipient);
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKey("low order public key".to_string()));
        }
        let cipher = wrap_cipher(
            shared.as_bytes(),
            ephemeral_public.as_bytes(),
            recipient.as_bytes(),
        )?;

        let mut nonce = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut out = Vec::with_capacity(KEY_LEN + IV_SIZE + ciphertext.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// X25519 form of this key.
    fn montgomery(&self) -> Result<[u8; KEY_LEN], CryptoError> {
        let bytes = fixed(&self.bytes)?;
        match self.key_type {
            KeyType::Ed25519 => {
                let key = VerifyingKey::from_bytes(&bytes).map_err(invalid_key)?;
                Ok(key.to_montgomery().to_bytes())
            }
            _ => Ok(bytes),
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key_type, encoding::to_base64(&self.bytes))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, bytes) = split_encoded(s)?;
        Self::from_bytes(key_type, &bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A private key. The secret bytes are wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    #[zeroize(skip)]
    key_type: KeyType,
    bytes: Vec<u8>,
    #[zeroize(skip)]
    public: PublicKey,
}

impl PrivateKey {
    /// Generate a fresh random key. RSA keys use [`RSA_BITS`].
    pub fn generate(key_type: KeyType) -> Result<Self, CryptoError> {
        Self::generate_with(key_type, &mut OsRng)
    }

    /// Generate an RSA key with a `bits` modulus.
    pub fn generate_rsa(bits: usize) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::new(&mut OsRng, bits).map_err(invalid_key)?;
        Self::from_rsa(&key)
    }

    /// Build a key from a 32-byte seed. Same seed, same key.
    ///
    /// Curve keys use the seed as the secret. ECDSA and RSA keys are drawn
    /// from a generator seeded with it.
    pub fn from_seed(key_type: KeyType, seed: [u8; KEY_LEN]) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 | KeyType::X25519 => Self::from_secret(key_type, seed.to_vec()),
            KeyType::Ecdsa | KeyType::Rsa => {
                Self::generate_with(key_type, &mut StdRng::from_seed(seed))
            }
        }
    }

    fn generate_with<R: CryptoRng + RngCore>(
        key_type: KeyType,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        match key_type {
            KeyType::Ed25519 | KeyType::X25519 => {
                let mut bytes = vec![0u8; KEY_LEN];
                rng.fill_bytes(&mut bytes);
                Self::from_secret(key_type, bytes)
            }
            KeyType::Ecdsa => {
                let key = EcdsaSigningKey::random(rng);
                Self::from_secret(key_type, key.to_bytes().to_vec())
            }
            KeyType::Rsa => {
                let key = RsaPrivateKey::new(rng, RSA_BITS).map_err(invalid_key)?;
                Self::from_rsa(&key)
            }
        }
    }

    fn from_rsa(key: &RsaPrivateKey) -> Result<Self, CryptoError> {
        let der = key.to_pkcs8_der().map_err(invalid_key)?;
        Self::from_secret(KeyType::Rsa, der.as_bytes().to_vec())
    }

    /// Validate secret bytes and derive the public half.
    fn from_secret(key_type: KeyType, bytes: Vec<u8>) -> Result<Self, CryptoError> {
        let public = match key_type {
            KeyType::Ed25519 => SigningKey::from_bytes(&fixed(&bytes)?)
                .verifying_key()
                .to_bytes()
                .to_vec(),
            KeyType::X25519 => XPublicKey::from(&StaticSecret::from(fixed(&bytes)?))
                .to_bytes()
                .to_vec(),
            KeyType::Ecdsa => {
                let key = EcdsaSigningKey::from_slice(&bytes).map_err(invalid_key)?;
                key.verifying_key()
                    .to_encoded_point(false)
                    .as_bytes()
                    .to_vec()
            }
            KeyType::Rsa => {
                let key = RsaPrivateKey::from_pkcs8_der(&bytes).map_err(invalid_key)?;
                let der = key.to_public_key().to_public_key_der().map_err(invalid_key)?;
                der.as_bytes().to_vec()
            }
        };
        Ok(Self {
            key_type,
            bytes,
            public: PublicKey {
                key_type,
                bytes: public,
            },
        })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn public_key(&self) -> PublicKey {
        self.public.clone()
    }

    /// Sign `message`. X25519 keys cannot sign.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.key_type {
            KeyType::Ed25519 => {
                let key = SigningKey::from_bytes(&fixed(&self.bytes)?);
                Ok(key.sign(message).to_bytes().to_vec())
            }
            KeyType::Ecdsa => {
                let key = EcdsaSigningKey::from_slice(&self.bytes).map_err(invalid_key)?;
                let sig: EcdsaSignature = key.sign(message);
                Ok(sig.to_der().as_bytes().to_vec())
            }
            KeyType::Rsa => {
                let key = RsaPrivateKey::from_pkcs8_der(&self.bytes).map_err(invalid_key)?;
                Ok(RsaSigningKey::<Sha256>::new(key).sign(message).to_vec())
            }
            KeyType::X25519 => Err(unsupported(self.key_type, "sign")),
        }
    }

    /// Open data produced by [`PublicKey::encrypt`].
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.key_type {
            KeyType::Ed25519 | KeyType::X25519 => self.unwrap_ecies(data),
            KeyType::Rsa => {
                let key = RsaPrivateKey::from_pkcs8_der(&self.bytes).map_err(invalid_key)?;
                key.decrypt(Oaep::new::<Sha256>(), data)
                    .map_err(|_| CryptoError::Decrypt("authentication failed".to_string()))
            }
            KeyType::Ecdsa => Err(unsupported(self.key_type, "decrypt")),
        }
    }

    fn unwrap_ecies(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < KEY_LEN + IV_SIZE + TAG_SIZE {
            return Err(CryptoError::MalformedCiphertext);
        }
        let (ephemeral, rest) = data.split_at(KEY_LEN);
        let (nonce, ciphertext) = rest.split_at(IV_SIZE);

        let mut ephemeral_bytes = [0u8; KEY_LEN];
        ephemeral_bytes.copy_from_slice(ephemeral);
        let ephemeral_public = XPublicKey::from(ephemeral_bytes);

        let secret = self.x25519_secret()?;
        let own_public = XPublicKey::from(&secret);
        let shared = secret.diffie_hellman(&ephemeral_public);
        if !shared.was_contributory() {
            return Err(CryptoError::MalformedCiphertext);
        }

        let cipher = wrap_cipher(
            shared.as_bytes(),
            ephemeral_public.as_bytes(),
            own_public.as_bytes(),
        )?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt("authentication failed".to_string()))
    }

    /// Textual form `"<type> <base64>"`. Handle with care.
    pub fn to_encoded(&self) -> String {
        format!("{} {}", self.key_type, encoding::to_base64(&self.bytes))
    }

    fn x25519_secret(&self) -> Result<StaticSecret, CryptoError> {
        let bytes = fixed(&self.bytes)?;
        match self.key_type {
            KeyType::Ed25519 => Ok(StaticSecret::from(
                SigningKey::from_bytes(&bytes).to_scalar_bytes(),
            )),
            _ => Ok(StaticSecret::from(bytes)),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, ..)", self.key_type)
    }
}

impl FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, bytes) = split_encoded(s)?;
        Self::from_secret(key_type, bytes)
    }
}

impl Serialize for PrivateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_encoded())
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A private key together with its public half.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate(key_type: KeyType) -> Result<Self, CryptoError> {
        PrivateKey::generate(key_type).map(Self::from_private)
    }

    pub fn from_private(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }
}

fn wrap_cipher(
    shared: &[u8; KEY_LEN],
    ephemeral_public: &[u8; KEY_LEN],
    recipient_public: &[u8; KEY_LEN],
) -> Result<Aes256Gcm, CryptoError> {
    let mut salt = [0u8; KEY_LEN * 2];
    salt[..KEY_LEN].copy_from_slice(ephemeral_public);
    salt[KEY_LEN..].copy_from_slice(recipient_public);

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut key = [0u8; KEY_LEN];
    hk.expand(WRAP_INFO, &mut key)
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::Encrypt(e.to_string()));
    key.zeroize();
    cipher
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    // Keygen for RSA is slow in debug builds; share one small key.
    static RSA_PAIR: Lazy<KeyPair> =
        Lazy::new(|| KeyPair::from_private(PrivateKey::generate_rsa(1024).unwrap()));

    fn assert_flipped_signature_fails(pair: &KeyPair) {
        let mut sig = pair.private_key.sign(b"transit fields").unwrap();
        assert!(pair.public_key.verify(b"transit fields", &sig).is_ok());
        assert!(pair.public_key.verify(b"other fields", &sig).is_err());

        sig[0] ^= 0x80;
        assert!(matches!(
            pair.public_key.verify(b"transit fields", &sig),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn sign_and_verify() {
        let pair = KeyPair::generate(KeyType::Ed25519).unwrap();
        assert_flipped_signature_fails(&pair);

        let sig = pair.private_key.sign(b"transit fields").unwrap();
        let other = KeyPair::generate(KeyType::Ed25519).unwrap();
        assert!(matches!(
            other.public_key.verify(b"transit fields", &sig),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn ecdsa_sign_and_verify() {
        let pair = KeyPair::generate(KeyType::Ecdsa).unwrap();
        let sig = pair.private_key.sign(b"transit fields").unwrap();
        // DER sequence
        assert_eq!(sig[0], 0x30);
        assert_flipped_signature_fails(&pair);

        let other = KeyPair::generate(KeyType::Ecdsa).unwrap();
        assert!(other.public_key.verify(b"transit fields", &sig).is_err());
    }

    #[test]
    fn rsa_sign_and_verify() {
        assert_flipped_signature_fails(&RSA_PAIR);
    }

    #[test]
    fn cross_algorithm_signature_is_rejected() {
        let ed = KeyPair::generate(KeyType::Ed25519).unwrap();
        let sig = RSA_PAIR.private_key.sign(b"msg").unwrap();
        assert!(ed.public_key.verify(b"msg", &sig).is_err());
        let sig = ed.private_key.sign(b"msg").unwrap();
        assert!(RSA_PAIR.public_key.verify(b"msg", &sig).is_err());
    }

    #[test]
    fn x25519_cannot_sign() {
        let key = PrivateKey::generate(KeyType::X25519).unwrap();
        assert!(matches!(
            key.sign(b"msg"),
            Err(CryptoError::UnsupportedOperation { operation: "sign", .. })
        ));
    }

    #[test]
    fn ecdsa_cannot_wrap() {
        let pair = KeyPair::generate(KeyType::Ecdsa).unwrap();
        assert!(matches!(
            pair.public_key.encrypt(b"catalog key"),
            Err(CryptoError::UnsupportedOperation { operation: "encrypt", .. })
        ));
    }

    #[test]
    fn wrap_round_trip_curve_types() {
        for key_type in [KeyType::Ed25519, KeyType::X25519] {
            let pair = KeyPair::generate(key_type).unwrap();
            let wrapped = pair.public_key.encrypt(b"catalog key").unwrap();
            assert_eq!(pair.private_key.decrypt(&wrapped).unwrap(), b"catalog key");

            let stranger = PrivateKey::generate(key_type).unwrap();
            assert!(stranger.decrypt(&wrapped).is_err());
        }
    }

    #[test]
    fn rsa_oaep_wrap() {
        let key = [0x42u8; 32];
        let wrapped = RSA_PAIR.public_key.encrypt(&key).unwrap();
        assert_eq!(wrapped.len(), 128);
        assert_eq!(RSA_PAIR.private_key.decrypt(&wrapped).unwrap(), key);

        let mut tampered = wrapped.clone();
        tampered[10] ^= 0x01;
        assert!(matches!(
            RSA_PAIR.private_key.decrypt(&tampered),
            Err(CryptoError::Decrypt(_))
        ));
    }

    #[test]
    fn wrap_is_randomised() {
        let pair = KeyPair::generate(KeyType::Ed25519).unwrap();
        let a = pair.public_key.encrypt(b"same").unwrap();
        let b = pair.public_key.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_wrap_is_malformed() {
        let pair = KeyPair::generate(KeyType::X25519).unwrap();
        assert!(matches!(
            pair.private_key.decrypt(&[0u8; 10]),
            Err(CryptoError::MalformedCiphertext)
        ));
    }

    #[test]
    fn textual_forms() {
        let pair = KeyPair::generate(KeyType::Ed25519).unwrap();
        let text = pair.public_key.to_string();
        assert!(text.starts_with("ed25519 "));
        assert_eq!(text.parse::<PublicKey>().unwrap(), pair.public_key);

        let private: PrivateKey = pair.private_key.to_encoded().parse().unwrap();
        assert_eq!(private.public_key(), pair.public_key);

        assert!(matches!(
            "dsa AAAA".parse::<PublicKey>(),
            Err(CryptoError::UnknownKeyType(t)) if t == "dsa"
        ));
        assert!(matches!(
            "rsa AAAA".parse::<PublicKey>(),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(matches!(
            "ed25519".parse::<PublicKey>(),
            Err(CryptoError::InvalidKey(_))
        ));
        let secret = encoding::to_base64(&pair.private_key.bytes);
        assert!(!format!("{:?}", pair.private_key).contains(&secret));
    }

    #[test]
    fn textual_forms_for_der_keys() {
        let ecdsa = KeyPair::generate(KeyType::Ecdsa).unwrap();
        for pair in [&ecdsa, &*RSA_PAIR] {
            let text = pair.public_key.to_string();
            assert!(text.starts_with(&format!("{} ", pair.public_key.key_type())));
            assert_eq!(text.parse::<PublicKey>().unwrap(), pair.public_key);

            let private: PrivateKey = pair.private_key.to_encoded().parse().unwrap();
            assert_eq!(private.public_key(), pair.public_key);
        }
    }

    #[test]
    fn seeded_keys_are_deterministic() {
        for key_type in [KeyType::Ed25519, KeyType::Ecdsa] {
            let a = PrivateKey::from_seed(key_type, [7u8; 32]).unwrap();
            let b = PrivateKey::from_seed(key_type, [7u8; 32]).unwrap();
            let c = PrivateKey::from_seed(key_type, [8u8; 32]).unwrap();
            assert_eq!(a.public_key(), b.public_key());
            assert_ne!(a.public_key(), c.public_key());
        }
    }

    #[test]
    fn serde_as_string() {
        let pair = KeyPair::generate(KeyType::X25519).unwrap();
        let json = serde_json::to_string(&pair.public_key).unwrap();
        assert!(json.starts_with("\"x25519 "));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair.public_key);
    }
}
