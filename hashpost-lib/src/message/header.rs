//! Transit header of a message.
//!
//! # Canonical form
//!
//! Signatures cover `SHA-256(json(header))` where the JSON is produced with
//! both signature fields set to the empty string. Field order is fixed by the
//! struct definition, so every party derives the same bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::{PrivateKey, PublicKey};
use crate::pow::ProofOfWork;
use crate::{encoding, Hash, MailError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSender {
    pub addr: Hash,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_of_work: Option<ProofOfWork>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecipient {
    pub addr: Hash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCatalog {
    /// Size of the encrypted catalog in bytes.
    pub size: u64,
    /// Hex SHA-256 of the encrypted catalog.
    pub checksum: Hash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub from: HeaderSender,
    pub to: HeaderRecipient,
    pub catalog: HeaderCatalog,
    /// Base64 signature by the sender's key; empty when unsigned.
    #[serde(default)]
    pub client_signature: String,
    /// Base64 signature by the origin server's routing key; empty when unsigned.
    #[serde(default)]
    pub server_signature: String,
}

impl Header {
    /// Digest both signatures are computed over.
    pub fn transit_digest(&self) -> Result<[u8; 32]> {
        let mut unsigned = self.clone();
        unsigned.client_signature.clear();
        unsigned.server_signature.clear();
        let bytes = serde_json::to_vec(&unsigned)?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Sign as the sender. Replaces any previous client signature.
    pub fn sign_client(&mut self, key: &PrivateKey) -> Result<()> {
        let digest = self.transit_digest()?;
        self.client_signature = encoding::to_base64(key.sign(&digest)?);
        Ok(())
    }

    /// Check a signature field against `public_key`.
    ///
    /// Empty and undecodable signatures fail like a wrong key does.
    pub fn verify_signature(&self, signature: &str, public_key: &PublicKey) -> Result<()> {
        if signature.is_empty() {
            return Err(MailError::AuthenticationFailed);
        }
        let sig = encoding::from_base64("signature", signature)
            .map_err(|_| MailError::AuthenticationFailed)?;
        let digest = self.transit_digest()?;
        public_key
            .verify(&digest, &sig)
            .map_err(|_| MailError::AuthenticationFailed)
    }

    /// Check the client signature against the key embedded in the header.
    pub fn verify_client(&self) -> Result<()> {
        self.verify_signature(&self.client_signature, &self.from.public_key)
    }
}
