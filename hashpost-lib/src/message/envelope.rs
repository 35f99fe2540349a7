//! Hybrid encryption of the catalog itself.
//!
//! One random catalog key encrypts the serialized catalog; that key is then
//! wrapped once per recipient public key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use crate::crypto::{Iv, PrivateKey, PublicKey, SymmetricKey};
use crate::{encoding, Hash, MailError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEnvelope {
    /// Recipient hash to base64 wrapped catalog key.
    pub encrypted_keys: BTreeMap<Hash, String>,
    pub iv: Iv,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub encrypted_catalog: Vec<u8>,
}

impl CatalogEnvelope {
    /// Encrypt `catalog` for every recipient in `recipients`.
    pub fn seal(catalog: &Catalog, recipients: &BTreeMap<Hash, PublicKey>) -> Result<Self> {
        if recipients.is_empty() {
            return Err(MailError::invalid_format("recipients", "no recipients"));
        }

        let catalog_key = SymmetricKey::generate();
        let iv = Iv::generate();
        let plaintext = serde_json::to_vec(catalog)?;
        let encrypted_catalog = catalog_key.encrypt(&iv, &plaintext)?;

        let mut encrypted_keys = BTreeMap::new();
        for (hash, public_key) in recipients {
            let wrapped = public_key.encrypt(catalog_key.as_bytes())?;
            encrypted_keys.insert(hash.clone(), encoding::to_base64(wrapped));
        }

        Ok(Self {
            encrypted_keys,
            iv,
            encrypted_catalog,
        })
    }

    /// Unwrap the catalog key for `recipient` and decrypt the catalog.
    pub fn unseal(&self, recipient: &Hash, private_key: &PrivateKey) -> Result<Catalog> {
        let wrapped = self
            .encrypted_keys
            .get(recipient)
            .ok_or_else(|| MailError::not_found("catalog key", recipient.as_str()))?;
        let wrapped = encoding::from_base64("encrypted_key", wrapped)?;

        let key_bytes = private_key.decrypt(&wrapped)?;
        let catalog_key = SymmetricKey::from_slice(&key_bytes)?;
        let plaintext = catalog_key.decrypt(&self.iv, &self.encrypted_catalog)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
