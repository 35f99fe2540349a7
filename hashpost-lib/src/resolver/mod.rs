//! Directory lookups: address, routing and organisation records.
//!
//! [`Repository`] is the backend contract. [`ResolverService`] sits in front
//! of any repository and enforces the write policy (proof-of-work, key
//! ownership) so every backend is guarded the same way.

mod memory;
#[cfg(feature = "remote-resolver")]
mod remote;
mod service;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryRepository;
#[cfg(feature = "remote-resolver")]
pub use remote::RemoteRepository;
pub use service::{ResolverService, DEFAULT_MIN_POW_BITS};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::{PrivateKey, PublicKey};
use crate::{Hash, MailError};

/// Directory record for an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub hash: Hash,
    pub public_key: PublicKey,
    pub routing_id: Hash,
    /// Textual proof-of-work (`bits$base64(data)$proof`) paid at upload.
    #[serde(default)]
    pub proof_of_work: String,
}

/// Directory record for a server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingInfo {
    pub routing_id: Hash,
    pub public_key: PublicKey,
    /// Network endpoint, e.g. `mail.example.org:2424`.
    pub routing: String,
}

/// Directory record for an organisation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationInfo {
    pub hash: Hash,
    pub public_key: PublicKey,
}

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("write refused by backend")]
    Refused,
    #[error("storage lock poisoned: {0}")]
    Lock(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

/// Backend detail stays in the logs; callers see a generic storage failure.
impl From<StorageError> for MailError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Refused => MailError::AuthenticationFailed,
            StorageError::Unavailable(detail) => {
                tracing::warn!(%detail, "resolver backend unavailable");
                MailError::Transport("resolver backend unavailable".to_string())
            }
            other => {
                tracing::warn!(error = %other, "resolver backend failure");
                MailError::Storage("resolver backend failure".to_string())
            }
        }
    }
}

/// Result type for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

pub(crate) fn lock_error(context: &str) -> StorageError {
    StorageError::Lock(context.to_string())
}

/// Directory backend.
///
/// Lookups return `Ok(None)` for a missing record. Writes replace any prior
/// record with the same key. The signer is only used by backends that must
/// prove the write to somebody else; local backends trust the caller, which
/// is why writes normally go through [`ResolverService`].
#[async_trait]
pub trait Repository: Send + Sync {
    async fn resolve_address(&self, hash: &Hash) -> StorageResult<Option<AddressInfo>>;

    async fn resolve_routing(&self, routing_id: &Hash) -> StorageResult<Option<RoutingInfo>>;

    async fn resolve_organisation(&self, hash: &Hash) -> StorageResult<Option<OrganisationInfo>>;

    async fn upload_address(&self, info: &AddressInfo, signer: &PrivateKey) -> StorageResult<()>;

    async fn upload_routing(&self, info: &RoutingInfo, signer: &PrivateKey) -> StorageResult<()>;

    async fn upload_organisation(
        &self,
        info: &OrganisationInfo,
        signer: &PrivateKey,
    ) -> StorageResult<()>;

    async fn delete_address(&self, hash: &Hash, signer: &PrivateKey) -> StorageResult<()>;

    async fn delete_routing(&self, routing_id: &Hash, signer: &PrivateKey) -> StorageResult<()>;

    async fn delete_organisation(&self, hash: &Hash, signer: &PrivateKey) -> StorageResult<()>;
}
