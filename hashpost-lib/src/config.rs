//! Configuration types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyPair, KeyType, PrivateKey, PublicKey};
use crate::resolver::{MemoryRepository, Repository, ResolverService};
use crate::{Hash, MailError, Result};

/// Directory backend selection.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResolverBackend {
    /// Process-local maps.
    #[default]
    Memory,
    /// Embedded SQLite file.
    Sqlite {
        /// Database path, or ":memory:".
        path: String,
    },
    /// Networked directory.
    Remote {
        /// Base URL, e.g. "https://resolver.example.org".
        url: String,
        /// Request timeout in seconds.
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
}

/// Resolver configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub backend: ResolverBackend,

    /// Minimum proof-of-work bits accepted on address/organisation writes.
    #[serde(default = "default_min_pow_bits")]
    pub min_proof_of_work_bits: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_min_pow_bits() -> u32 {
    crate::resolver::DEFAULT_MIN_POW_BITS
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            backend: ResolverBackend::default(),
            min_proof_of_work_bits: default_min_pow_bits(),
        }
    }
}

impl ResolverConfig {
    /// In-memory resolver with the default difficulty.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set the backend.
    pub fn with_backend(mut self, backend: ResolverBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the minimum proof-of-work difficulty.
    pub fn with_min_proof_of_work_bits(mut self, bits: u32) -> Self {
        self.min_proof_of_work_bits = bits;
        self
    }

    /// Build the configured service.
    pub fn build(&self) -> Result<ResolverService> {
        let repository: Arc<dyn Repository> = match &self.backend {
            ResolverBackend::Memory => Arc::new(MemoryRepository::new()),
            #[cfg(feature = "sqlite")]
            ResolverBackend::Sqlite { path } => {
                let repo = if path == ":memory:" {
                    crate::resolver::SqliteRepository::open_in_memory()?
                } else {
                    crate::resolver::SqliteRepository::open(path)?
                };
                Arc::new(repo)
            }
            #[cfg(not(feature = "sqlite"))]
            ResolverBackend::Sqlite { .. } => {
                return Err(MailError::Internal(
                    "SQLite resolver not compiled - enable the 'sqlite' feature".to_string(),
                ))
            }
            #[cfg(feature = "remote-resolver")]
            ResolverBackend::Remote { url, timeout_secs } => Arc::new(
                crate::resolver::RemoteRepository::new(
                    url.clone(),
                    std::time::Duration::from_secs(*timeout_secs),
                )?,
            ),
            #[cfg(not(feature = "remote-resolver"))]
            ResolverBackend::Remote { .. } => {
                return Err(MailError::Internal(
                    "remote resolver not compiled - enable the 'remote-resolver' feature"
                        .to_string(),
                ))
            }
        };

        Ok(ResolverService::new(repository)
            .with_min_proof_of_work_bits(self.min_proof_of_work_bits))
    }
}

/// Identity of this server in the directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub routing_id: Hash,
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl RoutingConfig {
    /// Fresh routing id (hash of a random UUID) and Ed25519 key pair.
    pub fn generate() -> Result<Self> {
        let pair = KeyPair::generate(KeyType::Ed25519)?;
        Ok(Self {
            routing_id: Hash::new(uuid::Uuid::new_v4().to_string()),
            private_key: pair.private_key,
            public_key: pair.public_key,
        })
    }

    /// Parse from JSON, rejecting a key pair that does not belong together.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.private_key.public_key() != config.public_key {
            return Err(MailError::invalid_format(
                "routing",
                "public key does not match private key",
            ));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Catalog engine settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Payloads larger than this many bytes are zlib compressed.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,
}

fn default_compression_threshold() -> usize {
    1024
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            compression_threshold: default_compression_threshold(),
        }
    }
}

impl CatalogConfig {
    pub fn with_compression_threshold(mut self, bytes: usize) -> Self {
        self.compression_threshold = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_json() {
        let config: ResolverConfig =
            serde_json::from_str(r#"{"backend":{"type":"sqlite","path":":memory:"}}"#).unwrap();
        assert_eq!(
            config.backend,
            ResolverBackend::Sqlite {
                path: ":memory:".to_string()
            }
        );
        assert_eq!(config.min_proof_of_work_bits, default_min_pow_bits());

        let config: ResolverConfig = serde_json::from_str(
            r#"{"backend":{"type":"remote","url":"http://localhost"},"min_proof_of_work_bits":4}"#,
        )
        .unwrap();
        assert!(matches!(
            config.backend,
            ResolverBackend::Remote { timeout_secs: 30, .. }
        ));
        assert_eq!(config.min_proof_of_work_bits, 4);
    }

    #[test]
    fn test_build_memory() {
        let svc = ResolverConfig::memory()
            .with_min_proof_of_work_bits(3)
            .build()
            .unwrap();
        assert_eq!(svc.min_proof_of_work_bits(), 3);
    }

    #[test]
    fn test_routing_json_round_trip() {
        let routing = RoutingConfig::generate().unwrap();
        let json = routing.to_json().unwrap();
        let back = RoutingConfig::from_json(&json).unwrap();
        assert_eq!(back.routing_id, routing.routing_id);
        assert_eq!(back.public_key, routing.public_key);

        let other = RoutingConfig::generate().unwrap();
        let mut mixed: serde_json::Value = serde_json::from_str(&json).unwrap();
        mixed["public_key"] = serde_json::Value::String(other.public_key.to_string());
        assert!(RoutingConfig::from_json(&mixed.to_string()).is_err());
    }

    #[test]
    fn test_catalog_defaults() {
        let config: CatalogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.compression_threshold, 1024);
    }
}
