//! Hashpost core library.
//!
//! Shared building blocks for a federated messaging network: hashed
//! addresses, hashcash proof-of-work, a pluggable directory (resolver) and
//! the hybrid-encryption catalog engine. Server-side protocol pieces live in
//! `hashpost-server` and are built on top of these.
//!
//! Nothing here holds global state; every service takes its collaborators
//! at construction.
//!
//! # Example
//!
//! ```
//! use hashpost_lib::{Address, ProofOfWork};
//!
//! let addr: Address = "jane!".parse().unwrap();
//! let mut pow = ProofOfWork::without_proof(8, addr.hash().as_str());
//! pow.work().unwrap();
//! assert!(pow.is_valid());
//! ```

pub mod address;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod errors;
pub mod hash;
pub mod message;
pub mod pow;
pub mod resolver;

/// Fixtures for tests in this and downstream crates.
///
/// Only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::Address;
pub use config::{CatalogConfig, ResolverBackend, ResolverConfig, RoutingConfig};
pub use crypto::{CryptoError, KeyPair, KeyType, PrivateKey, PublicKey};
pub use errors::{MailError, MailErrorCode};
pub use hash::Hash;
pub use pow::{PowError, ProofOfWork};
pub use resolver::{
    AddressInfo, OrganisationInfo, Repository, ResolverService, RoutingInfo, StorageError,
};

/// Common result alias for Hashpost operations.
pub type Result<T> = std::result::Result<T, MailError>;
