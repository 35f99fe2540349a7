//! Fixtures and a seeded mock directory.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::config::RoutingConfig;
use crate::crypto::{KeyPair, KeyType, PrivateKey};
use crate::resolver::{AddressInfo, MemoryRepository, ResolverService, RoutingInfo};
use crate::{Address, Hash, ProofOfWork};

/// Difficulty used by fixtures so tests stay fast.
pub const TEST_POW_BITS: u32 = 4;

/// Deterministic key pair for `seed`.
pub fn test_keypair(seed: &str, key_type: KeyType) -> KeyPair {
    let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
    KeyPair::from_private(PrivateKey::from_seed(key_type, digest).expect("seeded key"))
}

/// Solve a proof-of-work over `data`.
pub fn solve_pow(bits: u32, data: &str) -> ProofOfWork {
    let mut pow = ProofOfWork::without_proof(bits, data);
    pow.work().expect("test difficulty is in range");
    pow
}

/// Install a `tracing` subscriber driven by `RUST_LOG`. Safe to call twice.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A user known to a [`TestDirectory`].
#[derive(Clone, Debug)]
pub struct TestUser {
    pub address: Address,
    pub keys: KeyPair,
}

/// In-memory directory seeded with users that all route to one server.
pub struct TestDirectory {
    pub resolver: ResolverService,
    pub routing: RoutingConfig,
    pub users: Vec<TestUser>,
}

impl TestDirectory {
    /// Seed `addresses` (e.g. `"jane!"`) with deterministic keys.
    pub async fn seeded(addresses: &[&str]) -> Self {
        let resolver = ResolverService::new(Arc::new(MemoryRepository::new()))
            .with_min_proof_of_work_bits(TEST_POW_BITS);

        let server_keys = test_keypair("routing", KeyType::Ed25519);
        let routing = RoutingConfig {
            routing_id: Hash::new("test-routing"),
            private_key: server_keys.private_key.clone(),
            public_key: server_keys.public_key.clone(),
        };
        resolver
            .upload_routing(
                &RoutingInfo {
                    routing_id: routing.routing_id.clone(),
                    public_key: routing.public_key.clone(),
                    routing: "127.0.0.1:2424".to_string(),
                },
                &routing.private_key,
            )
            .await
            .expect("seed routing");

        let mut users = Vec::new();
        for raw in addresses {
            let address = Address::parse(raw).expect("fixture address is valid");
            let keys = test_keypair(raw, KeyType::Ed25519);
            let hash = address.hash();
            let info = AddressInfo {
                hash: hash.clone(),
                public_key: keys.public_key.clone(),
                routing_id: routing.routing_id.clone(),
                proof_of_work: String::new(),
            };
            resolver
                .upload_address(&info, &keys.private_key, &solve_pow(TEST_POW_BITS, hash.as_str()))
                .await
                .expect("seed address");
            users.push(TestUser { address, keys });
        }

        Self {
            resolver,
            routing,
            users,
        }
    }

    /// Look a seeded user up by address. Panics if it was not seeded.
    pub fn user(&self, raw: &str) -> &TestUser {
        let address = Address::parse(raw).expect("valid address");
        self.users
            .iter()
            .find(|u| u.address == address)
            .expect("user was seeded")
    }
}
