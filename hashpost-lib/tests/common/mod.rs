//! Shared helpers for integration tests, built on `hashpost_lib::test_utils`.
#![allow(dead_code)]

use std::sync::Arc;

use hashpost_lib::resolver::MemoryRepository;
use hashpost_lib::test_utils::{solve_pow, test_keypair, TEST_POW_BITS};
use hashpost_lib::{Address, AddressInfo, Hash, KeyPair, KeyType, ProofOfWork, ResolverService};

pub const POW_BITS: u32 = TEST_POW_BITS;

pub fn keypair(seed: &str) -> KeyPair {
    test_keypair(seed, KeyType::Ed25519)
}

pub fn solved(data: &Hash) -> ProofOfWork {
    solve_pow(POW_BITS, data.as_str())
}

pub fn address_info(address: &Address, keys: &KeyPair) -> AddressInfo {
    AddressInfo {
        hash: address.hash(),
        public_key: keys.public_key.clone(),
        routing_id: Hash::new("routing-1"),
        proof_of_work: String::new(),
    }
}

/// Resolver over an in-memory repository holding `name` with `keys`.
pub async fn directory_with(name: &str, keys: &KeyPair) -> ResolverService {
    let resolver = ResolverService::new(Arc::new(MemoryRepository::new()))
        .with_min_proof_of_work_bits(POW_BITS);
    let address = Address::parse(name).unwrap();
    let info = address_info(&address, keys);
    resolver
        .upload_address(&info, &keys.private_key, &solved(&info.hash))
        .await
        .unwrap();
    resolver
}
