//! SQLite directory backend behind the resolver service.

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;

use hashpost_lib::resolver::SqliteRepository;
use hashpost_lib::{
    Address, Hash, MailError, OrganisationInfo, ResolverBackend, ResolverConfig, ResolverService,
};

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("resolver.db");
    let keys = common::keypair("jane!");
    let jane = Address::parse("jane!").unwrap();
    let info = common::address_info(&jane, &keys);

    {
        let svc = ResolverService::new(Arc::new(SqliteRepository::open(&db).unwrap()))
            .with_min_proof_of_work_bits(common::POW_BITS);
        svc.upload_address(&info, &keys.private_key, &common::solved(&info.hash))
            .await
            .unwrap();
    }

    let svc = ResolverConfig::default()
        .with_backend(ResolverBackend::Sqlite {
            path: db.to_string_lossy().into_owned(),
        })
        .with_min_proof_of_work_bits(common::POW_BITS)
        .build()
        .unwrap();
    let found = svc.resolve_address_by_name(&jane).await.unwrap();
    assert_eq!(found.public_key, keys.public_key);
    assert!(found.proof_of_work.starts_with("4$"));
}

#[tokio::test]
async fn test_exact_match_lookup() {
    let svc = ResolverService::new(Arc::new(SqliteRepository::open_in_memory().unwrap()))
        .with_min_proof_of_work_bits(common::POW_BITS);
    let keys = common::keypair("acme");
    let org = OrganisationInfo {
        hash: Address::parse("xyz@acme!").unwrap().org_hash(),
        public_key: keys.public_key.clone(),
    };
    svc.upload_organisation(&org, &keys.private_key, &common::solved(&org.hash))
        .await
        .unwrap();

    // Same hash with the last hex digit changed must not match.
    let stored = org.hash.as_str();
    let last = if stored.ends_with('0') { '1' } else { '0' };
    let near_miss: Hash = format!("{}{last}", &stored[..stored.len() - 1]).parse().unwrap();
    assert_ne!(near_miss, org.hash);
    let err = svc.resolve_organisation(&near_miss).await.unwrap_err();
    assert!(matches!(err, MailError::NotFound { .. }));
    assert_eq!(svc.resolve_organisation(&org.hash).await.unwrap(), org);
}

#[tokio::test]
async fn test_concurrent_writers_serialize() {
    let svc = ResolverService::new(Arc::new(SqliteRepository::open_in_memory().unwrap()))
        .with_min_proof_of_work_bits(common::POW_BITS);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let svc = svc.clone();
        tasks.push(tokio::spawn(async move {
            let name = format!("user{i:02}!");
            let keys = common::keypair(&name);
            let info = common::address_info(&Address::parse(&name).unwrap(), &keys);
            svc.upload_address(&info, &keys.private_key, &common::solved(&info.hash))
                .await
                .unwrap();
            info
        }));
    }

    for task in tasks {
        let info = task.await.unwrap();
        assert_eq!(svc.resolve_address(&info.hash).await.unwrap().hash, info.hash);
    }
}
