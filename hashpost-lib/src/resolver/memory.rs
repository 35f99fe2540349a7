//! In-memory directory, used for tests and as a local cache.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{
    lock_error, AddressInfo, OrganisationInfo, Repository, RoutingInfo, StorageResult,
};
use crate::crypto::PrivateKey;
use crate::Hash;

/// Directory held in three `RwLock`ed maps.
#[derive(Default)]
pub struct MemoryRepository {
    addresses: RwLock<HashMap<Hash, AddressInfo>>,
    routings: RwLock<HashMap<Hash, RoutingInfo>>,
    organisations: RwLock<HashMap<Hash, OrganisationInfo>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of address records.
    pub fn address_count(&self) -> usize {
        self.addresses.read().map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn resolve_address(&self, hash: &Hash) -> StorageResult<Option<AddressInfo>> {
        let map = self.addresses.read().map_err(|_| lock_error("resolve_address"))?;
        Ok(map.get(hash).cloned())
    }

    async fn resolve_routing(&self, routing_id: &Hash) -> StorageResult<Option<RoutingInfo>> {
        let map = self.routings.read().map_err(|_| lock_error("resolve_routing"))?;
        Ok(map.get(routing_id).cloned())
    }

    async fn resolve_organisation(&self, hash: &Hash) -> StorageResult<Option<OrganisationInfo>> {
        let map = self
            .organisations
            .read()
            .map_err(|_| lock_error("resolve_organisation"))?;
        Ok(map.get(hash).cloned())
    }

    async fn upload_address(&self, info: &AddressInfo, _signer: &PrivateKey) -> StorageResult<()> {
        let mut map = self.addresses.write().map_err(|_| lock_error("upload_address"))?;
        map.insert(info.hash.clone(), info.clone());
        Ok(())
    }

    async fn upload_routing(&self, info: &RoutingInfo, _signer: &PrivateKey) -> StorageResult<()> {
        let mut map = self.routings.write().map_err(|_| lock_error("upload_routing"))?;
        map.insert(info.routing_id.clone(), info.clone());
        Ok(())
    }

    async fn upload_organisation(
        &self,
        info: &OrganisationInfo,
        _signer: &PrivateKey,
    ) -> StorageResult<()> {
        let mut map = self
            .organisations
            .write()
            .map_err(|_| lock_error("upload_organisation"))?;
        map.insert(info.hash.clone(), info.clone());
        Ok(())
    }

    async fn delete_address(&self, hash: &Hash, _signer: &PrivateKey) -> StorageResult<()> {
        let mut map = self.addresses.write().map_err(|_| lock_error("delete_address"))?;
        map.remove(hash);
        Ok(())
    }

    async fn delete_routing(&self, routing_id: &Hash, _signer: &PrivateKey) -> StorageResult<()> {
        let mut map = self.routings.write().map_err(|_| lock_error("delete_routing"))?;
        map.remove(routing_id);
        Ok(())
    }

    async fn delete_organisation(&self, hash: &Hash, _signer: &PrivateKey) -> StorageResult<()> {
        let mut map = self
            .organisations
            .write()
            .map_err(|_| lock_error("delete_organisation"))?;
        map.remove(hash);
        Ok(())
    }
}
