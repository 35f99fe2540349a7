use std::sync::Arc;

use super::{AddressInfo, OrganisationInfo, Repository, RoutingInfo};
use crate::crypto::{PrivateKey, PublicKey};
use crate::pow::ProofOfWork;
use crate::{Address, Hash, MailError, Result};

/// Default minimum proof-of-work difficulty for directory writes.
pub const DEFAULT_MIN_POW_BITS: u32 = 22;

/// Policy-enforcing front for a [`Repository`].
///
/// Every failed write check is reported as
/// [`MailError::AuthenticationFailed`]; the specific reason is only traced.
#[derive(Clone)]
pub struct ResolverService {
    repository: Arc<dyn Repository>,
    min_pow_bits: u32,
}

impl ResolverService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            min_pow_bits: DEFAULT_MIN_POW_BITS,
        }
    }

    pub fn with_min_proof_of_work_bits(mut self, bits: u32) -> Self {
        self.min_pow_bits = bits;
        self
    }

    pub fn min_proof_of_work_bits(&self) -> u32 {
        self.min_pow_bits
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    pub async fn resolve_address(&self, hash: &Hash) -> Result<AddressInfo> {
        self.repository
            .resolve_address(hash)
            .await?
            .ok_or_else(|| MailError::not_found("address", hash.as_str()))
    }

    /// Resolve by human address instead of hash.
    pub async fn resolve_address_by_name(&self, address: &Address) -> Result<AddressInfo> {
        self.resolve_address(&address.hash()).await
    }

    pub async fn resolve_routing(&self, routing_id: &Hash) -> Result<RoutingInfo> {
        self.repository
            .resolve_routing(routing_id)
            .await?
            .ok_or_else(|| MailError::not_found("routing", routing_id.as_str()))
    }

    pub async fn resolve_organisation(&self, hash: &Hash) -> Result<OrganisationInfo> {
        self.repository
            .resolve_organisation(hash)
            .await?
            .ok_or_else(|| MailError::not_found("organisation", hash.as_str()))
    }

    /// Store an address record, replacing any previous one.
    ///
    /// `proof_of_work` must be computed over the record hash at no less than
    /// the configured difficulty. The stored record carries its textual form.
    pub async fn upload_address(
        &self,
        info: &AddressInfo,
        signer: &PrivateKey,
        proof_of_work: &ProofOfWork,
    ) -> Result<()> {
        self.check_proof_of_work(&info.hash, proof_of_work)?;
        check_owner(signer, &info.public_key, "address")?;

        let mut record = info.clone();
        record.proof_of_work = proof_of_work.to_string();
        self.repository.upload_address(&record, signer).await?;
        tracing::debug!(hash = %info.hash, "address record stored");
        Ok(())
    }

    pub async fn upload_routing(&self, info: &RoutingInfo, signer: &PrivateKey) -> Result<()> {
        check_owner(signer, &info.public_key, "routing")?;
        self.repository.upload_routing(info, signer).await?;
        tracing::debug!(routing_id = %info.routing_id, "routing record stored");
        Ok(())
    }

    pub async fn upload_organisation(
        &self,
        info: &OrganisationInfo,
        signer: &PrivateKey,
        proof_of_work: &ProofOfWork,
    ) -> Result<()> {
        self.check_proof_of_work(&info.hash, proof_of_work)?;
        check_owner(signer, &info.public_key, "organisation")?;
        self.repository.upload_organisation(info, signer).await?;
        tracing::debug!(hash = %info.hash, "organisation record stored");
        Ok(())
    }

    /// Remove an address record. Must be signed by the key on record.
    pub async fn delete_address(&self, info: &AddressInfo, signer: &PrivateKey) -> Result<()> {
        let current = self.resolve_address(&info.hash).await.map_err(hide_missing)?;
        check_owner(signer, &current.public_key, "address")?;
        self.repository.delete_address(&info.hash, signer).await?;
        tracing::debug!(hash = %info.hash, "address record deleted");
        Ok(())
    }

    pub async fn delete_routing(&self, info: &RoutingInfo, signer: &PrivateKey) -> Result<()> {
        let current = self
            .resolve_routing(&info.routing_id)
            .await
            .map_err(hide_missing)?;
        check_owner(signer, &current.public_key, "routing")?;
        self.repository.delete_routing(&info.routing_id, signer).await?;
        tracing::debug!(routing_id = %info.routing_id, "routing record deleted");
        Ok(())
    }

    pub async fn delete_organisation(
        &self,
        info: &OrganisationInfo,
        signer: &PrivateKey,
    ) -> Result<()> {
        let current = self
            .resolve_organisation(&info.hash)
            .await
            .map_err(hide_missing)?;
        check_owner(signer, &current.public_key, "organisation")?;
        self.repository.delete_organisation(&info.hash, signer).await?;
        tracing::debug!(hash = %info.hash, "organisation record deleted");
        Ok(())
    }

    fn check_proof_of_work(&self, hash: &Hash, pow: &ProofOfWork) -> Result<()> {
        if pow.bits < self.min_pow_bits {
            tracing::trace!(bits = pow.bits, min = self.min_pow_bits, "proof-of-work too weak");
            return Err(MailError::AuthenticationFailed);
        }
        if pow.data != hash.as_str() {
            tracing::trace!(%hash, "proof-of-work computed over different data");
            return Err(MailError::AuthenticationFailed);
        }
        if !pow.is_valid() {
            tracing::trace!(%hash, "proof-of-work does not verify");
            return Err(MailError::AuthenticationFailed);
        }
        Ok(())
    }
}

fn check_owner(signer: &PrivateKey, expected: &PublicKey, kind: &str) -> Result<()> {
    if &signer.public_key() != expected {
        tracing::trace!(kind, "signing key does not match record key");
        return Err(MailError::AuthenticationFailed);
    }
    Ok(())
}

/// A delete of a record that does not exist is indistinguishable from one
/// signed with the wrong key.
fn hide_missing(err: MailError) -> MailError {
    if err.is_not_found() {
        tracing::trace!(error = %err, "delete of unknown record");
        MailError::AuthenticationFailed
    } else {
        err
    }
}
