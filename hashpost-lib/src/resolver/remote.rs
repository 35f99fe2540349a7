//! Directory client for a networked resolver.
//!
//! # Endpoints
//!
//! ```text
//! GET    {base}/address/{hash}        -> AddressInfo | 404
//! GET    {base}/routing/{routing_id}  -> RoutingInfo | 404
//! GET    {base}/organisation/{hash}   -> OrganisationInfo | 404
//! POST   {base}/{kind}/{id}           body: record JSON
//! DELETE {base}/{kind}/{id}
//! ```
//!
//! Writes carry `Authorization: Bearer <base64 signature>`, an Ed25519
//! signature over the request body (the id for deletes). No request is
//! retried here; a timeout is reported as an unavailable backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    AddressInfo, OrganisationInfo, Repository, RoutingInfo, StorageError, StorageResult,
};
use crate::crypto::PrivateKey;
use crate::{encoding, Hash};

pub struct RemoteRepository {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, kind: &str, id: &Hash) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), kind, id)
    }

    async fn get<T: DeserializeOwned>(&self, kind: &str, id: &Hash) -> StorageResult<Option<T>> {
        let response = self
            .client
            .get(self.url(kind, id))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn post<T: Serialize>(
        &self,
        kind: &str,
        id: &Hash,
        record: &T,
        signer: &PrivateKey,
    ) -> StorageResult<()> {
        let body = serde_json::to_vec(record)?;
        let token = bearer(signer, &body)?;

        let response = self
            .client
            .post(self.url(kind, id))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::AUTHORIZATION, token)
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        check_write_status(response.status().as_u16())
    }

    async fn delete(&self, kind: &str, id: &Hash, signer: &PrivateKey) -> StorageResult<()> {
        let token = bearer(signer, id.as_str().as_bytes())?;

        let response = self
            .client
            .delete(self.url(kind, id))
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        check_write_status(response.status().as_u16())
    }
}

fn bearer(signer: &PrivateKey, payload: &[u8]) -> StorageResult<String> {
    let signature = signer.sign(payload).map_err(|e| {
        tracing::debug!(error = %e, "cannot sign directory write");
        StorageError::Refused
    })?;
    Ok(format!("Bearer {}", encoding::to_base64(signature)))
}

fn map_reqwest_error(e: reqwest::Error) -> StorageError {
    if e.is_timeout() {
        StorageError::Unavailable("request timed out".to_string())
    } else {
        StorageError::Unavailable(e.to_string())
    }
}

fn map_status_error(status: u16) -> StorageError {
    match status {
        401 | 403 => StorageError::Refused,
        _ => StorageError::Unavailable(format!("HTTP {status}")),
    }
}

fn check_write_status(status: u16) -> StorageResult<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(map_status_error(status))
    }
}

#[async_trait]
impl Repository for RemoteRepository {
    async fn resolve_address(&self, hash: &Hash) -> StorageResult<Option<AddressInfo>> {
        self.get("address", hash).await
    }

    async fn resolve_routing(&self, routing_id: &Hash) -> StorageResult<Option<RoutingInfo>> {
        self.get("routing", routing_id).await
    }

    async fn resolve_organisation(&self, hash: &Hash) -> StorageResult<Option<OrganisationInfo>> {
        self.get("organisation", hash).await
    }

    async fn upload_address(&self, info: &AddressInfo, signer: &PrivateKey) -> StorageResult<()> {
        tracing::debug!(hash = %info.hash, "uploading address record");
        self.post("address", &info.hash, info, signer).await
    }

    async fn upload_routing(&self, info: &RoutingInfo, signer: &PrivateKey) -> StorageResult<()> {
        tracing::debug!(routing_id = %info.routing_id, "uploading routing record");
        self.post("routing", &info.routing_id, info, signer).await
    }

    async fn upload_organisation(
        &self,
        info: &OrganisationInfo,
        signer: &PrivateKey,
    ) -> StorageResult<()> {
        tracing::debug!(hash = %info.hash, "uploading organisation record");
        self.post("organisation", &info.hash, info, signer).await
    }

    async fn delete_address(&self, hash: &Hash, signer: &PrivateKey) -> StorageResult<()> {
        self.delete("address", hash, signer).await
    }

    async fn delete_routing(&self, routing_id: &Hash, signer: &PrivateKey) -> StorageResult<()> {
        self.delete("routing", routing_id, signer).await
    }

    async fn delete_organisation(&self, hash: &Hash, signer: &PrivateKey) -> StorageResult<()> {
        self.delete("organisation", hash, signer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let repo =
            RemoteRepository::new("https://dir.example.org/", Duration::from_secs(5)).unwrap();
        let id = Hash::new("x");
        assert_eq!(
            repo.url("routing", &id),
            format!("https://dir.example.org/routing/{id}")
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_status_error(401), StorageError::Refused));
        assert!(matches!(map_status_error(500), StorageError::Unavailable(_)));
        assert!(check_write_status(204).is_ok());
    }
}
