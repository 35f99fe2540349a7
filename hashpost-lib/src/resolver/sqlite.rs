//! Embedded SQLite directory.
//!
//! One connection behind one mutex. Every prepare/execute pair runs with the
//! lock held and the lock is never held across an `.await`, so statements on
//! the handle never interleave.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    lock_error, AddressInfo, OrganisationInfo, Repository, RoutingInfo, StorageError,
    StorageResult,
};
use crate::crypto::PrivateKey;
use crate::Hash;

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Io(e.to_string())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS address (
    hash TEXT PRIMARY KEY,
    pubkey TEXT NOT NULL,
    routing_id TEXT NOT NULL,
    pow TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS routing (
    routing_id TEXT PRIMARY KEY,
    pubkey TEXT NOT NULL,
    routing TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS organisation (
    hash TEXT PRIMARY KEY,
    pubkey TEXT NOT NULL
);
";

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) the database file and make sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_column<T: std::str::FromStr>(table: &str, column: &str, value: &str) -> StorageResult<T>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        tracing::warn!(table, column, error = %e, "malformed directory row");
        StorageError::Corrupt(format!("{table}.{column}: {e}"))
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn resolve_address(&self, hash: &Hash) -> StorageResult<Option<AddressInfo>> {
        let conn = self.conn.lock().map_err(|_| lock_error("resolve_address"))?;
        let row = conn
            .query_row(
                "SELECT hash, pubkey, routing_id, pow FROM address WHERE hash = ?1",
                params![hash.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((hash, pubkey, routing_id, pow)) = row else {
            return Ok(None);
        };
        Ok(Some(AddressInfo {
            hash: parse_column("address", "hash", &hash)?,
            public_key: parse_column("address", "pubkey", &pubkey)?,
            routing_id: parse_column("address", "routing_id", &routing_id)?,
            proof_of_work: pow,
        }))
    }

    async fn resolve_routing(&self, routing_id: &Hash) -> StorageResult<Option<RoutingInfo>> {
        let conn = self.conn.lock().map_err(|_| lock_error("resolve_routing"))?;
        let row = conn
            .query_row(
                "SELECT routing_id, pubkey, routing FROM routing WHERE routing_id = ?1",
                params![routing_id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((routing_id, pubkey, routing)) = row else {
            return Ok(None);
        };
        Ok(Some(RoutingInfo {
            routing_id: parse_column("routing", "routing_id", &routing_id)?,
            public_key: parse_column("routing", "pubkey", &pubkey)?,
            routing,
        }))
    }

    async fn resolve_organisation(&self, hash: &Hash) -> StorageResult<Option<OrganisationInfo>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| lock_error("resolve_organisation"))?;
        let row = conn
            .query_row(
                "SELECT hash, pubkey FROM organisation WHERE hash = ?1",
                params![hash.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((hash, pubkey)) = row else {
            return Ok(None);
        };
        Ok(Some(OrganisationInfo {
            hash: parse_column("organisation", "hash", &hash)?,
            public_key: parse_column("organisation", "pubkey", &pubkey)?,
        }))
    }

    async fn upload_address(&self, info: &AddressInfo, _signer: &PrivateKey) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| lock_error("upload_address"))?;
        conn.execute(
            "INSERT OR REPLACE INTO address (hash, pubkey, routing_id, pow) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                info.hash.as_str(),
                info.public_key.to_string(),
                info.routing_id.as_str(),
                info.proof_of_work
            ],
        )?;
        Ok(())
    }

    async fn upload_routing(&self, info: &RoutingInfo, _signer: &PrivateKey) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| lock_error("upload_routing"))?;
        conn.execute(
            "INSERT OR REPLACE INTO routing (routing_id, pubkey, routing) VALUES (?1, ?2, ?3)",
            params![
                info.routing_id.as_str(),
                info.public_key.to_string(),
                info.routing
            ],
        )?;
        Ok(())
    }

    async fn upload_organisation(
        &self,
        info: &OrganisationInfo,
        _signer: &PrivateKey,
    ) -> StorageResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| lock_error("upload_organisation"))?;
        conn.execute(
            "INSERT OR REPLACE INTO organisation (hash, pubkey) VALUES (?1, ?2)",
            params![info.hash.as_str(), info.public_key.to_string()],
        )?;
        Ok(())
    }

    async fn delete_address(&self, hash: &Hash, _signer: &PrivateKey) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| lock_error("delete_address"))?;
        conn.execute("DELETE FROM address WHERE hash = ?1", params![hash.as_str()])?;
        Ok(())
    }

    async fn delete_routing(&self, routing_id: &Hash, _signer: &PrivateKey) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| lock_error("delete_routing"))?;
        conn.execute(
            "DELETE FROM routing WHERE routing_id = ?1",
            params![routing_id.as_str()],
        )?;
        Ok(())
    }

    async fn delete_organisation(&self, hash: &Hash, _signer: &PrivateKey) -> StorageResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| lock_error("delete_organisation"))?;
        conn.execute(
            "DELETE FROM organisation WHERE hash = ?1",
            params![hash.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, KeyType};

    #[tokio::test]
    async fn test_routing_round_trip() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let pair = KeyPair::generate(KeyType::Ed25519).unwrap();
        let info = RoutingInfo {
            routing_id: Hash::new("server-1"),
            public_key: pair.public_key.clone(),
            routing: "mail.example.org:2424".to_string(),
        };

        repo.upload_routing(&info, &pair.private_key).await.unwrap();
        let found = repo
            .resolve_routing(&info.routing_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, info);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_reported() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let hash = Hash::new("acme");
        {
            let conn = repo.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO organisation (hash, pubkey) VALUES (?1, ?2)",
                params![hash.as_str(), "rsa AAAA"],
            )
            .unwrap();
        }

        let err = repo.resolve_organisation(&hash).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
