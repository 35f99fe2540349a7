//! Invite tokens for account creation.
//!
//! A token is issued by a server for one address hash and is signed with
//! that server's routing key. Wire form:
//!
//! ```text
//! base64("<address>:<routing_id>:<expires unix secs>:<base64 signature>")
//! ```
//!
//! The signature covers `"<address>:<routing_id>:<expires unix secs>"`.

use chrono::{DateTime, Utc};
use hashpost_lib::encoding::{from_base64, to_base64};
use hashpost_lib::{Hash, MailError, PublicKey, Result, RoutingConfig};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InviteToken {
    pub address: Hash,
    pub routing_id: Hash,
    pub expires_at: DateTime<Utc>,
    pub signature: Vec<u8>,
}

fn signed_payload(address: &Hash, routing_id: &Hash, expires_at: i64) -> String {
    format!("{address}:{routing_id}:{expires_at}")
}

fn malformed(reason: &str) -> MailError {
    MailError::invalid_format("token", reason)
}

impl InviteToken {
    /// Issue a token for `address`, signed by this server.
    pub fn issue(
        address: Hash,
        routing: &RoutingConfig,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        let ts = expires_at.timestamp();
        let payload = signed_payload(&address, &routing.routing_id, ts);
        let signature = routing.private_key.sign(payload.as_bytes())?;

        Ok(Self {
            address,
            routing_id: routing.routing_id.clone(),
            expires_at: DateTime::from_timestamp(ts, 0).ok_or_else(|| malformed("expiry"))?,
            signature,
        })
    }

    pub fn encode(&self) -> String {
        let inner = format!(
            "{}:{}",
            signed_payload(&self.address, &self.routing_id, self.expires_at.timestamp()),
            to_base64(&self.signature)
        );
        to_base64(inner)
    }

    pub fn parse(token: &str) -> Result<Self> {
        let raw = from_base64("token", token.trim())?;
        let raw = String::from_utf8(raw).map_err(|_| malformed("not utf-8"))?;

        let parts: Vec<&str> = raw.split(':').collect();
        let [address, routing_id, expires_at, signature] = parts.as_slice() else {
            return Err(malformed("expected four fields"));
        };

        let expires_at = expires_at
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .ok_or_else(|| malformed("expiry"))?;

        Ok(Self {
            address: Hash::from_hex(address)?,
            routing_id: Hash::from_hex(routing_id)?,
            expires_at,
            signature: from_base64("token signature", signature)?,
        })
    }

    /// Check the token was issued by `routing_id` (holding `public_key`) for
    /// `address` and has not expired at `now`.
    pub fn verify(
        &self,
        address: &Hash,
        routing_id: &Hash,
        public_key: &PublicKey,
        now: DateTime<Utc>,
    ) -> bool {
        if &self.address != address || &self.routing_id != routing_id {
            tracing::trace!("invite token issued for another address or server");
            return false;
        }
        if now >= self.expires_at {
            tracing::trace!(expires_at = %self.expires_at, "invite token expired");
            return false;
        }

        let payload = signed_payload(&self.address, &self.routing_id, self.expires_at.timestamp());
        match public_key.verify(payload.as_bytes(), &self.signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::trace!(error = %e, "invite token signature rejected");
                false
            }
        }
    }
}
