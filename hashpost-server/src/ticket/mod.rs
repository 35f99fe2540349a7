//! Single-use upload tickets.
//!
//! # Lifecycle
//!
//! ```text
//! request ──┬─ authenticated ──────────────► Valid ──► Consumed
//!           └─ anonymous ──► PendingProof ──┘
//!                             (proof ok)
//! any state ──► expired once valid_until has passed
//! ```
//!
//! An anonymous sender receives a proof-of-work challenge derived from
//! `(from, to, ticket id)` and must solve it before the ticket becomes usable.

mod service;
mod store;

pub use service::TicketService;
pub use store::{InMemoryTicketStore, TicketStore};

use chrono::{DateTime, Utc};
use hashpost_lib::{Hash, MailError, ProofOfWork};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Waiting for a proof-of-work.
    PendingProof,
    /// Usable for one upload.
    Valid,
    /// Used.
    Consumed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub from: Hash,
    pub to: Hash,
    pub subscription_id: String,
    /// Challenge an anonymous sender must solve.
    pub proof_of_work: Option<ProofOfWork>,
    pub valid_until: DateTime<Utc>,
    pub state: TicketState,
}

impl Ticket {
    /// Challenge string for a ticket: `H(from || to || id)`.
    pub fn challenge(from: &Hash, to: &Hash, id: &Uuid) -> Hash {
        Hash::new(format!("{from}{to}{id}"))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }

    /// True once the ticket may be used for an upload.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.state == TicketState::Valid && !self.is_expired_at(now)
    }
}

/// Ticket misuse.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("ticket not found")]
    NotFound(Uuid),
    #[error("ticket expired")]
    Expired(Uuid),
    #[error("ticket already used")]
    AlreadyConsumed(Uuid),
    #[error("ticket has not been validated")]
    NotValidated(Uuid),
}

impl From<TicketError> for MailError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::NotFound(id) => MailError::not_found("ticket", id.to_string()),
            TicketError::Expired(id) => MailError::Expired {
                identifier: format!("ticket {id}"),
            },
            TicketError::AlreadyConsumed(id) => MailError::AlreadyConsumed {
                identifier: format!("ticket {id}"),
            },
            TicketError::NotValidated(_) => MailError::Rejected(err.to_string()),
        }
    }
}

/// Body of a ticket request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    pub from_addr: Hash,
    pub to_addr: Hash,
    #[serde(default)]
    pub subscription_id: String,
}

/// Body of a ticket redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRedemption {
    pub ticket_id: Uuid,
    pub proof_of_work: u64,
}

/// Challenge as sent to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketChallenge {
    pub bits: u32,
    pub data: String,
}

/// Ticket as sent to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_of_work: Option<TicketChallenge>,
}

impl TicketResponse {
    pub fn from_ticket(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        let proof_of_work = match ticket.state {
            TicketState::PendingProof => ticket.proof_of_work.as_ref().map(|p| TicketChallenge {
                bits: p.bits,
                data: p.data.clone(),
            }),
            _ => None,
        };
        Self {
            id: ticket.id,
            valid: ticket.is_valid_at(now),
            proof_of_work,
        }
    }
}
