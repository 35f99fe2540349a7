use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hashpost_lib::{MailError, ProofOfWork, Result};
use uuid::Uuid;

use super::{Ticket, TicketError, TicketRequest, TicketState, TicketStore};

const REDEEM_REJECTED: &str = "invalid ticket or proof of work";

/// Issues, validates and consumes upload tickets.
#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn TicketStore>,
    ttl: Duration,
    pow_bits: u32,
}

impl TicketService {
    pub fn new(store: Arc<dyn TicketStore>, ttl: Duration, pow_bits: u32) -> Self {
        Self {
            store,
            ttl,
            pow_bits,
        }
    }

    /// Difficulty handed to anonymous senders.
    pub fn proof_of_work_bits(&self) -> u32 {
        self.pow_bits
    }

    pub fn request_ticket(&self, request: &TicketRequest, authenticated: bool) -> Result<Ticket> {
        self.request_ticket_at(request, authenticated, Utc::now())
    }

    /// Issue a ticket. Authenticated senders get a usable ticket right away;
    /// anonymous ones get a proof-of-work challenge.
    pub fn request_ticket_at(
        &self,
        request: &TicketRequest,
        authenticated: bool,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let id = Uuid::new_v4();
        let (state, proof_of_work) = if authenticated {
            (TicketState::Valid, None)
        } else {
            let challenge = Ticket::challenge(&request.from_addr, &request.to_addr, &id);
            (
                TicketState::PendingProof,
                Some(ProofOfWork::without_proof(self.pow_bits, challenge.as_str())),
            )
        };

        let ticket = Ticket {
            id,
            from: request.from_addr.clone(),
            to: request.to_addr.clone(),
            subscription_id: request.subscription_id.clone(),
            proof_of_work,
            valid_until: now + self.ttl,
            state,
        };
        self.store.insert(ticket.clone())?;

        tracing::debug!(ticket = %id, authenticated, "ticket issued");
        Ok(ticket)
    }

    pub fn redeem_ticket_with_proof(&self, id: &Uuid, proof: u64) -> Result<Ticket> {
        self.redeem_ticket_with_proof_at(id, proof, Utc::now())
    }

    /// Validate an anonymous ticket with the sender's proof.
    ///
    /// Unknown, expired, already validated and wrongly solved tickets all get
    /// the same rejection. A rejected ticket is left as it was.
    pub fn redeem_ticket_with_proof_at(
        &self,
        id: &Uuid,
        proof: u64,
        now: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut reason = "";
        let result = self.store.modify(id, &mut |ticket| {
            if ticket.state != TicketState::PendingProof {
                reason = "ticket is not awaiting a proof";
                return Err(MailError::Rejected(REDEEM_REJECTED.to_string()));
            }
            if ticket.is_expired_at(now) {
                reason = "ticket expired";
                return Err(MailError::Rejected(REDEEM_REJECTED.to_string()));
            }
            let Some(challenge) = ticket.proof_of_work.as_mut() else {
                reason = "ticket has no challenge";
                return Err(MailError::Rejected(REDEEM_REJECTED.to_string()));
            };
            let candidate = ProofOfWork::new(challenge.bits, challenge.data.clone(), proof);
            if !candidate.is_valid() {
                reason = "proof of work does not solve the challenge";
                return Err(MailError::Rejected(REDEEM_REJECTED.to_string()));
            }

            challenge.proof = proof;
            ticket.state = TicketState::Valid;
            Ok(())
        });

        match result {
            Ok(ticket) => {
                tracing::debug!(ticket = %id, "ticket validated");
                Ok(ticket)
            }
            Err(MailError::Rejected(msg)) => {
                tracing::trace!(ticket = %id, reason, "ticket redemption rejected");
                Err(MailError::Rejected(msg))
            }
            Err(e) if e.is_not_found() => {
                tracing::trace!(ticket = %id, "ticket redemption for unknown ticket");
                Err(MailError::Rejected(REDEEM_REJECTED.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn consume(&self, id: &Uuid) -> Result<Ticket> {
        self.consume_at(id, Utc::now())
    }

    /// Use a ticket for an upload. Succeeds at most once per ticket.
    pub fn consume_at(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Ticket> {
        let ticket = self.store.modify(id, &mut |ticket| {
            match ticket.state {
                TicketState::Consumed => {
                    return Err(TicketError::AlreadyConsumed(ticket.id).into())
                }
                TicketState::PendingProof => {
                    return Err(TicketError::NotValidated(ticket.id).into())
                }
                TicketState::Valid => {}
            }
            if ticket.is_expired_at(now) {
                return Err(TicketError::Expired(ticket.id).into());
            }
            ticket.state = TicketState::Consumed;
            Ok(())
        })?;

        tracing::debug!(ticket = %id, "ticket consumed");
        Ok(ticket)
    }

    pub fn get(&self, id: &Uuid) -> Result<Ticket> {
        self.store
            .get(id)?
            .ok_or_else(|| TicketError::NotFound(*id).into())
    }

    /// Remove expired tickets from the store.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired(Utc::now())?;
        if removed > 0 {
            tracing::warn!(removed, "purged expired tickets");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::InMemoryTicketStore;
    use hashpost_lib::test_utils::solve_pow;
    use hashpost_lib::Hash;

    fn service() -> TicketService {
        TicketService::new(Arc::new(InMemoryTicketStore::new()), Duration::minutes(10), 4)
    }

    fn request() -> TicketRequest {
        TicketRequest {
            from_addr: Hash::new("john"),
            to_addr: Hash::new("jane"),
            subscription_id: String::new(),
        }
    }

    fn solve(ticket: &Ticket) -> u64 {
        let challenge = ticket.proof_of_work.as_ref().unwrap();
        solve_pow(challenge.bits, &challenge.data).proof
    }

    fn wrong_proof(ticket: &Ticket) -> u64 {
        let challenge = ticket.proof_of_work.as_ref().unwrap();
        (0..)
            .find(|p| !ProofOfWork::new(challenge.bits, challenge.data.clone(), *p).is_valid())
            .unwrap()
    }

    #[test]
    fn test_authenticated_ticket_is_valid() {
        let svc = service();
        let ticket = svc.request_ticket(&request(), true).unwrap();
        assert_eq!(ticket.state, TicketState::Valid);
        assert!(ticket.proof_of_work.is_none());
        svc.consume(&ticket.id).unwrap();
    }

    #[test]
    fn test_anonymous_ticket_needs_proof() {
        let svc = service();
        let ticket = svc.request_ticket(&request(), false).unwrap();
        assert_eq!(ticket.state, TicketState::PendingProof);

        let challenge = ticket.proof_of_work.as_ref().unwrap();
        assert_eq!(challenge.bits, 4);
        assert_eq!(
            challenge.data,
            Ticket::challenge(&ticket.from, &ticket.to, &ticket.id).as_str()
        );

        assert!(matches!(svc.consume(&ticket.id), Err(MailError::Rejected(_))));

        let redeemed = svc.redeem_ticket_with_proof(&ticket.id, solve(&ticket)).unwrap();
        assert_eq!(redeemed.state, TicketState::Valid);
        assert!(redeemed.proof_of_work.unwrap().is_valid());
    }

    #[test]
    fn test_wrong_proof_leaves_ticket_pending() {
        let svc = service();
        let ticket = svc.request_ticket(&request(), false).unwrap();

        let err = svc
            .redeem_ticket_with_proof(&ticket.id, wrong_proof(&ticket))
            .unwrap_err();
        assert!(matches!(err, MailError::Rejected(_)));
        assert_eq!(svc.get(&ticket.id).unwrap().state, TicketState::PendingProof);

        // Still redeemable with the right answer
        svc.redeem_ticket_with_proof(&ticket.id, solve(&ticket)).unwrap();
    }

    #[test]
    fn test_redeem_twice() {
        let svc = service();
        let ticket = svc.request_ticket(&request(), false).unwrap();
        let proof = solve(&ticket);

        svc.redeem_ticket_with_proof(&ticket.id, proof).unwrap();
        assert!(matches!(
            svc.redeem_ticket_with_proof(&ticket.id, proof),
            Err(MailError::Rejected(_))
        ));
    }

    #[test]
    fn test_expired_redeem_is_rejected_uniformly() {
        let svc = service();
        let issued = Utc::now();
        let ticket = svc.request_ticket_at(&request(), false, issued).unwrap();
        let later = issued + Duration::minutes(11);

        let expired = svc
            .redeem_ticket_with_proof_at(&ticket.id, solve(&ticket), later)
            .unwrap_err();
        let unknown = svc
            .redeem_ticket_with_proof(&Uuid::new_v4(), 0)
            .unwrap_err();
        assert_eq!(expired.to_string(), unknown.to_string());
        assert_eq!(svc.get(&ticket.id).unwrap().state, TicketState::PendingProof);
    }

    #[test]
    fn test_consume_once() {
        let svc = service();
        let ticket = svc.request_ticket(&request(), true).unwrap();

        svc.consume(&ticket.id).unwrap();
        assert!(matches!(
            svc.consume(&ticket.id),
            Err(MailError::AlreadyConsumed { .. })
        ));
        assert_eq!(svc.get(&ticket.id).unwrap().state, TicketState::Consumed);
    }

    #[test]
    fn test_consume_expired() {
        let svc = service();
        let issued = Utc::now();
        let ticket = svc.request_ticket_at(&request(), true, issued).unwrap();

        assert!(matches!(
            svc.consume_at(&ticket.id, issued + Duration::minutes(10)),
            Err(MailError::Expired { .. })
        ));
        assert!(svc.consume(&Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_purge() {
        let store = Arc::new(InMemoryTicketStore::new());
        let svc = TicketService::new(store.clone(), Duration::minutes(10), 4);
        let past = Utc::now() - Duration::hours(1);
        svc.request_ticket_at(&request(), true, past).unwrap();
        svc.request_ticket(&request(), true).unwrap();

        assert_eq!(svc.purge_expired().unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}
