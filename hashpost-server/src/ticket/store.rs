//! Ticket persistence.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use hashpost_lib::{MailError, Result};
use uuid::Uuid;

use super::{Ticket, TicketError};

/// Ticket storage.
///
/// `modify` is the check-then-act primitive: the closure sees the current
/// ticket and its changes are stored as one atomic step. Concurrent calls
/// for the same id never observe each other's intermediate state.
pub trait TicketStore: Send + Sync {
    fn insert(&self, ticket: Ticket) -> Result<()>;

    fn get(&self, id: &Uuid) -> Result<Option<Ticket>>;

    /// Apply `f` to the stored ticket. The ticket is only updated when `f`
    /// returns `Ok`.
    fn modify(
        &self,
        id: &Uuid,
        f: &mut dyn FnMut(&mut Ticket) -> Result<()>,
    ) -> Result<Ticket>;

    fn remove(&self, id: &Uuid) -> Result<()>;

    /// Drop tickets expired at `now`, returning how many were removed.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

fn lock_error() -> MailError {
    MailError::Storage("ticket store lock poisoned".to_string())
}

/// Tickets in a mutex-guarded map.
#[derive(Default)]
pub struct InMemoryTicketStore {
    tickets: Mutex<HashMap<Uuid, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TicketStore for InMemoryTicketStore {
    fn insert(&self, ticket: Ticket) -> Result<()> {
        let mut tickets = self.tickets.lock().map_err(|_| lock_error())?;
        tickets.insert(ticket.id, ticket);
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Result<Option<Ticket>> {
        let tickets = self.tickets.lock().map_err(|_| lock_error())?;
        Ok(tickets.get(id).cloned())
    }

    fn modify(
        &self,
        id: &Uuid,
        f: &mut dyn FnMut(&mut Ticket) -> Result<()>,
    ) -> Result<Ticket> {
        let mut tickets = self.tickets.lock().map_err(|_| lock_error())?;
        let stored = tickets.get_mut(id).ok_or(TicketError::NotFound(*id))?;

        let mut updated = stored.clone();
        f(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    fn remove(&self, id: &Uuid) -> Result<()> {
        let mut tickets = self.tickets.lock().map_err(|_| lock_error())?;
        tickets.remove(id);
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tickets = self.tickets.lock().map_err(|_| lock_error())?;
        let before = tickets.len();
        tickets.retain(|_, t| !t.is_expired_at(now));
        Ok(before - tickets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketState;
    use chrono::Duration;
    use hashpost_lib::Hash;

    fn ticket(valid_for: Duration) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            from: Hash::new("from"),
            to: Hash::new("to"),
            subscription_id: String::new(),
            proof_of_work: None,
            valid_until: Utc::now() + valid_for,
            state: TicketState::Valid,
        }
    }

    #[test]
    fn test_failed_modify_keeps_ticket() {
        let store = InMemoryTicketStore::new();
        let t = ticket(Duration::minutes(5));
        store.insert(t.clone()).unwrap();

        let result = store.modify(&t.id, &mut |t| {
            t.state = TicketState::Consumed;
            Err(MailError::Rejected("no".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.get(&t.id).unwrap().unwrap().state, TicketState::Valid);
    }

    #[test]
    fn test_modify_unknown() {
        let store = InMemoryTicketStore::new();
        let err = store.modify(&Uuid::new_v4(), &mut |_| Ok(())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemoryTicketStore::new();
        store.insert(ticket(Duration::minutes(5))).unwrap();
        store.insert(ticket(Duration::minutes(-5))).unwrap();
        store.insert(ticket(Duration::minutes(-1))).unwrap();

        assert_eq!(store.purge_expired(Utc::now()).unwrap(), 2);
        assert_eq!(store.len(), 1);
    }
}
