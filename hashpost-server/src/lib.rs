//! # Hashpost server protocol
//!
//! Server-side pieces built on `hashpost-lib`:
//! - single-use upload tickets, gated by proof-of-work for anonymous senders
//! - account creation checks (proof-of-work, invite token, uniqueness)
//! - origin-server header signatures and their verification via the resolver
//!
//! Everything is wired through a [`ServerContext`] that owns the resolver,
//! the routing keys and the policy; there is no global state.

pub mod account;
pub mod config;
pub mod context;
pub mod invite;
pub mod signature;
pub mod ticket;

pub use account::{
    Account, AccountError, AccountRepository, AccountService, CreateAccountRequest,
    InMemoryAccountRepository, RequestProofOfWork,
};
pub use config::{AccountsConfig, ServerConfig, TicketConfig};
pub use context::ServerContext;
pub use invite::InviteToken;
pub use signature::{sign_header, verify_client_signature, verify_header};
pub use ticket::{
    InMemoryTicketStore, Ticket, TicketChallenge, TicketError, TicketRedemption, TicketRequest,
    TicketResponse, TicketService, TicketState, TicketStore,
};

pub use hashpost_lib::{MailError, Result};
