//! Per-server wiring of resolver, keys, policy and stores.

use std::sync::Arc;

use chrono::{Duration, Utc};
use hashpost_lib::message::Header;
use hashpost_lib::{Hash, ResolverService, Result, RoutingConfig, RoutingInfo};
use uuid::Uuid;

use crate::account::{
    Account, AccountError, AccountRepository, AccountService, CreateAccountRequest,
    InMemoryAccountRepository,
};
use crate::config::ServerConfig;
use crate::invite::InviteToken;
use crate::signature;
use crate::ticket::{
    InMemoryTicketStore, Ticket, TicketRedemption, TicketRequest, TicketResponse, TicketService,
    TicketStore,
};

/// Everything a request handler needs, passed in at construction.
#[derive(Clone)]
pub struct ServerContext {
    config: ServerConfig,
    resolver: ResolverService,
    routing: RoutingConfig,
    tickets: TicketService,
    accounts: AccountService,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        resolver: ResolverService,
        routing: RoutingConfig,
        ticket_store: Arc<dyn TicketStore>,
        account_repository: Arc<dyn AccountRepository>,
    ) -> Self {
        let tickets = TicketService::new(
            ticket_store,
            config.ticket_ttl(),
            config.tickets.proof_of_work_bits,
        );
        let accounts = AccountService::new(
            account_repository,
            routing.routing_id.clone(),
            routing.public_key.clone(),
            config.accounts.proof_of_work,
        );
        Self {
            config,
            resolver,
            routing,
            tickets,
            accounts,
        }
    }

    /// Build the configured resolver and in-memory stores.
    pub fn from_config(config: ServerConfig, routing: RoutingConfig) -> Result<Self> {
        let resolver = config.resolver.build()?;
        Ok(Self::new(
            config,
            resolver,
            routing,
            Arc::new(InMemoryTicketStore::new()),
            Arc::new(InMemoryAccountRepository::new()),
        ))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ResolverService {
        &self.resolver
    }

    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    pub fn tickets(&self) -> &TicketService {
        &self.tickets
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Publish this server's routing record.
    pub async fn publish_routing(&self, endpoint: &str) -> Result<()> {
        let info = RoutingInfo {
            routing_id: self.routing.routing_id.clone(),
            public_key: self.routing.public_key.clone(),
            routing: endpoint.to_string(),
        };
        self.resolver
            .upload_routing(&info, &self.routing.private_key)
            .await
    }

    /// Issue a ticket for a message to a recipient the directory knows.
    pub async fn request_ticket(
        &self,
        request: &TicketRequest,
        authenticated: bool,
    ) -> Result<TicketResponse> {
        self.resolver.resolve_address(&request.to_addr).await?;
        let ticket = self.tickets.request_ticket(request, authenticated)?;
        Ok(TicketResponse::from_ticket(&ticket, Utc::now()))
    }

    pub fn redeem_ticket(&self, redemption: &TicketRedemption) -> Result<TicketResponse> {
        let ticket = self
            .tickets
            .redeem_ticket_with_proof(&redemption.ticket_id, redemption.proof_of_work)?;
        Ok(TicketResponse::from_ticket(&ticket, Utc::now()))
    }

    /// Use a ticket for an upload.
    pub fn consume_ticket(&self, id: &Uuid) -> Result<Ticket> {
        self.tickets.consume(id)
    }

    pub async fn create_account(
        &self,
        request: &CreateAccountRequest,
    ) -> std::result::Result<Account, AccountError> {
        self.accounts.create_account(request).await
    }

    /// Invite for `address`, valid for `valid_for`.
    pub fn issue_invite(&self, address: Hash, valid_for: Duration) -> Result<InviteToken> {
        InviteToken::issue(address, &self.routing, Utc::now() + valid_for)
    }

    pub fn sign_header(&self, header: &mut Header) -> Result<()> {
        signature::sign_header(header, &self.routing)
    }

    pub async fn verify_header(&self, header: &Header) -> bool {
        signature::verify_header(header, &self.resolver).await
    }

    pub async fn verify_client_signature(&self, header: &Header) -> bool {
        signature::verify_client_signature(header, &self.resolver).await
    }
}
