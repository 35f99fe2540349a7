//! Account creation checks.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashpost_lib::{Hash, MailError, ProofOfWork, PublicKey, Result};
use serde::{Deserialize, Serialize};

use crate::invite::InviteToken;

/// Proof-of-work as sent with an account request. The challenge is always
/// the address hash, so only difficulty and nonce travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestProofOfWork {
    pub bits: u32,
    pub proof: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub address: Hash,
    pub token: String,
    pub public_key: PublicKey,
    pub proof_of_work: RequestProofOfWork,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Hash,
    pub public_key: PublicKey,
    pub created_at: DateTime<Utc>,
}

/// Reasons an account request is refused. Messages are sent to the client
/// as-is.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Proof of work must be at least {0} bits")]
    InsufficientProofOfWork(u32),

    #[error("incorrect proof of work")]
    IncorrectProofOfWork,

    #[error("cannot validate token")]
    InvalidToken,

    #[error("account already exists")]
    AlreadyExists,

    #[error("cannot create account")]
    CreateFailed,
}

impl AccountError {
    /// HTTP status to answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::CreateFailed => 500,
            _ => 400,
        }
    }
}

impl From<AccountError> for MailError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::IncorrectProofOfWork | AccountError::InvalidToken => {
                MailError::AuthenticationFailed
            }
            AccountError::CreateFailed => MailError::Storage(err.to_string()),
            _ => MailError::Rejected(err.to_string()),
        }
    }
}

/// Local account storage.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn exists(&self, address: &Hash) -> Result<bool>;

    /// Store `account`. A duplicate address is refused with
    /// [`MailError::Rejected`].
    async fn create(&self, account: &Account) -> Result<()>;

    async fn get(&self, address: &Hash) -> Result<Option<Account>>;
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<Hash, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error() -> MailError {
    MailError::Storage("account store lock poisoned".to_string())
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn exists(&self, address: &Hash) -> Result<bool> {
        let accounts = self.accounts.read().map_err(|_| lock_error())?;
        Ok(accounts.contains_key(address))
    }

    async fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(|_| lock_error())?;
        if accounts.contains_key(&account.address) {
            return Err(MailError::Rejected("account already exists".to_string()));
        }
        accounts.insert(account.address.clone(), account.clone());
        Ok(())
    }

    async fn get(&self, address: &Hash) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(|_| lock_error())?;
        Ok(accounts.get(address).cloned())
    }
}

/// Validates and stores new accounts for one server.
#[derive(Clone)]
pub struct AccountService {
    repository: Arc<dyn AccountRepository>,
    routing_id: Hash,
    routing_key: PublicKey,
    min_pow_bits: u32,
}

impl AccountService {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        routing_id: Hash,
        routing_key: PublicKey,
        min_pow_bits: u32,
    ) -> Self {
        Self {
            repository,
            routing_id,
            routing_key,
            min_pow_bits,
        }
    }

    pub fn min_proof_of_work_bits(&self) -> u32 {
        self.min_pow_bits
    }

    pub fn repository(&self) -> &Arc<dyn AccountRepository> {
        &self.repository
    }

    pub async fn create_account(
        &self,
        request: &CreateAccountRequest,
    ) -> std::result::Result<Account, AccountError> {
        self.create_account_at(request, Utc::now()).await
    }

    /// Create an account. Checks run in a fixed order and the first failure
    /// is reported: difficulty, proof, invite token, uniqueness.
    pub async fn create_account_at(
        &self,
        request: &CreateAccountRequest,
        now: DateTime<Utc>,
    ) -> std::result::Result<Account, AccountError> {
        let pow = &request.proof_of_work;
        if pow.bits < self.min_pow_bits {
            return Err(AccountError::InsufficientProofOfWork(self.min_pow_bits));
        }

        let work = ProofOfWork::new(pow.bits, request.address.as_str(), pow.proof);
        if !work.is_valid() {
            tracing::trace!(address = %request.address, "account proof of work rejected");
            return Err(AccountError::IncorrectProofOfWork);
        }

        let token_ok = InviteToken::parse(&request.token)
            .map(|t| t.verify(&request.address, &self.routing_id, &self.routing_key, now))
            .unwrap_or(false);
        if !token_ok {
            return Err(AccountError::InvalidToken);
        }

        match self.repository.exists(&request.address).await {
            Ok(false) => {}
            Ok(true) => return Err(AccountError::AlreadyExists),
            Err(e) => {
                tracing::warn!(error = %e, "account lookup failed");
                return Err(AccountError::CreateFailed);
            }
        }

        let account = Account {
            address: request.address.clone(),
            public_key: request.public_key.clone(),
            created_at: now,
        };
        match self.repository.create(&account).await {
            Ok(()) => {}
            // Lost a race with a concurrent request for the same address.
            Err(MailError::Rejected(_)) => return Err(AccountError::AlreadyExists),
            Err(e) => {
                tracing::warn!(error = %e, "account creation failed");
                return Err(AccountError::CreateFailed);
            }
        }

        tracing::debug!(address = %account.address, "account created");
        Ok(account)
    }
}
