//! Server policy.

use anyhow::Context;
use hashpost_lib::ResolverConfig;
use serde::{Deserialize, Serialize};

/// Account creation policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Minimum proof-of-work bits for a new account.
    #[serde(default = "default_account_pow")]
    pub proof_of_work: u32,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            proof_of_work: default_account_pow(),
        }
    }
}

/// Ticket policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    /// Lifetime of an issued ticket.
    #[serde(default = "default_ticket_ttl")]
    pub ttl_secs: u64,
    /// Difficulty handed to anonymous senders.
    #[serde(default = "default_ticket_pow")]
    pub proof_of_work_bits: u32,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ticket_ttl(),
            proof_of_work_bits: default_ticket_pow(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub tickets: TicketConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_account_pow() -> u32 {
    22
}

fn default_ticket_ttl() -> u64 {
    600
}

fn default_ticket_pow() -> u32 {
    20
}

impl ServerConfig {
    /// Parse a JSON configuration. Missing sections take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid server configuration")?;
        if config.tickets.ttl_secs == 0 {
            anyhow::bail!("tickets.ttl_secs must be positive");
        }
        Ok(config)
    }

    pub fn with_account_proof_of_work(mut self, bits: u32) -> Self {
        self.accounts.proof_of_work = bits;
        self
    }

    pub fn with_ticket_ttl_secs(mut self, secs: u64) -> Self {
        self.tickets.ttl_secs = secs;
        self
    }

    pub fn with_ticket_proof_of_work(mut self, bits: u32) -> Self {
        self.tickets.proof_of_work_bits = bits;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn ticket_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.tickets.ttl_secs).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashpost_lib::ResolverBackend;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_json("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.accounts.proof_of_work, 22);
        assert_eq!(config.tickets.ttl_secs, 600);
        assert_eq!(config.resolver.backend, ResolverBackend::Memory);
    }

    #[test]
    fn test_partial_json() {
        let config = ServerConfig::from_json(
            r#"{
                "accounts": { "proof_of_work": 25 },
                "resolver": { "backend": { "type": "sqlite", "path": "/var/lib/resolver.db" } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.accounts.proof_of_work, 25);
        assert_eq!(config.tickets.proof_of_work_bits, 20);
        assert_eq!(
            config.resolver.backend,
            ResolverBackend::Sqlite {
                path: "/var/lib/resolver.db".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(ServerConfig::from_json("not json").is_err());
        assert!(ServerConfig::from_json(r#"{"tickets": {"ttl_secs": 0}}"#).is_err());
    }
}
