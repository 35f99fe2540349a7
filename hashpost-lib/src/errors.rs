//! Error types for Hashpost operations.
//!
//! Every fallible operation in the core funnels into [`MailError`]. The
//! variants follow the protocol taxonomy: format problems are caught before
//! any cryptography runs, lookups report `NotFound` instead of inventing a
//! default, and verification failures collapse into a single
//! `AuthenticationFailed` so callers cannot be used as an oracle.

use std::fmt;

/// Error codes for FFI and HTTP integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MailErrorCode {
    /// Malformed address, hash or wire value
    InvalidFormat = 1000,
    /// Directory record or resource missing
    NotFound = 2000,
    /// Signature, token or proof-of-work verification failed
    AuthenticationFailed = 3000,
    /// Request rejected by policy
    Rejected = 3001,
    /// Ticket or token past its lifetime
    Expired = 4000,
    /// Single-use ticket already redeemed
    AlreadyConsumed = 4001,
    /// Key generation, wrap/unwrap or cipher failure
    Encryption = 5000,
    /// Serialization error
    Serialization = 5001,
    /// Backend read/write failure
    Storage = 6000,
    /// Transport/network layer error
    Transport = 7000,
    /// Operation timed out
    Timeout = 7001,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Error type for Hashpost operations.
#[derive(Debug)]
pub enum MailError {
    /// Malformed input (address, hash, key string, block spec, ...).
    InvalidFormat {
        /// Field or value kind
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Directory record or resource missing.
    NotFound {
        /// Type of resource (e.g., "address", "routing", "organisation")
        resource_type: String,
        /// Resource identifier
        identifier: String,
    },

    /// A signature, token or proof did not verify.
    ///
    /// The message is deliberately generic; the precise reason is logged.
    AuthenticationFailed,

    /// Request rejected by policy (e.g., insufficient proof-of-work).
    Rejected(String),

    /// Ticket or token past its lifetime.
    Expired {
        /// Identifier of the expired item
        identifier: String,
    },

    /// A single-use item was presented a second time.
    AlreadyConsumed {
        /// Identifier of the consumed item
        identifier: String,
    },

    /// Cryptographic failure; fatal to the surrounding operation.
    Encryption(String),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Storage backend failure.
    Storage(String),

    /// Transport/network layer error.
    Transport(String),

    /// Operation timed out. Never retried by the core.
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Internal/unexpected error.
    Internal(String),
}

impl MailError {
    /// Get the error code for FFI/HTTP integration.
    pub fn code(&self) -> MailErrorCode {
        match self {
            Self::InvalidFormat { .. } => MailErrorCode::InvalidFormat,
            Self::NotFound { .. } => MailErrorCode::NotFound,
            Self::AuthenticationFailed => MailErrorCode::AuthenticationFailed,
            Self::Rejected(_) => MailErrorCode::Rejected,
            Self::Expired { .. } => MailErrorCode::Expired,
            Self::AlreadyConsumed { .. } => MailErrorCode::AlreadyConsumed,
            Self::Encryption(_) => MailErrorCode::Encryption,
            Self::Serialization(_) => MailErrorCode::Serialization,
            Self::Storage(_) => MailErrorCode::Storage,
            Self::Transport(_) => MailErrorCode::Transport,
            Self::Timeout { .. } => MailErrorCode::Timeout,
            Self::Internal(_) => MailErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if the calling layer may reasonably retry.
    ///
    /// The core itself never retries; this is advice for the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Storage(_)
        )
    }

    /// Returns true for a missing directory record or resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Create an invalid format error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat { field, reason } => write!(f, "invalid {}: {}", field, reason),
            Self::NotFound {
                resource_type,
                identifier,
            } => write!(f, "{} not found: {}", resource_type, identifier),
            Self::AuthenticationFailed => write!(f, "unauthorized"),
            Self::Rejected(msg) => write!(f, "rejected: {}", msg),
            Self::Expired { identifier } => write!(f, "{} has expired", identifier),
            Self::AlreadyConsumed { identifier } => {
                write!(f, "{} has already been used", identifier)
            }
            Self::Encryption(msg) => write!(f, "encryption error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Storage(msg) => write!(f, "storage error: {}", msg),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::Timeout {
                operation,
                timeout_ms,
            } => write!(f, "{} timed out after {}ms", operation, timeout_ms),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for MailError {}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for MailError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = MailError::Timeout {
            operation: "resolve_address".to_string(),
            timeout_ms: 1000,
        };
        assert_eq!(err.code(), MailErrorCode::Timeout);
        assert!(err.is_retryable());
        assert!(!MailError::AuthenticationFailed.is_retryable());
    }

    #[test]
    fn test_authentication_failure_is_generic() {
        assert_eq!(MailError::AuthenticationFailed.to_string(), "unauthorized");
    }

    #[test]
    fn test_helper_constructors() {
        let err = MailError::not_found("address", "abc");
        assert_eq!(err.code(), MailErrorCode::NotFound);
        assert!(err.is_not_found());

        let err = MailError::invalid_format("hash", "must be 64 hex characters");
        assert_eq!(err.code(), MailErrorCode::InvalidFormat);
        assert!(err.to_string().contains("hash"));
    }
}
