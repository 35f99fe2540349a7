//! Human readable addresses and their canonical hashes.
//!
//! An address is `local!` (personal) or `local@org!` (organisational). Input
//! is case-folded before validation so the hash space is canonical.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Hash, MailError};

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([a-z0-9][a-z0-9.\-]{1,61}[a-z0-9])(?:@([a-z0-9][a-z0-9.\-]{0,61}[a-z0-9]))?!$",
    )
    .expect("address pattern is valid")
});

/// A parsed address.
///
/// # Example
///
/// ```
/// use hashpost_lib::Address;
///
/// let addr: Address = "John@Acme!".parse().unwrap();
/// assert_eq!(addr.to_string(), "john@acme!");
/// assert!(addr.is_organisational());
/// assert_eq!(addr.hash(), "john@acme!".parse::<Address>().unwrap().hash());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    local: String,
    org: Option<String>,
}

impl Address {
    /// Parse and canonicalise an address.
    pub fn parse(raw: &str) -> Result<Self, MailError> {
        let lowered = raw.to_lowercase();
        let caps = ADDRESS_RE
            .captures(&lowered)
            .ok_or_else(|| MailError::invalid_format("address", "incorrect address format"))?;

        Ok(Self {
            local: caps[1].to_string(),
            org: caps.get(2).map(|m| m.as_str().to_string()),
        })
    }

    /// Returns true when `raw` parses as an address.
    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// Local part.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Organisation part, if any.
    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    /// Returns true for `local@org!` addresses.
    pub fn is_organisational(&self) -> bool {
        self.org.is_some()
    }

    /// Hash of the local part.
    pub fn local_hash(&self) -> Hash {
        Hash::new(&self.local)
    }

    /// Hash of the organisation part; the hash of "" for personal addresses.
    pub fn org_hash(&self) -> Hash {
        Hash::new(self.org.as_deref().unwrap_or(""))
    }

    /// Directory identity: `H(hex(H(local)) || hex(H(org)))`.
    ///
    /// A third party can be handed the combined hash without learning the
    /// organisation plaintext.
    pub fn hash(&self) -> Hash {
        let mut joined = String::with_capacity(128);
        joined.push_str(self.local_hash().as_str());
        joined.push_str(self.org_hash().as_str());
        Hash::new(joined)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.org {
            Some(org) => write!(f, "{}@{}!", self.local, org),
            None => write!(f, "{}!", self.local),
        }
    }
}

impl FromStr for Address {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = MailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}
