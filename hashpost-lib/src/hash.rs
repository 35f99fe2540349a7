//! Opaque SHA-256 identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::MailError;

/// Length of a hash in its hex form.
pub const HASH_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 digest.
///
/// Two hashes are equal exactly when their strings are equal. Values coming
/// off the wire are validated on construction, so a `Hash` always has the
/// canonical shape.
///
/// # Example
///
/// ```
/// use hashpost_lib::Hash;
///
/// let h = Hash::new("john");
/// assert_eq!(h.as_str().len(), 64);
/// assert_eq!(Hash::from_hex(h.as_str()).unwrap(), h);
/// assert!(Hash::from_hex("not-a-hash").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash(String);

impl Hash {
    /// Hash arbitrary bytes.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self(hex::encode(Sha256::digest(data.as_ref())))
    }

    /// Wrap an existing hex digest after validating its shape.
    pub fn from_hex(value: &str) -> Result<Self, MailError> {
        let valid = value.len() == HASH_HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(MailError::invalid_format(
                "hash",
                "expected 64 lowercase hex characters",
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Hash {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Hash {
    type Error = MailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Hash> for String {
    fn from(h: Hash) -> Self {
        h.0
    }
}

impl AsRef<str> for Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
