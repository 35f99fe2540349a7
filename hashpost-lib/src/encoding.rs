//! Base64 helpers shared by the wire types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::MailError;

/// Encode bytes as standard base64.
pub fn to_base64(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64, naming the offending field on failure.
pub fn from_base64(field: &str, value: &str) -> Result<Vec<u8>, MailError> {
    STANDARD
        .decode(value)
        .map_err(|e| MailError::invalid_format(field, e.to_string()))
}

/// `#[serde(with = "crate::encoding::base64_bytes")]` for `Vec<u8>` fields.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
