//! Message catalog: the encrypted index of a message.
//!
//! The catalog lists subject, flags, labels and one descriptor per block or
//! attachment. Each descriptor carries the key and IV for its own content, so
//! content is only readable by somebody who can open the catalog.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use super::staging::ContentStage;
use crate::crypto::{Iv, SymmetricKey};
use crate::{Address, MailError, Result};

/// MIME type used when content sniffing finds nothing.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Compression applied before encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

/// Sender or recipient as written in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogParty {
    pub address: String,
    #[serde(default)]
    pub name: String,
}

/// Descriptor for one content block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Plaintext size in bytes.
    pub size: u64,
    pub key: SymmetricKey,
    pub iv: Iv,
    pub compression: Compression,
}

/// Descriptor for one attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    /// Plaintext size in bytes.
    pub size: u64,
    pub key: SymmetricKey,
    pub iv: Iv,
    pub compression: Compression,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub from: CatalogParty,
    pub to: CatalogParty,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Catalog {
    pub fn new(from: &Address, name: impl Into<String>) -> Self {
        Self {
            from: CatalogParty {
                address: from.to_string(),
                name: name.into(),
            },
            to: CatalogParty {
                address: String::new(),
                name: String::new(),
            },
            subject: String::new(),
            created_at: Utc::now(),
            flags: Vec::new(),
            labels: Vec::new(),
            blocks: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn set_to_address(&mut self, to: &Address, name: impl Into<String>) {
        self.to = CatalogParty {
            address: to.to_string(),
            name: name.into(),
        };
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Add flags, skipping ones already present.
    pub fn add_flags<S: AsRef<str>>(&mut self, flags: &[S]) {
        add_unique(&mut self.flags, flags);
    }

    /// Add labels, skipping ones already present.
    pub fn add_labels<S: AsRef<str>>(&mut self, labels: &[S]) {
        add_unique(&mut self.labels, labels);
    }

    pub fn has_block(&self, kind: &str) -> bool {
        self.blocks.iter().any(|b| b.kind == kind)
    }

    pub fn get_block(&self, kind: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == kind)
    }

    pub fn first_block(&self) -> Option<&Block> {
        self.blocks.first()
    }
}

fn add_unique<S: AsRef<str>>(set: &mut Vec<String>, items: &[S]) {
    for item in items {
        let item = item.as_ref();
        if !set.iter().any(|s| s == item) {
            set.push(item.to_string());
        }
    }
}

/// Result of sealing one payload into the stage.
pub(crate) struct SealedContent {
    pub id: String,
    pub size: u64,
    pub key: SymmetricKey,
    pub iv: Iv,
    pub compression: Compression,
}

/// Read exactly `size` bytes, compress above `threshold`, encrypt under a
/// fresh key and IV, and stage the ciphertext.
///
/// Returns the plaintext too so callers can sniff it.
pub(crate) fn seal_content(
    reader: &mut dyn Read,
    size: u64,
    threshold: usize,
    stage: &dyn ContentStage,
) -> Result<(SealedContent, Vec<u8>)> {
    let mut plaintext = Vec::new();
    reader
        .take(size.saturating_add(1))
        .read_to_end(&mut plaintext)?;
    if plaintext.len() as u64 != size {
        return Err(MailError::invalid_format(
            "content",
            format!("declared {} bytes, read {}", size, plaintext.len()),
        ));
    }

    let (compression, body) = if plaintext.len() > threshold {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&plaintext)?;
        (Compression::Zlib, encoder.finish()?)
    } else {
        tracing::debug!(size, threshold, "compression skipped");
        (Compression::None, plaintext.clone())
    };

    let key = SymmetricKey::generate();
    let iv = Iv::generate();
    let ciphertext = key.encrypt(&iv, &body)?;

    let id = uuid::Uuid::new_v4().to_string();
    stage.write(&id, &mut ciphertext.as_slice())?;

    Ok((
        SealedContent {
            id,
            size,
            key,
            iv,
            compression,
        },
        plaintext,
    ))
}

/// Fetch, decrypt and inflate staged content.
pub(crate) fn open_content(
    stage: &dyn ContentStage,
    id: &str,
    key: &SymmetricKey,
    iv: &Iv,
    compression: Compression,
    size: u64,
) -> Result<Vec<u8>> {
    let mut ciphertext = Vec::new();
    stage.read(id)?.read_to_end(&mut ciphertext)?;
    let body = key.decrypt(iv, &ciphertext)?;

    let plaintext = match compression {
        Compression::None => body,
        Compression::Zlib => {
            // `size` comes from the catalog; never preallocate from it.
            let mut out = Vec::new();
            ZlibDecoder::new(body.as_slice())
                .take(size.saturating_add(1))
                .read_to_end(&mut out)
                .map_err(|e| MailError::invalid_format("content", e.to_string()))?;
            out
        }
    };

    if plaintext.len() as u64 != size {
        return Err(MailError::invalid_format(
            "content",
            format!("expected {} bytes, got {}", size, plaintext.len()),
        ));
    }
    Ok(plaintext)
}

/// Decrypt a block's content.
pub fn open_block(block: &Block, stage: &dyn ContentStage) -> Result<Vec<u8>> {
    open_content(
        stage,
        &block.id,
        &block.key,
        &block.iv,
        block.compression,
        block.size,
    )
}

/// Decrypt an attachment's content.
pub fn open_attachment(attachment: &Attachment, stage: &dyn ContentStage) -> Result<Vec<u8>> {
    open_content(
        stage,
        &attachment.id,
        &attachment.key,
        &attachment.iv,
        attachment.compression,
        attachment.size,
    )
}

/// Sniff a MIME type from the leading bytes.
pub fn detect_mime_type(data: &[u8]) -> String {
    infer::get(data)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MemoryStage;

    #[test]
    fn test_flags_and_labels_dedup() {
        let mut catalog = Catalog::new(&Address::parse("john!").unwrap(), "John");
        catalog.add_flags(&["important", "seen"]);
        catalog.add_flags(&["seen"]);
        catalog.add_labels(&["work"]);
        catalog.add_labels(&["work", "family"]);
        assert_eq!(catalog.flags, vec!["important", "seen"]);
        assert_eq!(catalog.labels, vec!["work", "family"]);
    }

    #[test]
    fn test_small_content_not_compressed() {
        let stage = MemoryStage::new();
        let data = b"this is a 27 byte text blk.";
        assert_eq!(data.len(), 27);

        let (sealed, _) = seal_content(&mut &data[..], 27, 1024, &stage).unwrap();
        assert_eq!(sealed.compression, Compression::None);
        let opened =
            open_content(&stage, &sealed.id, &sealed.key, &sealed.iv, sealed.compression, 27)
                .unwrap();
        assert_eq!(opened, data);
    }

    #[test]
    fn test_large_content_compressed() {
        let stage = MemoryStage::new();
        let data = vec![b'a'; 2048];

        let (sealed, _) = seal_content(&mut data.as_slice(), 2048, 1024, &stage).unwrap();
        assert_eq!(sealed.compression, Compression::Zlib);
        assert_eq!(serde_json::to_string(&sealed.compression).unwrap(), "\"zlib\"");

        let opened =
            open_content(&stage, &sealed.id, &sealed.key, &sealed.iv, sealed.compression, 2048)
                .unwrap();
        assert_eq!(opened, data);
    }

    #[test]
    fn test_oversized_declared_size_is_an_error() {
        let stage = MemoryStage::new();
        let data = vec![b'a'; 2048];
        let (sealed, _) = seal_content(&mut data.as_slice(), 2048, 1024, &stage).unwrap();
        assert_eq!(sealed.compression, Compression::Zlib);

        for size in [u64::MAX, 2049, 2047] {
            let result =
                open_content(&stage, &sealed.id, &sealed.key, &sealed.iv, sealed.compression, size);
            assert!(matches!(result, Err(MailError::InvalidFormat { .. })), "size {size}");
        }
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let stage = MemoryStage::new();
        assert!(seal_content(&mut &b"short"[..], 10, 1024, &stage).is_err());
        assert!(seal_content(&mut &b"too long"[..], 3, 1024, &stage).is_err());
        assert!(stage.is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let stage = MemoryStage::new();
        let (a, _) = seal_content(&mut &b"first"[..], 5, 1024, &stage).unwrap();
        let (b, _) = seal_content(&mut &b"other"[..], 5, 1024, &stage).unwrap();
        assert!(a.key != b.key);
        assert!(open_content(&stage, &b.id, &a.key, &b.iv, b.compression, 5).is_err());
    }

    #[test]
    fn test_mime_detection() {
        let gif = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00\
            !\xf9\x04\x01\x00\x00\x00\x00";
        assert_eq!(detect_mime_type(gif), "image/gif");
        assert_eq!(detect_mime_type(b"plain words"), DEFAULT_MIME_TYPE);
    }
}
