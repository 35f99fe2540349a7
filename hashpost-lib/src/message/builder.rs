use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::catalog::{detect_mime_type, seal_content, Attachment, Block, Catalog};
use super::envelope::CatalogEnvelope;
use super::staging::ContentStage;
use crate::config::CatalogConfig;
use crate::crypto::PublicKey;
use crate::{Hash, MailError, Result};

/// Assembles a catalog while its content is encrypted into a stage.
///
/// Blocks and attachments may be added from several threads. Encryption runs
/// without the catalog lock; only the final append is serialized. A failed
/// add leaves the catalog untouched.
pub struct MessageBuilder {
    catalog: Mutex<Catalog>,
    stage: Arc<dyn ContentStage>,
    config: CatalogConfig,
}

impl MessageBuilder {
    pub fn new(catalog: Catalog, stage: Arc<dyn ContentStage>, config: CatalogConfig) -> Self {
        Self {
            catalog: Mutex::new(catalog),
            stage,
            config,
        }
    }

    pub fn stage(&self) -> &Arc<dyn ContentStage> {
        &self.stage
    }

    /// Encrypt `size` bytes from `reader` as a block of type `kind`.
    pub fn add_block(&self, kind: &str, reader: &mut dyn Read, size: u64) -> Result<Block> {
        let (sealed, _) = seal_content(
            reader,
            size,
            self.config.compression_threshold,
            self.stage.as_ref(),
        )?;
        let block = Block {
            id: sealed.id,
            kind: kind.to_string(),
            size: sealed.size,
            key: sealed.key,
            iv: sealed.iv,
            compression: sealed.compression,
        };

        self.lock()?.blocks.push(block.clone());
        Ok(block)
    }

    /// Encrypt `size` bytes from `reader` as an attachment named `file_name`.
    pub fn add_attachment(
        &self,
        file_name: &str,
        reader: &mut dyn Read,
        size: u64,
    ) -> Result<Attachment> {
        let (sealed, plaintext) = seal_content(
            reader,
            size,
            self.config.compression_threshold,
            self.stage.as_ref(),
        )?;
        let attachment = Attachment {
            id: sealed.id,
            file_name: file_name.to_string(),
            mime_type: detect_mime_type(&plaintext),
            size: sealed.size,
            key: sealed.key,
            iv: sealed.iv,
            compression: sealed.compression,
        };

        self.lock()?.attachments.push(attachment.clone());
        Ok(attachment)
    }

    /// Attach a file from disk under its base name.
    pub fn add_attachment_path(&self, path: impl AsRef<Path>) -> Result<Attachment> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MailError::invalid_format("attachment", path.display().to_string()))?
            .to_string();
        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        self.add_attachment(&file_name, &mut file, size)
    }

    /// Snapshot of the catalog as it stands.
    pub fn catalog(&self) -> Result<Catalog> {
        Ok(self.lock()?.clone())
    }

    /// Finish composition and encrypt the catalog for `recipients`.
    pub fn seal(
        self,
        recipients: &BTreeMap<Hash, PublicKey>,
    ) -> Result<(Catalog, CatalogEnvelope)> {
        let catalog = self
            .catalog
            .into_inner()
            .map_err(|_| MailError::Internal("catalog lock poisoned".to_string()))?;
        let envelope = CatalogEnvelope::seal(&catalog, recipients)?;
        Ok((catalog, envelope))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Catalog>> {
        self.catalog
            .lock()
            .map_err(|_| MailError::Internal("catalog lock poisoned".to_string()))
    }
}
