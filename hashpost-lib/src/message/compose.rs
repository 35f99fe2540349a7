//! Turning addressing, subject, blocks and attachments into a sealed message.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::builder::MessageBuilder;
use super::catalog::{open_attachment, open_block, Attachment, Block, Catalog};
use super::envelope::CatalogEnvelope;
use super::header::{Header, HeaderCatalog, HeaderRecipient, HeaderSender};
use super::staging::ContentStage;
use crate::config::CatalogConfig;
use crate::crypto::{PrivateKey, PublicKey};
use crate::resolver::ResolverService;
use crate::{Address, Hash, MailError, Result};

/// Block type carrying the final recipient when relaying through a gateway.
pub const DESTINATION_BLOCK: &str = "destination";

/// Who a message is from and to.
#[derive(Clone, Debug)]
pub struct Addressing {
    pub sender: Address,
    pub sender_name: String,
    pub sender_key: PrivateKey,
    pub recipient: Address,
    pub recipient_name: String,
    pub recipient_key: PublicKey,
    /// Original recipient in a foreign mail format, set by gateways.
    pub destination: Option<String>,
}

impl Addressing {
    pub fn new(
        sender: Address,
        sender_key: PrivateKey,
        recipient: Address,
        recipient_key: PublicKey,
    ) -> Self {
        Self {
            sender,
            sender_name: String::new(),
            sender_key,
            recipient,
            recipient_name: String::new(),
            recipient_key,
            destination: None,
        }
    }

    /// Look the recipient's public key up in the directory.
    pub async fn resolve(
        resolver: &ResolverService,
        sender: Address,
        sender_key: PrivateKey,
        recipient: Address,
    ) -> Result<Self> {
        let info = resolver.resolve_address_by_name(&recipient).await?;
        Ok(Self::new(sender, sender_key, recipient, info.public_key))
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }

    pub fn with_recipient_name(mut self, name: impl Into<String>) -> Self {
        self.recipient_name = name.into();
        self
    }

    pub fn via_gateway(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Parse a `"type,content"` block spec.
pub fn parse_block_spec(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once(',') {
        Some((kind, content)) if !kind.trim().is_empty() => Ok((kind.trim(), content)),
        _ => Err(MailError::invalid_format(
            "block",
            "expected \"type,content\"",
        )),
    }
}

/// A composed message: signed header plus encrypted catalog.
///
/// Block and attachment ciphertext lives in the stage it was composed into.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub catalog: CatalogEnvelope,
}

/// A decrypted message.
#[derive(Debug)]
pub struct OpenedMessage {
    pub catalog: Catalog,
    pub blocks: Vec<(Block, Vec<u8>)>,
    pub attachments: Vec<(Attachment, Vec<u8>)>,
}

impl OpenedMessage {
    /// Plaintext of the first block of type `kind`.
    pub fn block(&self, kind: &str) -> Option<&[u8]> {
        self.blocks
            .iter()
            .find(|(b, _)| b.kind == kind)
            .map(|(_, data)| data.as_slice())
    }
}

impl Envelope {
    /// Decrypt the catalog and all content addressed to `header.to`.
    pub fn open(
        &self,
        private_key: &PrivateKey,
        stage: &dyn ContentStage,
    ) -> Result<OpenedMessage> {
        let checksum = Hash::new(&self.catalog.encrypted_catalog);
        if checksum != self.header.catalog.checksum
            || self.catalog.encrypted_catalog.len() as u64 != self.header.catalog.size
        {
            return Err(MailError::invalid_format(
                "catalog",
                "size or checksum does not match header",
            ));
        }

        let catalog = self.catalog.unseal(&self.header.to.addr, private_key)?;
        let blocks = catalog
            .blocks
            .iter()
            .map(|b| Ok((b.clone(), open_block(b, stage)?)))
            .collect::<Result<Vec<_>>>()?;
        let attachments = catalog
            .attachments
            .iter()
            .map(|a| Ok((a.clone(), open_attachment(a, stage)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(OpenedMessage {
            catalog,
            blocks,
            attachments,
        })
    }
}

/// Build, encrypt and sign a message.
///
/// On failure everything already staged for this message is removed and no
/// envelope is returned.
pub fn compose(
    addressing: &Addressing,
    subject: &str,
    blocks: &[String],
    attachments: &[PathBuf],
    stage: Arc<dyn ContentStage>,
    config: &CatalogConfig,
) -> Result<Envelope> {
    let mut catalog = Catalog::new(&addressing.sender, addressing.sender_name.clone());
    catalog.set_to_address(&addressing.recipient, addressing.recipient_name.clone());
    catalog.set_subject(subject);

    let builder = MessageBuilder::new(catalog, stage.clone(), config.clone());
    if let Err(err) = add_content(&builder, addressing, blocks, attachments) {
        discard(&builder, stage.as_ref());
        return Err(err);
    }

    let recipient_hash = addressing.recipient.hash();
    let recipients = BTreeMap::from([(recipient_hash.clone(), addressing.recipient_key.clone())]);
    let staged = builder.catalog()?;
    let (_, sealed) = match builder.seal(&recipients) {
        Ok(sealed) => sealed,
        Err(err) => {
            remove_staged(&staged, stage.as_ref());
            return Err(err);
        }
    };

    let mut header = Header {
        from: HeaderSender {
            addr: addressing.sender.hash(),
            public_key: addressing.sender_key.public_key(),
            proof_of_work: None,
        },
        to: HeaderRecipient {
            addr: recipient_hash,
        },
        catalog: HeaderCatalog {
            size: sealed.encrypted_catalog.len() as u64,
            checksum: Hash::new(&sealed.encrypted_catalog),
        },
        client_signature: String::new(),
        server_signature: String::new(),
    };
    if let Err(err) = header.sign_client(&addressing.sender_key) {
        remove_staged(&staged, stage.as_ref());
        return Err(err);
    }

    tracing::debug!(
        blocks = staged.blocks.len(),
        attachments = staged.attachments.len(),
        "message composed"
    );
    Ok(Envelope {
        header,
        catalog: sealed,
    })
}

fn add_content(
    builder: &MessageBuilder,
    addressing: &Addressing,
    blocks: &[String],
    attachments: &[PathBuf],
) -> Result<()> {
    if let Some(destination) = &addressing.destination {
        builder.add_block(
            DESTINATION_BLOCK,
            &mut destination.as_bytes(),
            destination.len() as u64,
        )?;
    }
    for spec in blocks {
        let (kind, content) = parse_block_spec(spec)?;
        builder.add_block(kind, &mut content.as_bytes(), content.len() as u64)?;
    }
    for path in attachments {
        builder.add_attachment_path(path)?;
    }
    Ok(())
}

fn discard(builder: &MessageBuilder, stage: &dyn ContentStage) {
    if let Ok(catalog) = builder.catalog() {
        remove_staged(&catalog, stage);
    }
}

fn remove_staged(catalog: &Catalog, stage: &dyn ContentStage) {
    let ids = catalog
        .blocks
        .iter()
        .map(|b| b.id.as_str())
        .chain(catalog.attachments.iter().map(|a| a.id.as_str()));
    for id in ids {
        if let Err(e) = stage.remove(id) {
            tracing::warn!(id, error = %e, "failed to discard staged content");
        }
    }
}
