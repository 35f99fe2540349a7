//! Catalog/encryption engine and message composition.

mod builder;
mod catalog;
mod compose;
mod envelope;
mod header;
mod staging;

pub use builder::MessageBuilder;
pub use catalog::{
    detect_mime_type, open_attachment, open_block, Attachment, Block, Catalog, CatalogParty,
    Compression, DEFAULT_MIME_TYPE,
};
pub use compose::{
    compose, parse_block_spec, Addressing, Envelope, OpenedMessage, DESTINATION_BLOCK,
};
pub use envelope::CatalogEnvelope;
pub use header::{Header, HeaderCatalog, HeaderRecipient, HeaderSender};
pub use staging::{ContentStage, DirStage, MemoryStage};
