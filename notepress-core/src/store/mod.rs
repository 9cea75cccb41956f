//! Note store collaborator: the wire-level operations notepress consumes.

pub mod memory;
pub mod siyuan;

use crate::row::RawRow;
use async_trait::async_trait;
use notepress_types::NoteId;
use thiserror::Error;

pub use memory::MemoryStore;
pub use siyuan::SiyuanStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Store API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Not available: {0}")]
    Unavailable(String),
}

/// Attribute pair marking documents for publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFilter {
    pub attribute: String,
    pub value: String,
}

impl SeedFilter {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Read access to the note store
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Ids of documents carrying the filter attribute, oldest first
    async fn fetch_seed_ids(&self, filter: &SeedFilter) -> Result<Vec<NoteId>, StoreError>;

    /// Row of the document containing `block_id`; a document contains itself
    async fn fetch_document_row(&self, block_id: &str) -> Result<Option<RawRow>, StoreError>;

    /// Asset paths (`assets/<file>`) used by a document
    async fn fetch_asset_paths(&self, note: &NoteId) -> Result<Vec<String>, StoreError>;

    /// `{name, value}` rows of the document's attributes starting with `prefix`
    async fn fetch_attribute_rows(
        &self,
        note: &NoteId,
        prefix: &str,
    ) -> Result<Vec<RawRow>, StoreError>;

    /// Exported markdown of a document
    async fn fetch_raw_content(&self, note: &NoteId) -> Result<String, StoreError>;
}
