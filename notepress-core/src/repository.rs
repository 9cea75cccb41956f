//! Typed note repository layered over a raw [`NoteStore`].

use crate::models::{AttrValue, NoteMetadata};
use crate::row::{asset_filename, parse_custom_attributes, NoteRow, ParseError};
use crate::store::{NoteStore, SeedFilter, StoreError};
use notepress_types::NoteId;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("No document contains block {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed row for {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: ParseError,
    },
}

/// Note repository: strict metadata on top of loosely typed store rows
pub struct Repository<S> {
    store: S,
    attribute_prefix: String,
}

impl<S: NoteStore> Repository<S> {
    pub fn new(store: S, attribute_prefix: impl Into<String>) -> Self {
        Self {
            store,
            attribute_prefix: attribute_prefix.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn fetch_seed_ids(&self, filter: &SeedFilter) -> Result<Vec<NoteId>, StoreError> {
        self.store.fetch_seed_ids(filter).await
    }

    /// Metadata of the note containing `block_id`
    ///
    /// A note id is also a block id, so this doubles as a lookup by note.
    pub async fn fetch_metadata(&self, block_id: &str) -> Result<NoteMetadata, FetchError> {
        let row = self
            .store
            .fetch_document_row(block_id)
            .await?
            .ok_or_else(|| FetchError::NotFound(block_id.to_string()))?;

        let note = NoteRow::parse(&row).map_err(|source| FetchError::Parse {
            id: block_id.to_string(),
            source,
        })?;

        let assets = self
            .store
            .fetch_asset_paths(&note.id)
            .await?
            .iter()
            .filter_map(|path| asset_filename(path))
            .fold(Vec::new(), |mut names, name| {
                if !names.contains(&name) {
                    names.push(name);
                }
                names
            });
        let attrs = self.fetch_custom_attributes(&note.id).await?;

        tracing::debug!(
            note_id = %note.id,
            title = %note.title,
            assets = assets.len(),
            "Fetched metadata"
        );
        Ok(note.into_metadata(assets, attrs))
    }

    pub async fn fetch_raw_content(&self, id: &NoteId) -> Result<String, StoreError> {
        self.store.fetch_raw_content(id).await
    }

    /// Front-matter overrides with the reserved prefix stripped
    pub async fn fetch_custom_attributes(
        &self,
        id: &NoteId,
    ) -> Result<BTreeMap<String, AttrValue>, StoreError> {
        let rows = self
            .store
            .fetch_attribute_rows(id, &self.attribute_prefix)
            .await?;
        Ok(parse_custom_attributes(id, &rows, &self.attribute_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryNote;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_metadata_through_block() {
        let store = MemoryStore::new().with_note(
            MemoryNote::new("doc-a", "Rust Notes")
                .block("blk-1")
                .tags("#rust# #notes#")
                .asset("assets/a.png")
                .asset("assets/a.png")
                .attribute("custom-sn-weight", "10"),
        );
        let repo = Repository::new(store, "custom-sn-");

        let meta = repo.fetch_metadata("blk-1").await.unwrap();
        assert_eq!(meta.id, NoteId::new("doc-a"));
        assert_eq!(meta.title, "Rust Notes");
        assert_eq!(meta.tags, vec!["rust", "notes"]);
        assert_eq!(meta.asset_filenames, vec!["a.png"]);
        assert_eq!(
            meta.custom_attributes.get("weight"),
            Some(&AttrValue::Text("10".into()))
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata_not_found() {
        let repo = Repository::new(MemoryStore::new(), "custom-sn-");
        assert!(matches!(
            repo.fetch_metadata("nope").await,
            Err(FetchError::NotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_fetch_metadata_malformed_row() {
        let store = MemoryStore::new()
            .with_note(MemoryNote::new("a", "A").raw_row(json!({"id": "a", "content": 5})));
        let repo = Repository::new(store, "custom-sn-");

        match repo.fetch_metadata("a").await {
            Err(FetchError::Parse { id, source }) => {
                assert_eq!(id, "a");
                assert_eq!(source.field, "content");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
