//! In-memory note store with failure injection.

use super::{NoteStore, SeedFilter, StoreError};
use crate::row::RawRow;
use async_trait::async_trait;
use notepress_types::NoteId;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;

/// A document held by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryNote {
    id: NoteId,
    row: RawRow,
    content: String,
    published: bool,
    blocks: Vec<String>,
    assets: Vec<String>,
    attributes: Vec<(String, String)>,
}

impl MemoryNote {
    pub fn new(id: &str, title: &str) -> Self {
        let row = json!({
            "id": id,
            "type": "d",
            "content": title,
            "created": "20210808180117",
            "updated": "",
            "tag": "",
        });

        Self {
            id: NoteId::new(id),
            row: into_row(row),
            content: String::new(),
            published: false,
            blocks: Vec::new(),
            assets: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    /// Carry the publish attribute (part of the seed set)
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    pub fn created(mut self, created: &str) -> Self {
        self.row.insert("created".into(), Value::String(created.to_string()));
        self
    }

    pub fn updated(mut self, updated: &str) -> Self {
        self.row.insert("updated".into(), Value::String(updated.to_string()));
        self
    }

    /// Tags as the store reports them (`#a# #b#`)
    pub fn tags(mut self, tags: &str) -> Self {
        self.row.insert("tag".into(), Value::String(tags.to_string()));
        self
    }

    /// A block inside this document that references may point at
    pub fn block(mut self, block_id: &str) -> Self {
        self.blocks.push(block_id.to_string());
        self
    }

    pub fn asset(mut self, path: &str) -> Self {
        self.assets.push(path.to_string());
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    /// Replace the document row wholesale, e.g. with a malformed one
    pub fn raw_row(mut self, row: Value) -> Self {
        self.row = into_row(row);
        self
    }
}

fn into_row(value: Value) -> RawRow {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = RawRow::new();
            map.insert("value".into(), other);
            map
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    seeds: bool,
    rows: HashMap<String, Option<usize>>,
    content: HashMap<NoteId, Option<usize>>,
}

/// Take one failure from a fault budget; `None` fails forever
fn take_fault<K: std::hash::Hash + Eq>(faults: &mut HashMap<K, Option<usize>>, key: &K) -> bool {
    match faults.get_mut(key) {
        Some(None) => true,
        Some(Some(0)) | None => false,
        Some(Some(remaining)) => {
            *remaining -= 1;
            true
        }
    }
}

/// Note store kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    notes: Vec<MemoryNote>,
    blocks: HashMap<String, NoteId>,
    faults: Mutex<Faults>,
    row_fetches: Mutex<HashMap<String, usize>>,
    content_fetches: Mutex<HashMap<NoteId, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_note(mut self, note: MemoryNote) -> Self {
        self.blocks
            .insert(note.id.as_str().to_string(), note.id.clone());
        for block in &note.blocks {
            self.blocks.insert(block.clone(), note.id.clone());
        }
        self.notes.push(note);
        self
    }

    /// Make the seed query fail
    pub fn fail_seeds(self) -> Self {
        self.faults.lock().seeds = true;
        self
    }

    /// Make row lookups of `block_id` fail, `times` times or forever
    pub fn fail_row(self, block_id: &str, times: Option<usize>) -> Self {
        self.faults.lock().rows.insert(block_id.to_string(), times);
        self
    }

    /// Make content exports of `note` fail, `times` times or forever
    pub fn fail_content(self, note: &str, times: Option<usize>) -> Self {
        self.faults
            .lock()
            .content
            .insert(NoteId::new(note), times);
        self
    }

    pub fn row_fetches(&self, block_id: &str) -> usize {
        self.row_fetches.lock().get(block_id).copied().unwrap_or(0)
    }

    pub fn content_fetches(&self, note: &str) -> usize {
        self.content_fetches
            .lock()
            .get(&NoteId::new(note))
            .copied()
            .unwrap_or(0)
    }

    fn note(&self, id: &NoteId) -> Option<&MemoryNote> {
        self.notes.iter().find(|n| &n.id == id)
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn fetch_seed_ids(&self, _filter: &SeedFilter) -> Result<Vec<NoteId>, StoreError> {
        if self.faults.lock().seeds {
            return Err(StoreError::Unavailable("seed query".into()));
        }
        Ok(self
            .notes
            .iter()
            .filter(|n| n.published)
            .map(|n| n.id.clone())
            .collect())
    }

    async fn fetch_document_row(&self, block_id: &str) -> Result<Option<RawRow>, StoreError> {
        *self
            .row_fetches
            .lock()
            .entry(block_id.to_string())
            .or_default() += 1;

        if take_fault(&mut self.faults.lock().rows, &block_id.to_string()) {
            return Err(StoreError::Unavailable(format!("row of {block_id}")));
        }

        Ok(self
            .blocks
            .get(block_id)
            .and_then(|id| self.note(id))
            .map(|n| n.row.clone()))
    }

    async fn fetch_asset_paths(&self, note: &NoteId) -> Result<Vec<String>, StoreError> {
        Ok(self.note(note).map(|n| n.assets.clone()).unwrap_or_default())
    }

    async fn fetch_attribute_rows(
        &self,
        note: &NoteId,
        prefix: &str,
    ) -> Result<Vec<RawRow>, StoreError> {
        let Some(note) = self.note(note) else {
            return Ok(Vec::new());
        };
        Ok(note
            .attributes
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, value)| into_row(json!({ "name": name, "value": value })))
            .collect())
    }

    async fn fetch_raw_content(&self, note: &NoteId) -> Result<String, StoreError> {
        *self.content_fetches.lock().entry(note.clone()).or_default() += 1;

        if take_fault(&mut self.faults.lock().content, note) {
            return Err(StoreError::Unavailable(format!("content of {note}")));
        }

        self.note(note)
            .map(|n| n.content.clone())
            .ok_or_else(|| StoreError::Unavailable(format!("no document {note}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_block_lookup() {
        let store = MemoryStore::new().with_note(MemoryNote::new("doc-a", "A").block("blk-1"));

        let row = store.fetch_document_row("blk-1").await.unwrap().unwrap();
        assert_eq!(row.get("id"), Some(&Value::String("doc-a".into())));
        assert!(store.fetch_document_row("blk-2").await.unwrap().is_none());
        assert_eq!(store.row_fetches("blk-1"), 1);
    }

    #[tokio::test]
    async fn test_fault_budget() {
        let store = MemoryStore::new()
            .with_note(MemoryNote::new("a", "A").content("body"))
            .fail_content("a", Some(1));

        let id = NoteId::new("a");
        assert!(store.fetch_raw_content(&id).await.is_err());
        assert_eq!(store.fetch_raw_content(&id).await.unwrap(), "body");
        assert_eq!(store.content_fetches("a"), 2);
    }
}
