//! Content model structs for notes and their published documents.

use crate::markdown::Tree;
use crate::slug::slugify;
use chrono::NaiveDateTime;
use notepress_types::NoteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a custom (front-matter override) attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    DateTime(NaiveDateTime),
    Text(String),
}

/// Metadata of a single note, created once from a repository row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub id: NoteId,
    pub title: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,

    /// Tags in first-occurrence order, without duplicates
    pub tags: Vec<String>,

    /// Asset file names relative to the asset root
    pub asset_filenames: Vec<String>,

    /// Front-matter overrides with the reserved prefix stripped
    pub custom_attributes: BTreeMap<String, AttrValue>,
}

impl NoteMetadata {
    /// URL slug (e.g., "my-notes")
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

/// A backlink entry shown on the referenced note's page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlink {
    pub title: String,
    pub url: String,
}

/// A note moving through the publish pipeline
#[derive(Debug, Clone)]
pub struct NoteDocument {
    pub metadata: NoteMetadata,

    /// Markdown as exported by the note store
    pub raw_content: String,

    /// Markdown with references rewritten and typography normalized
    pub formatted_content: String,

    /// Filled in after the closure is complete
    pub backlinks: Vec<Backlink>,

    /// Resolved tree kept until emission so dangling links can be degraded
    pub(crate) tree: Tree,
}

impl NoteDocument {
    pub fn id(&self) -> &NoteId {
        &self.metadata.id
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Notes this document links to, in order of first appearance
    pub fn link_targets(&self) -> Vec<NoteId> {
        self.tree.link_targets()
    }
}

/// Per-note state in the publish pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteState {
    Pending,
    Fetched,
    Resolved,
    Formatted,
    Done,
    /// Recoverable fetch error; the note is left out of the closure
    Skipped,
    /// Fatal error; the run aborts
    Failed,
}

impl NoteState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteState::Pending => "pending",
            NoteState::Fetched => "fetched",
            NoteState::Resolved => "resolved",
            NoteState::Formatted => "formatted",
            NoteState::Done => "done",
            NoteState::Skipped => "skipped",
            NoteState::Failed => "failed",
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_metadata(id: &str, title: &str) -> NoteMetadata {
    let at = chrono::NaiveDate::from_ymd_opt(2021, 8, 8)
        .and_then(|d| d.and_hms_opt(18, 1, 17))
        .unwrap();
    NoteMetadata {
        id: NoteId::new(id),
        title: title.to_string(),
        created_at: at,
        updated_at: at,
        tags: vec![],
        asset_filenames: vec![],
        custom_attributes: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_slug() {
        let meta = sample_metadata("a", "My Notes");
        assert_eq!(meta.slug(), "my-notes");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(NoteState::Resolved.as_str(), "resolved");
        assert_eq!(NoteState::Skipped.as_str(), "skipped");
    }
}
