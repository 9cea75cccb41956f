//! Shared types for notepress
//!
//! This crate provides the identifier types used across the notepress
//! crates: note identifiers and the directed reference edges between notes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Note identifier
///
/// Opaque and stable across runs. The note store decides its shape; nothing
/// in notepress interprets it beyond equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        NoteId(id.to_string())
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        NoteId(id)
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A directed reference from one note to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NoteId,
    pub target: NoteId,
}

impl Edge {
    pub fn new(source: impl Into<NoteId>, target: impl Into<NoteId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// True when a note references itself
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
