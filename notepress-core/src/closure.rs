//! Shared mutable state of one publish run.

use crate::backlinks::{BacklinkIndex, EdgeTable};
use crate::models::NoteMetadata;
use crate::worklist::Worklist;
use notepress_types::{Edge, NoteId};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClosureError {
    #[error("Closure still has {0} pending notes")]
    NotDrained(usize),
}

/// Worklist, edge table and everything learned about notes so far
///
/// Owned by the pipeline and lent to the resolver for each note.
#[derive(Debug, Default)]
pub struct ClosureState {
    pub worklist: Worklist,
    edges: EdgeTable,

    /// Metadata of every note discovered so far, by note id
    catalog: HashMap<NoteId, NoteMetadata>,

    /// Referenced block id to the note containing it
    blocks: HashMap<String, NoteId>,

    /// Block ids whose lookup failed for good
    abandoned: HashSet<String>,
}

impl ClosureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata of a discovered note; the note's own id resolves to itself
    pub fn register(&mut self, metadata: NoteMetadata) {
        self.blocks
            .insert(metadata.id.as_str().to_string(), metadata.id.clone());
        self.catalog.insert(metadata.id.clone(), metadata);
    }

    /// Remember which note a referenced block belongs to
    pub fn map_block(&mut self, block: &str, note: &NoteId) {
        self.blocks.insert(block.to_string(), note.clone());
    }

    /// Note a block reference resolves to, if already known
    pub fn note_for_block(&self, block: &str) -> Option<&NoteMetadata> {
        self.blocks.get(block).and_then(|id| self.catalog.get(id))
    }

    pub fn metadata(&self, id: &NoteId) -> Option<&NoteMetadata> {
        self.catalog.get(id)
    }

    pub fn abandon_block(&mut self, block: &str) {
        self.abandoned.insert(block.to_string());
    }

    pub fn is_abandoned(&self, block: &str) -> bool {
        self.abandoned.contains(block)
    }

    /// Record a forward edge; duplicates are ignored
    pub fn record_edge(&mut self, source: &NoteId, target: &NoteId) -> bool {
        self.edges.record(Edge::new(source.clone(), target.clone()))
    }

    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    /// Edge targets not yet known to belong to any note, in discovery order
    pub fn unattributed_targets(&self) -> Vec<String> {
        let mut found = HashSet::new();
        self.edges
            .edges()
            .iter()
            .map(|edge| edge.target.as_str())
            .filter(|target| !self.blocks.contains_key(*target) && found.insert(*target))
            .map(str::to_string)
            .collect()
    }

    /// Close the run and hand out the reverse index
    ///
    /// Edges recorded against a block id count for the note owning that
    /// block. Fails while anything is still queued or in flight, since a
    /// later note may still add edges.
    pub fn finish(self) -> Result<BacklinkIndex, ClosureError> {
        if !self.worklist.is_drained() {
            return Err(ClosureError::NotDrained(self.worklist.outstanding()));
        }
        let blocks = self.blocks;
        Ok(self.edges.freeze(|target| {
            blocks
                .get(target.as_str())
                .cloned()
                .unwrap_or_else(|| target.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_metadata;

    #[test]
    fn test_block_resolution() {
        let mut state = ClosureState::new();
        state.register(sample_metadata("doc-a", "A"));
        state.map_block("block-1", &NoteId::new("doc-a"));

        assert_eq!(state.note_for_block("doc-a").map(|m| m.title.as_str()), Some("A"));
        assert_eq!(state.note_for_block("block-1").map(|m| m.title.as_str()), Some("A"));
        assert!(state.note_for_block("block-2").is_none());
    }

    #[test]
    fn test_finish_requires_drained_worklist() {
        let mut state = ClosureState::new();
        state.worklist.seed([NoteId::new("a")]);
        assert!(matches!(state.finish(), Err(ClosureError::NotDrained(1))));

        let mut state = ClosureState::new();
        state.worklist.seed([NoteId::new("a")]);
        let a = state.worklist.pop().unwrap();
        state.record_edge(&NoteId::new("b"), &a);
        state.worklist.mark_done(&a);

        let index = state.finish().unwrap();
        let emitted: HashSet<NoteId> = [NoteId::new("a"), NoteId::new("b")].into();
        assert_eq!(index.backlinks(&a, &emitted), vec![&NoteId::new("b")]);
    }

    #[test]
    fn test_edges_to_blocks_count_for_owner() {
        let mut state = ClosureState::new();
        state.register(sample_metadata("x", "X"));
        state.record_edge(&NoteId::new("a"), &NoteId::new("blk-1"));
        state.record_edge(&NoteId::new("c"), &NoteId::new("x"));
        state.record_edge(&NoteId::new("c"), &NoteId::new("gone"));
        assert_eq!(state.unattributed_targets(), vec!["blk-1", "gone"]);

        // learned after the edge was recorded
        state.map_block("blk-1", &NoteId::new("x"));
        assert_eq!(state.unattributed_targets(), vec!["gone"]);

        let index = state.finish().unwrap();
        let emitted: HashSet<NoteId> = ["a", "c", "x"].into_iter().map(NoteId::new).collect();
        let names: Vec<&str> = index
            .backlinks(&NoteId::new("x"), &emitted)
            .into_iter()
            .map(NoteId::as_str)
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
