//! Edge table and the reverse (backlink) index derived from it.

use notepress_types::{Edge, NoteId};
use std::collections::{HashMap, HashSet};

/// Forward edges in first-discovery order, each pair recorded once
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    edges: Vec<Edge>,
    index: HashSet<Edge>,
}

impl EdgeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edge; returns false if the pair was already known
    pub fn record(&mut self, edge: Edge) -> bool {
        if self.index.contains(&edge) {
            return false;
        }
        self.index.insert(edge.clone());
        self.edges.push(edge);
        true
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Build the reverse index; only done once the closure is complete
    ///
    /// `owner` maps each recorded target to the note it belongs to, so edges
    /// pointing at blocks of one note all land on that note. Pairs that
    /// collapse onto the same note are kept once, at their first position.
    pub(crate) fn freeze<F>(self, owner: F) -> BacklinkIndex
    where
        F: Fn(&NoteId) -> NoteId,
    {
        let mut incoming: HashMap<NoteId, Vec<NoteId>> = HashMap::new();
        let mut kept: HashSet<Edge> = HashSet::new();
        for edge in self.edges {
            let edge = Edge::new(edge.source, owner(&edge.target));
            if edge.is_self_loop() || !kept.insert(edge.clone()) {
                continue;
            }
            incoming.entry(edge.target).or_default().push(edge.source);
        }
        BacklinkIndex { incoming }
    }
}

/// Reverse edges, queryable only after the worklist has drained
#[derive(Debug, Clone, Default)]
pub struct BacklinkIndex {
    incoming: HashMap<NoteId, Vec<NoteId>>,
}

impl BacklinkIndex {
    /// Sources referencing `target` that made it into the emitted set
    ///
    /// Ordered by edge discovery. Self references are never listed.
    pub fn backlinks<'a>(&'a self, target: &NoteId, emitted: &HashSet<NoteId>) -> Vec<&'a NoteId> {
        self.incoming
            .get(target)
            .map(|sources| sources.iter().filter(|s| emitted.contains(*s)).collect())
            .unwrap_or_default()
    }
}
