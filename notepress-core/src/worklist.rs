//! Insertion-ordered, dedup-guarded queue driving the publish closure.
//!
//! An id is *pending* from the moment it is enqueued until the pipeline
//! either marks it done (it moves to the seen set) or releases it after a
//! failed fetch (it becomes unknown again and may be enqueued anew). Ids
//! enqueued while the queue is being drained are popped after everything
//! already queued, giving breadth-first discovery order.

use notepress_types::NoteId;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<NoteId>,
    pending: HashSet<NoteId>,
    seen: HashSet<NoteId>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue the seed set, dropping duplicates within it
    ///
    /// Returns the number of ids actually queued.
    pub fn seed<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = NoteId>,
    {
        ids.into_iter().filter(|id| self.enqueue(id.clone())).count()
    }

    /// Append `id` unless it is already pending or seen
    ///
    /// Returns whether the id was newly added.
    pub fn enqueue(&mut self, id: NoteId) -> bool {
        if self.seen.contains(&id) || self.pending.contains(&id) {
            return false;
        }
        self.pending.insert(id.clone());
        self.queue.push_back(id);
        true
    }

    /// Remove and return the front id; it stays pending until marked done or released
    pub fn pop(&mut self) -> Option<NoteId> {
        self.queue.pop_front()
    }

    /// Move `id` from pending to seen
    pub fn mark_done(&mut self, id: &NoteId) {
        self.pending.remove(id);
        self.seen.insert(id.clone());
    }

    /// Forget a pending id so a later reference re-attempts it
    pub fn release(&mut self, id: &NoteId) {
        if self.pending.remove(id) {
            self.queue.retain(|queued| queued != id);
        }
    }

    pub fn is_pending(&self, id: &NoteId) -> bool {
        self.pending.contains(id)
    }

    /// True once nothing is queued or in flight
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.pending.is_empty()
    }

    /// Number of ids queued or in flight
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }
}
