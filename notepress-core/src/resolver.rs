//! Rewrites block references into note links while growing the closure.
//!
//! Resolution runs in two passes over the tree. The first collects every
//! reference target in depth-first order and resolves each distinct one
//! against the closure state, fetching metadata for blocks not seen before,
//! enqueueing the owning note and recording the forward edge. The second is
//! a plain tree walk that swaps each reference for a link, or for its
//! display text when the target could not be resolved.

use crate::closure::ClosureState;
use crate::config::FetchFailurePolicy;
use crate::markdown::{Node, Tree, Typography, Visit};
use crate::repository::Repository;
use crate::slug::link_path;
use crate::store::NoteStore;
use notepress_types::NoteId;
use std::collections::HashMap;

/// Link destination of a resolved reference
#[derive(Debug, Clone)]
struct Target {
    id: NoteId,
    title: String,
    url: String,
}

/// What resolving one note produced besides the rewritten tree
#[derive(Debug, Default)]
pub struct Resolution {
    /// Notes enqueued for the first time while resolving this one
    pub discovered: Vec<NoteId>,

    /// Raw targets that stayed plain text
    pub unresolved: Vec<String>,
}

pub struct ReferenceResolver<'a, S> {
    repo: &'a Repository<S>,
    section: &'a str,
    policy: FetchFailurePolicy,
    typography: Typography,
}

impl<'a, S: NoteStore> ReferenceResolver<'a, S> {
    pub fn new(
        repo: &'a Repository<S>,
        section: &'a str,
        policy: FetchFailurePolicy,
        typography: Typography,
    ) -> Self {
        Self {
            repo,
            section,
            policy,
            typography,
        }
    }

    /// Resolve every reference of `source`'s tree in place
    pub async fn resolve(
        &self,
        source: &NoteId,
        tree: &mut Tree,
        state: &mut ClosureState,
    ) -> Resolution {
        let mut resolution = Resolution::default();
        let mut targets: HashMap<String, Option<Target>> = HashMap::new();

        let references: Vec<String> = tree.references().into_iter().map(str::to_string).collect();
        for block in references {
            if targets.contains_key(&block) {
                continue;
            }
            let target = self.resolve_block(source, &block, state, &mut resolution).await;
            targets.insert(block, target);
        }

        tree.walk(&mut |node: &mut Node| {
            let Node::Reference { target, anchor, .. } = node else {
                return Visit::Continue;
            };
            let anchor = anchor.as_deref().filter(|a| !a.is_empty());

            match targets.get(target.as_str()) {
                Some(Some(resolved)) => Visit::Replace(vec![Node::link(
                    Some(resolved.id.clone()),
                    resolved.url.clone(),
                    anchor.unwrap_or(&resolved.title),
                )]),
                _ => {
                    tracing::warn!(
                        note_id = %source,
                        target = %target,
                        "Unresolved reference left as plain text"
                    );
                    Visit::Replace(vec![Node::text(anchor.unwrap_or(target.as_str()))])
                }
            }
        });

        self.typography.apply(tree);
        resolution
    }

    async fn resolve_block(
        &self,
        source: &NoteId,
        block: &str,
        state: &mut ClosureState,
        resolution: &mut Resolution,
    ) -> Option<Target> {
        let metadata = match state.note_for_block(block) {
            Some(known) => known.clone(),
            None if state.is_abandoned(block) => {
                tracing::debug!(note_id = %source, target = %block, "Target previously abandoned");
                state.record_edge(source, &NoteId::new(block));
                resolution.unresolved.push(block.to_string());
                return None;
            }
            None => match self.repo.fetch_metadata(block).await {
                Ok(fetched) => {
                    state.map_block(block, &fetched.id);
                    if state.metadata(&fetched.id).is_none() {
                        state.register(fetched.clone());
                    }
                    fetched
                }
                Err(e) => {
                    tracing::warn!(
                        note_id = %source,
                        target = %block,
                        "Failed to fetch referenced note: {}",
                        e
                    );
                    if self.policy == FetchFailurePolicy::Abandon {
                        state.abandon_block(block);
                    }
                    state.record_edge(source, &NoteId::new(block));
                    resolution.unresolved.push(block.to_string());
                    return None;
                }
            },
        };

        if state.worklist.enqueue(metadata.id.clone()) {
            tracing::info!(
                note_id = %metadata.id,
                title = %metadata.title,
                from = %source,
                "Discovered note indirectly"
            );
            resolution.discovered.push(metadata.id.clone());
        }
        state.record_edge(source, &metadata.id);

        Some(Target {
            url: link_path(self.section, &metadata.slug()),
            id: metadata.id,
            title: metadata.title,
        })
    }
}
