//! Publish pipeline: closure discovery, backlinks and emission.
//!
//! Flow: seeds → Worklist → fetch → resolve → format   (phase 1, sequential)
//!       closure drained → backlinks → assets → emit    (phase 2)
//!
//! Phase 1 drains the worklist one note at a time, so fetches happen in pop
//! order with one request in flight. Nothing is written until phase 1 is
//! complete and every emitted note's slug is known to be unique.

use crate::assets::{AssetError, AssetLocator};
use crate::backlinks::BacklinkIndex;
use crate::closure::{ClosureError, ClosureState};
use crate::config::{Config, FetchFailurePolicy};
use crate::emit::{EmitError, Emitter, MarkdownEmitter};
use crate::markdown::{self, Node, Typography, Visit};
use crate::models::{Backlink, NoteDocument, NoteMetadata, NoteState};
use crate::repository::{FetchError, Repository};
use crate::resolver::ReferenceResolver;
use crate::slug::link_path;
use crate::store::{NoteStore, SeedFilter, StoreError};
use notepress_types::NoteId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors; any of these aborts the run
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to fetch the seed set: {0}")]
    SeedQuery(#[source] StoreError),

    #[error("Failed to fetch seed note {id}: {source}")]
    Seed {
        id: NoteId,
        #[source]
        source: FetchError,
    },

    #[error("Failed to fetch content of seed note {id}: {source}")]
    SeedContent {
        id: NoteId,
        #[source]
        source: StoreError,
    },

    #[error("Duplicate slug {slug}: notes {first} and {second}")]
    DuplicateSlug {
        slug: String,
        first: NoteId,
        second: NoteId,
    },

    #[error("Note {id} has no usable slug (title {title:?})")]
    InvalidSlug { id: NoteId, title: String },

    #[error(transparent)]
    Closure(#[from] ClosureError),

    #[error("Failed to emit note {id}: {source}")]
    Emit {
        id: NoteId,
        #[source]
        source: EmitError,
    },

    #[error("Failed to copy assets of note {id}: {source}")]
    Asset {
        id: NoteId,
        #[source]
        source: AssetError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A note left out of the closure after a recoverable fetch error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNote {
    pub id: NoteId,
    pub title: String,
    pub reason: String,
}

/// A reference that ended up as plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub source: NoteId,
    pub target: String,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    /// Emitted notes in emission order
    pub emitted: Vec<NoteId>,
    pub skipped: Vec<SkippedNote>,
    /// Final state of every note that entered the worklist
    pub states: BTreeMap<NoteId, NoteState>,
    pub assets_copied: usize,
    pub unresolved: Vec<UnresolvedReference>,
}

impl PublishReport {
    pub fn state(&self, id: &NoteId) -> Option<NoteState> {
        self.states.get(id).copied()
    }
}

/// Closure ready for emission; nothing has been written yet
#[derive(Debug)]
pub struct Plan {
    /// Documents in processing order, backlinks filled in
    pub documents: Vec<NoteDocument>,
    pub report: PublishReport,
}

/// Everything phase 1 produced
struct Discovery {
    documents: Vec<NoteDocument>,
    index: BacklinkIndex,
    report: PublishReport,
}

pub struct PublishPipeline<S, E = MarkdownEmitter> {
    config: Config,
    repo: Repository<S>,
    emitter: E,
}

impl<S: NoteStore> PublishPipeline<S> {
    pub fn new(config: Config, store: S) -> Self {
        let emitter = MarkdownEmitter::new(config.format.backlinks_heading.clone());
        Self::with_emitter(config, store, emitter)
    }
}

impl<S: NoteStore, E: Emitter> PublishPipeline<S, E> {
    pub fn with_emitter(config: Config, store: S, emitter: E) -> Self {
        let repo = Repository::new(store, config.publish.attribute_prefix.clone());
        Self {
            config,
            repo,
            emitter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.repo.store()
    }

    /// Run phase 1 and plan phase 2 without touching the filesystem
    pub async fn plan(&self) -> Result<Plan, PublishError> {
        let Discovery {
            mut documents,
            index,
            mut report,
        } = self.discover().await?;

        self.link_closure(&mut documents, &index, &mut report)?;
        Ok(Plan { documents, report })
    }

    /// Full run: discover, then write every note of the closure
    pub async fn publish(&self) -> Result<PublishReport, PublishError> {
        let Plan {
            documents,
            mut report,
        } = self.plan().await?;

        let content_dir = self.config.content_dir();
        let io_err = |source| PublishError::Io {
            path: content_dir.clone(),
            source,
        };

        if self.config.site.clean && content_dir.exists() {
            tracing::info!(path = %content_dir.display(), "Cleaning section directory");
            fs::remove_dir_all(&content_dir).map_err(io_err)?;
        }
        fs::create_dir_all(&content_dir).map_err(io_err)?;

        let locator = AssetLocator::new(self.config.assets_dir());
        for doc in &documents {
            let id = doc.id().clone();
            let note_dir = content_dir.join(doc.metadata.slug());

            let copied = locator
                .copy_assets(&doc.metadata, &note_dir)
                .map_err(|source| PublishError::Asset {
                    id: id.clone(),
                    source,
                })?;
            self.emitter
                .emit(doc, &note_dir)
                .map_err(|source| PublishError::Emit {
                    id: id.clone(),
                    source,
                })?;

            tracing::info!(
                note_id = %id,
                title = %doc.title(),
                backlinks = doc.backlinks.len(),
                assets = copied,
                "Published note"
            );
            report.assets_copied += copied;
            report.states.insert(id.clone(), NoteState::Done);
            report.emitted.push(id);
        }

        tracing::info!(
            emitted = report.emitted.len(),
            skipped = report.skipped.len(),
            unresolved = report.unresolved.len(),
            "Publish complete"
        );
        Ok(report)
    }

    /// Phase 1: drain the worklist, resolving and formatting every note
    async fn discover(&self) -> Result<Discovery, PublishError> {
        let filter = SeedFilter::new(
            self.config.publish.attribute.clone(),
            self.config.publish.value.clone(),
        );
        let seeds = self
            .repo
            .fetch_seed_ids(&filter)
            .await
            .map_err(PublishError::SeedQuery)?;
        tracing::info!("Found {} seed notes", seeds.len());

        let mut state = ClosureState::new();
        let mut report = PublishReport::default();

        for id in &seeds {
            let metadata = self.repo.fetch_metadata(id.as_str()).await.map_err(|source| {
                tracing::error!(note_id = %id, state = NoteState::Failed.as_str(), "Seed metadata unavailable");
                PublishError::Seed {
                    id: id.clone(),
                    source,
                }
            })?;
            state.register(metadata);
            report.states.insert(id.clone(), NoteState::Pending);
        }
        let seed_set: HashSet<NoteId> = seeds.iter().cloned().collect();
        state.worklist.seed(seeds);

        let policy = self.config.publish.on_fetch_failure;
        let typography = Typography::new(
            self.config.format.auto_space,
            self.config.format.fix_term_typo,
        );
        let resolver = ReferenceResolver::new(&self.repo, self.config.section(), policy, typography);
        let mut documents = Vec::new();

        while let Some(id) = state.worklist.pop() {
            let Some(metadata) = state.metadata(&id).cloned() else {
                tracing::warn!(note_id = %id, "Queued note has no metadata, skipping");
                state.worklist.mark_done(&id);
                continue;
            };

            let raw_content = match self.repo.fetch_raw_content(&id).await {
                Ok(raw) => raw,
                Err(source) if seed_set.contains(&id) => {
                    tracing::error!(note_id = %id, state = NoteState::Failed.as_str(), "Seed content unavailable");
                    return Err(PublishError::SeedContent { id, source });
                }
                Err(e) => {
                    tracing::warn!(note_id = %id, title = %metadata.title, "Skipping note: {}", e);
                    skip(&mut report, &metadata, e.to_string());
                    match policy {
                        FetchFailurePolicy::Abandon => state.worklist.mark_done(&id),
                        FetchFailurePolicy::Retry => state.worklist.release(&id),
                    }
                    continue;
                }
            };
            report.states.insert(id.clone(), NoteState::Fetched);

            let mut tree = markdown::parse(&raw_content);
            let resolution = resolver.resolve(&id, &mut tree, &mut state).await;
            for found in resolution.discovered {
                report.states.insert(found, NoteState::Pending);
            }
            report
                .unresolved
                .extend(resolution.unresolved.into_iter().map(|target| UnresolvedReference {
                    source: id.clone(),
                    target,
                }));
            report.states.insert(id.clone(), NoteState::Resolved);

            let formatted_content = tree.serialize();
            report.states.insert(id.clone(), NoteState::Formatted);
            report.skipped.retain(|s| s.id != id);
            tracing::debug!(note_id = %id, title = %metadata.title, "Formatted note");

            documents.push(NoteDocument {
                metadata,
                raw_content,
                formatted_content,
                backlinks: Vec::new(),
                tree,
            });
            state.worklist.mark_done(&id);
        }

        self.attribute_edges(&mut state).await;
        let edges = state.edges().len();
        let index = state.finish()?;
        tracing::info!(
            notes = documents.len(),
            edges,
            skipped = report.skipped.len(),
            "Closure complete"
        );

        Ok(Discovery {
            documents,
            index,
            report,
        })
    }

    /// Tie references whose block lookup failed during the drain to notes
    /// that entered the closure by another path
    ///
    /// Each such block gets one ownership lookup. Only backlinks change; the
    /// reference itself has already been written as plain text.
    async fn attribute_edges(&self, state: &mut ClosureState) {
        for block in state.unattributed_targets() {
            match self.repo.fetch_metadata(&block).await {
                Ok(owner) if state.metadata(&owner.id).is_some() => {
                    tracing::debug!(block = %block, note_id = %owner.id, "Attributed reference to discovered note");
                    state.map_block(&block, &owner.id);
                }
                Ok(owner) => {
                    tracing::debug!(block = %block, note_id = %owner.id, "Reference owner outside the closure");
                }
                Err(e) => {
                    tracing::debug!(block = %block, "Reference owner still unknown: {}", e);
                }
            }
        }
    }

    /// Phase 2 planning: degrade dangling links and attach backlinks
    fn link_closure(
        &self,
        documents: &mut [NoteDocument],
        index: &BacklinkIndex,
        report: &mut PublishReport,
    ) -> Result<(), PublishError> {
        let section = self.config.section();
        let mut slugs: HashMap<String, NoteId> = HashMap::new();
        let mut entries: HashMap<NoteId, Backlink> = HashMap::new();

        for doc in documents.iter() {
            let slug = doc.metadata.slug();
            if slug.is_empty() || slug == "." || slug == ".." {
                return Err(PublishError::InvalidSlug {
                    id: doc.id().clone(),
                    title: doc.title().to_string(),
                });
            }
            if let Some(first) = slugs.insert(slug.clone(), doc.id().clone()) {
                return Err(PublishError::DuplicateSlug {
                    slug,
                    first,
                    second: doc.id().clone(),
                });
            }
            entries.insert(
                doc.id().clone(),
                Backlink {
                    title: doc.title().to_string(),
                    url: link_path(section, &slug),
                },
            );
        }
        let emitted: HashSet<NoteId> = entries.keys().cloned().collect();

        for doc in documents.iter_mut() {
            let source = doc.id().clone();
            let mut dangling = Vec::new();
            doc.tree.walk(&mut |node: &mut Node| match node {
                Node::Link {
                    target: Some(target),
                    children,
                    ..
                } if !emitted.contains(&*target) => {
                    dangling.push(target.clone());
                    Visit::Replace(std::mem::take(children))
                }
                _ => Visit::Continue,
            });

            if !dangling.is_empty() {
                doc.formatted_content = doc.tree.serialize();
                for target in dangling {
                    tracing::warn!(note_id = %source, target = %target, "Link to unpublished note left as plain text");
                    report.unresolved.push(UnresolvedReference {
                        source: source.clone(),
                        target: target.to_string(),
                    });
                }
            }

            doc.backlinks = index
                .backlinks(&source, &emitted)
                .into_iter()
                .filter_map(|from| entries.get(from).cloned())
                .collect();
        }

        Ok(())
    }
}

fn skip(report: &mut PublishReport, metadata: &NoteMetadata, reason: String) {
    report.skipped.retain(|s| s.id != metadata.id);
    report.skipped.push(SkippedNote {
        id: metadata.id.clone(),
        title: metadata.title.clone(),
        reason,
    });
    report.states.insert(metadata.id.clone(), NoteState::Skipped);
}
